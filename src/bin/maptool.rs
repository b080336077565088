//! Moves maps between snapshot files and sled databases.

use tilenav::prelude::*;

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use structopt::StructOpt;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Debug, StructOpt)]
#[structopt(name = "maptool", about = "Manage tile maps")]
enum Options {
    /// Writes a snapshot of an empty map.
    Create {
        snapshot: PathBuf,
        /// Meters per cell.
        #[structopt(default_value = "0.05")]
        scale: f64,
        /// Tile width in cells.
        #[structopt(default_value = "256")]
        width: u32,
        /// Tile height in cells.
        #[structopt(default_value = "256")]
        height: u32,
        /// Tile depth in cells.
        #[structopt(default_value = "1")]
        depth: u32,
    },
    /// Describes a snapshot file or a database directory.
    Show { path: PathBuf },
    /// Copies a snapshot into a database.
    Load { snapshot: PathBuf, db: PathBuf },
    /// Copies the map in a database into a snapshot.
    Save { snapshot: PathBuf, db: PathBuf },
    /// Deletes everything in a database.
    Flush { db: PathBuf },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    if let Err(e) = run(Options::from_args()) {
        error!("{}", e);
        std::process::exit(2);
    }
}

fn run(options: Options) -> StoreResult<()> {
    match options {
        Options::Create {
            snapshot,
            scale,
            width,
            height,
            depth,
        } => {
            let info = MapInfo::new(scale, width, height, depth);
            if !info.is_valid() {
                return Err(StoreError::InvalidInfo(info));
            }
            write_snapshot(&MapSnapshot::empty(info), &snapshot)?;
            info!("created {} with {:?}", snapshot.display(), info);
        }
        Options::Show { path } => {
            if path.is_file() {
                show_snapshot(&read_snapshot(&path)?);
            } else {
                let backend = open_db(&path)?;
                show_snapshot(&MapSnapshot::capture(&backend)?);
                for id in backend.locked_tiles()? {
                    println!("{} locked", id);
                }
            }
        }
        Options::Load { snapshot, db } => {
            let backend = open_db(&db)?;
            read_snapshot(&snapshot)?.restore(&backend)?;
            backend.store().flush()?;
        }
        Options::Save { snapshot, db } => {
            write_snapshot(&MapSnapshot::capture(&open_db(&db)?)?, &snapshot)?;
        }
        Options::Flush { db } => {
            let backend = open_db(&db)?;
            backend.flush_all()?;
            backend.store().flush()?;
            info!("flushed {}", db.display());
        }
    }

    Ok(())
}

fn open_db(path: &Path) -> StoreResult<KvTileBackend<SledStore>> {
    Ok(KvTileBackend::new(SledStore::open(path)?))
}

fn read_snapshot(path: &Path) -> StoreResult<MapSnapshot> {
    MapSnapshot::read_from(BufReader::new(File::open(path)?))
}

fn write_snapshot(snapshot: &MapSnapshot, path: &Path) -> StoreResult<()> {
    snapshot.write_to(BufWriter::new(File::create(path)?))
}

fn show_snapshot(snapshot: &MapSnapshot) {
    let info = &snapshot.info;
    println!(
        "scale = {} m, tile = {} x {} x {} cells, {} tiles",
        info.scale,
        info.tile_width,
        info.tile_height,
        info.tile_depth,
        snapshot.tiles.len()
    );
    for row in snapshot.tiles.iter() {
        println!("{} revision {}", row.id, row.revision);
    }
}
