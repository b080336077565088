use crate::{StoreError, StoreResult, TileBackend};

use tilenav_core::{MapInfo, TileId};

use serde::{Deserialize, Serialize};
use std::io::{Read, Write};
use tracing::{info, warn};

/// One saved tile of a `MapSnapshot`.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct TileRow {
    pub id: TileId,
    pub data: Vec<f32>,
    pub revision: u32,
}

/// A whole map, detached from any backend. This is how maps are archived between runs and moved between databases.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct MapSnapshot {
    pub info: MapInfo,
    pub tiles: Vec<TileRow>,
}

impl MapSnapshot {
    /// A map without any tiles.
    pub fn empty(info: MapInfo) -> Self {
        Self {
            info,
            tiles: Vec::new(),
        }
    }

    /// Reads the geometry and every tile in the manifest. Tiles that are listed but have no data are skipped.
    pub fn capture(backend: &impl TileBackend) -> StoreResult<Self> {
        let info = backend.info()?;
        let tile_len = info.tile_len();

        let mut tiles = Vec::new();
        for id in backend.list()? {
            match backend.load(&id, tile_len, 0)? {
                Some(loaded) => tiles.push(TileRow {
                    id,
                    data: loaded.data,
                    revision: loaded.revision,
                }),
                None => warn!("tile {} is listed but has no data", id),
            }
        }
        info!("captured {} tiles", tiles.len());

        Ok(Self { info, tiles })
    }

    /// Writes the snapshot into `backend`, keeping the saved revisions. Existing tiles with the same ids are overwritten,
    /// other tiles are left alone.
    pub fn restore(&self, backend: &impl TileBackend) -> StoreResult<()> {
        let tile_len = self.info.tile_len();
        for row in self.tiles.iter() {
            if row.data.len() != tile_len {
                return Err(StoreError::Corrupt {
                    what: "snapshot tile",
                    expected: self.info.tile_size(),
                    actual: row.data.len() * std::mem::size_of::<f32>(),
                });
            }
        }

        backend.init(&self.info)?;
        for row in self.tiles.iter() {
            backend.restore(&row.id, &row.data, row.revision)?;
        }
        info!("restored {} tiles", self.tiles.len());

        Ok(())
    }

    pub fn write_to(&self, writer: impl Write) -> StoreResult<()> {
        Ok(bincode::serialize_into(writer, self)?)
    }

    pub fn read_from(reader: impl Read) -> StoreResult<Self> {
        let snapshot: Self = bincode::deserialize_from(reader)?;
        if !snapshot.info.is_valid() {
            return Err(StoreError::InvalidInfo(snapshot.info));
        }

        Ok(snapshot)
    }
}

// ████████╗███████╗███████╗████████╗
// ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝
//    ██║   █████╗  ███████╗   ██║
//    ██║   ██╔══╝  ╚════██║   ██║
//    ██║   ███████╗███████║   ██║
//    ╚═╝   ╚══════╝╚══════╝   ╚═╝
