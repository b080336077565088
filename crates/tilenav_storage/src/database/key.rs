use crate::{StoreError, StoreResult};

use tilenav_core::{TileId, TILE_ID_SIZE};

/// First byte of every key owned by a map.
pub const KEY_NAMESPACE: u8 = b'M';

const HEADER_SIZE: usize = 2;
const ID_SIZE: usize = 2 * TILE_ID_SIZE;
const MAX_KEY_SIZE: usize = HEADER_SIZE + ID_SIZE;

/// Second byte of every key, saying what kind of value is stored.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[repr(u8)]
pub enum KeyType {
    /// Serialized `MapInfo`.
    Info = b'i',
    /// Flat manifest of every `TileId` ever saved, appended on first save.
    List = b's',
    /// Raw tile cells.
    TileData = b't',
    /// Placeholder whose existence means the tile is locked.
    TileLock = b'l',
    /// 4-byte tile revision.
    TileRevision = b'r',
}

impl KeyType {
    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            b'i' => Some(KeyType::Info),
            b's' => Some(KeyType::List),
            b't' => Some(KeyType::TileData),
            b'l' => Some(KeyType::TileLock),
            b'r' => Some(KeyType::TileRevision),
            _ => None,
        }
    }

    /// Whether keys of this type carry a `TileId`.
    pub fn has_id(&self) -> bool {
        matches!(
            self,
            KeyType::TileData | KeyType::TileLock | KeyType::TileRevision
        )
    }
}

/// A key in the map key space: `[namespace, type]` for map-wide values, or `[namespace, type, hex(id)...]` for per-tile
/// values.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct BackendKey {
    bytes: [u8; MAX_KEY_SIZE],
    len: usize,
}

impl BackendKey {
    #[inline]
    fn header(key_type: KeyType) -> Self {
        let mut bytes = [0; MAX_KEY_SIZE];
        bytes[0] = KEY_NAMESPACE;
        bytes[1] = key_type as u8;

        Self {
            bytes,
            len: HEADER_SIZE,
        }
    }

    #[inline]
    pub fn info() -> Self {
        Self::header(KeyType::Info)
    }

    #[inline]
    pub fn list() -> Self {
        Self::header(KeyType::List)
    }

    #[inline]
    pub fn tile(key_type: KeyType, id: &TileId) -> Self {
        debug_assert!(key_type.has_id());

        let mut key = Self::header(key_type);
        key.bytes[HEADER_SIZE..].copy_from_slice(&id.to_hex());
        key.len = MAX_KEY_SIZE;

        key
    }

    #[inline]
    pub fn tile_data(id: &TileId) -> Self {
        Self::tile(KeyType::TileData, id)
    }

    #[inline]
    pub fn tile_lock(id: &TileId) -> Self {
        Self::tile(KeyType::TileLock, id)
    }

    #[inline]
    pub fn tile_revision(id: &TileId) -> Self {
        Self::tile(KeyType::TileRevision, id)
    }

    /// Parses raw key bytes back into the key type and, for per-tile keys, the `TileId`. Returns `Ok(None)` for keys
    /// outside of the map namespace.
    pub fn parse(bytes: &[u8]) -> StoreResult<Option<(KeyType, Option<TileId>)>> {
        if bytes.len() < HEADER_SIZE || bytes[0] != KEY_NAMESPACE {
            return Ok(None);
        }
        let key_type =
            KeyType::from_byte(bytes[1]).ok_or_else(|| StoreError::MalformedKey(bytes.to_vec()))?;
        if !key_type.has_id() {
            return if bytes.len() == HEADER_SIZE {
                Ok(Some((key_type, None)))
            } else {
                Err(StoreError::MalformedKey(bytes.to_vec()))
            };
        }

        let id = decode_hex_id(&bytes[HEADER_SIZE..])
            .ok_or_else(|| StoreError::MalformedKey(bytes.to_vec()))?;

        Ok(Some((key_type, Some(id))))
    }
}

impl AsRef<[u8]> for BackendKey {
    fn as_ref(&self) -> &[u8] {
        &self.bytes[..self.len]
    }
}

fn decode_hex_id(hex: &[u8]) -> Option<TileId> {
    if hex.len() != ID_SIZE {
        return None;
    }
    let mut raw = [0u8; TILE_ID_SIZE];
    for (byte, pair) in raw.iter_mut().zip(hex.chunks_exact(2)) {
        *byte = (hex_digit(pair[0])? << 4) | hex_digit(pair[1])?;
    }

    TileId::from_bytes(&raw)
}

fn hex_digit(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        _ => None,
    }
}

// ████████╗███████╗███████╗████████╗
// ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝
//    ██║   █████╗  ███████╗   ██║
//    ██║   ██╔══╝  ╚════██║   ██║
//    ██║   ███████╗███████║   ██║
//    ╚═╝   ╚══════╝╚══════╝   ╚═╝
