use crate::Channel;

use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Size in bytes of a `TileId` in its raw (plain-old-data) form.
pub const TILE_ID_SIZE: usize = std::mem::size_of::<TileId>();

/// Identifies one tile of one channel of the map. Tile coordinates are in tile units, i.e. cell coordinates divided by the
/// tile shape (rounding towards negative infinity).
///
/// The raw form is the in-memory `#[repr(C)]` layout, so the bytes (and the hex encoding derived from them) are only portable
/// between machines with the same endianness.
#[derive(
    Clone, Copy, Debug, Default, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Pod, Serialize, Zeroable,
)]
#[repr(C)]
pub struct TileId {
    pub channel: u32,
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl TileId {
    #[inline]
    pub const fn new(channel: u32, x: i32, y: i32, z: i32) -> Self {
        Self { channel, x, y, z }
    }

    #[inline]
    pub fn in_channel(channel: Channel, x: i32, y: i32, z: i32) -> Self {
        Self::new(channel.number(), x, y, z)
    }

    /// The value of a cell in this tile before anything was ever written.
    #[inline]
    pub fn default_value(&self) -> f32 {
        Channel::default_for_number(self.channel)
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(self)
    }

    /// Reads a `TileId` back from its raw bytes. Returns `None` if `bytes` has the wrong length.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() != TILE_ID_SIZE {
            return None;
        }
        let mut id = Self::zeroed();
        bytemuck::bytes_of_mut(&mut id).copy_from_slice(bytes);

        Some(id)
    }

    /// Fixed-width, lowercase hex encoding of the raw bytes (two characters per byte).
    pub fn to_hex(&self) -> [u8; 2 * TILE_ID_SIZE] {
        const DIGITS: &[u8; 16] = b"0123456789abcdef";

        let mut hex = [0; 2 * TILE_ID_SIZE];
        for (i, byte) in self.as_bytes().iter().enumerate() {
            hex[2 * i] = DIGITS[(byte >> 4) as usize];
            hex[2 * i + 1] = DIGITS[(byte & 0xf) as usize];
        }

        hex
    }
}

impl fmt::Display for TileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]({}, {}, {})", self.channel, self.x, self.y, self.z)
    }
}

// ████████╗███████╗███████╗████████╗
// ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝
//    ██║   █████╗  ███████╗   ██║
//    ██║   ██╔══╝  ╚════██║   ██║
//    ██║   ███████╗███████║   ██║
//    ╚═╝   ╚══════╝╚══════╝   ╚═╝

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn raw_bytes_round_trip() {
        let id = TileId::new(1, -3, 7, 0);
        assert_eq!(id.as_bytes().len(), 16);
        assert_eq!(TileId::from_bytes(id.as_bytes()), Some(id));
        assert_eq!(TileId::from_bytes(&id.as_bytes()[1..]), None);
    }

    #[test]
    fn hex_is_fixed_width_lowercase() {
        let hex = TileId::new(0, 0, 0, 0).to_hex();
        assert_eq!(&hex[..], &b"00000000000000000000000000000000"[..]);

        let hex = TileId::new(0, -1, 0, 0).to_hex();
        assert!(hex.iter().all(|c| c.is_ascii_digit() || (b'a'..=b'f').contains(c)));
        assert_eq!(&hex[8..16], &b"ffffffff"[..]);
    }

    #[test]
    fn ordered_by_channel_then_coordinates() {
        let mut ids = vec![
            TileId::new(1, 0, 0, 0),
            TileId::new(0, 2, 0, 0),
            TileId::new(0, 1, 5, 0),
            TileId::new(0, 1, 4, 9),
        ];
        ids.sort();
        assert_eq!(
            ids,
            vec![
                TileId::new(0, 1, 4, 9),
                TileId::new(0, 1, 5, 0),
                TileId::new(0, 2, 0, 0),
                TileId::new(1, 0, 0, 0),
            ]
        );
    }
}
