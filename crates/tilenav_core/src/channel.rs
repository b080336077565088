use serde::{Deserialize, Serialize};

/// Upper bound of an occupancy probability. Cells at or above it are impassable.
pub const MAX_PROBABILITY: f32 = 1.0;
/// Lower bound of an occupancy probability.
pub const MIN_PROBABILITY: f32 = 0.0;
/// Probability above which a cell is reported as an obstacle.
pub const OBSTACLE_THRESHOLD: f32 = 0.75;

/// A logical layer of the map. Every channel is tiled independently, and the channel number is part of the `TileId`.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[repr(u32)]
pub enum Channel {
    /// Occupancy probability.
    Probability = 0,
    /// Occupancy probability with obstacles inflated by the vehicle footprint ("C-space"). Consumed by the pathfinder.
    CostSpace = 1,
    /// Elevation mean.
    ElevationMean = 2,
    /// Elevation variance.
    ElevationVariance = 3,
    Red = 4,
    Green = 5,
    Blue = 6,
}

impl Channel {
    pub const ALL: [Channel; 7] = [
        Channel::Probability,
        Channel::CostSpace,
        Channel::ElevationMean,
        Channel::ElevationVariance,
        Channel::Red,
        Channel::Green,
        Channel::Blue,
    ];

    /// The value of every cell of a tile that has never been written.
    #[inline]
    pub const fn default_value(self) -> f32 {
        match self {
            Channel::Probability | Channel::CostSpace => 0.5,
            _ => 0.0,
        }
    }

    #[inline]
    pub const fn number(self) -> u32 {
        self as u32
    }

    pub fn from_number(number: u32) -> Option<Self> {
        Self::ALL.get(number as usize).copied()
    }

    /// Default value for a raw channel number. Unknown channels default to zero.
    #[inline]
    pub fn default_for_number(number: u32) -> f32 {
        Self::from_number(number).map_or(0.0, Channel::default_value)
    }
}

impl From<Channel> for u32 {
    fn from(c: Channel) -> Self {
        c.number()
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
    fn channel_defaults() {
        let defaults: Vec<f32> = Channel::ALL.iter().map(|c| c.default_value()).collect();
        assert_eq!(defaults, vec![0.5, 0.5, 0.0, 0.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn channel_numbers_round_trip() {
        for c in Channel::ALL.iter() {
            assert_eq!(Channel::from_number(c.number()), Some(*c));
        }
        assert_eq!(Channel::from_number(7), None);
        assert_eq!(Channel::default_for_number(42), 0.0);
    }
}
