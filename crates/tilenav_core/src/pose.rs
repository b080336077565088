use crate::MapInfo;

use serde::{Deserialize, Serialize};

/// A planar pose in meters and radians, as published by the localizer and accepted as goals.
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct Pose2 {
    pub x: f64,
    pub y: f64,
    pub heading: f64,
}

impl Pose2 {
    #[inline]
    pub const fn new(x: f64, y: f64, heading: f64) -> Self {
        Self { x, y, heading }
    }

    #[inline]
    pub const fn at(x: f64, y: f64) -> Self {
        Self::new(x, y, 0.0)
    }

    /// Euclidean distance between the positions, ignoring heading.
    #[inline]
    pub fn distance(&self, other: &Self) -> f64 {
        (other.x - self.x).hypot(other.y - self.y)
    }

    /// Two poses name the same place iff their positions are equal. Heading is not compared.
    #[inline]
    pub fn same_position(&self, other: &Self) -> bool {
        self.x == other.x && self.y == other.y
    }
}

/// A cell of the 2D search grid.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct GridPoint2 {
    pub x: i32,
    pub y: i32,
}

impl GridPoint2 {
    #[inline]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// The cell containing `pose` on a map with the given geometry.
    #[inline]
    pub fn containing(pose: &Pose2, info: &MapInfo) -> Self {
        Self::new(info.cell_coordinate(pose.x), info.cell_coordinate(pose.y))
    }

    /// Packs both coordinates into one integer key, X in the high half.
    #[inline]
    pub fn pack(&self) -> u64 {
        ((self.x as u32 as u64) << 32) | (self.y as u32 as u64)
    }

    #[inline]
    pub fn offset(&self, dx: i32, dy: i32) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }

    /// Straight-line distance in grid units.
    #[inline]
    pub fn distance(&self, other: &Self) -> f64 {
        ((other.x - self.x) as f64).hypot((other.y - self.y) as f64)
    }

    /// Real-world pose of the cell center.
    #[inline]
    pub fn center(&self, info: &MapInfo) -> Pose2 {
        Pose2::at(info.cell_center(self.x), info.cell_center(self.y))
    }
}

/// A cell of the full 3D map lattice.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct GridPoint3 {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl GridPoint3 {
    #[inline]
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }
}

impl From<GridPoint2> for GridPoint3 {
    fn from(p: GridPoint2) -> Self {
        Self::new(p.x, p.y, 0)
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
    fn pack_is_unique_for_negative_coordinates() {
        let a = GridPoint2::new(-1, 0).pack();
        let b = GridPoint2::new(0, -1).pack();
        let c = GridPoint2::new(-1, -1).pack();
        assert_ne!(a, b);
        assert_ne!(a, c);
        assert_ne!(b, c);
    }

    #[test]
    fn cell_round_trip_through_center() {
        let info = MapInfo::new(0.25, 16, 16, 1);
        let cell = GridPoint2::new(-3, 5);
        assert_eq!(GridPoint2::containing(&cell.center(&info), &info), cell);
    }

    #[test]
    fn pose_distance_ignores_heading() {
        let a = Pose2::new(0.0, 0.0, 1.0);
        let b = Pose2::new(3.0, 4.0, -2.0);
        assert_eq!(a.distance(&b), 5.0);
        assert!(a.same_position(&Pose2::at(0.0, 0.0)));
    }
}
