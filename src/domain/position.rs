//! World coordinates, offsets and cuboid regions

use serde::{Deserialize, Serialize};
use std::fmt;

/// Block coordinate inside a map
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Position {
    pub x: u16,
    pub y: u16,
    pub z: u16,
}

impl Position {
    pub const fn new(x: u16, y: u16, z: u16) -> Self {
        Self { x, y, z }
    }

    /// Translate by an offset, `None` if any axis leaves the u16 range
    pub fn offset(&self, by: Offset) -> Option<Position> {
        let shift = |v: u16, d: i32| u16::try_from(i32::from(v) + d).ok();
        Some(Position {
            x: shift(self.x, by.dx)?,
            y: shift(self.y, by.dy)?,
            z: shift(self.z, by.dz)?,
        })
    }

    /// Offset that moves `origin` onto `self`
    pub fn delta_from(&self, origin: Position) -> Offset {
        Offset {
            dx: i32::from(self.x) - i32::from(origin.x),
            dy: i32::from(self.y) - i32::from(origin.y),
            dz: i32::from(self.z) - i32::from(origin.z),
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

/// Signed displacement between two positions
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Offset {
    pub dx: i32,
    pub dy: i32,
    pub dz: i32,
}

/// Axis-aligned box, inclusive on both corners
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Region {
    min: Position,
    max: Position,
}

impl Region {
    /// Build a region from any two opposite corners
    pub fn new(a: Position, b: Position) -> Self {
        Self {
            min: Position::new(a.x.min(b.x), a.y.min(b.y), a.z.min(b.z)),
            max: Position::new(a.x.max(b.x), a.y.max(b.y), a.z.max(b.z)),
        }
    }

    /// Single-block region
    pub fn single(p: Position) -> Self {
        Self { min: p, max: p }
    }

    pub fn min(&self) -> Position {
        self.min
    }

    pub fn max(&self) -> Position {
        self.max
    }

    pub fn contains(&self, p: Position) -> bool {
        (self.min.x..=self.max.x).contains(&p.x)
            && (self.min.y..=self.max.y).contains(&p.y)
            && (self.min.z..=self.max.z).contains(&p.z)
    }

    /// Number of block positions covered
    pub fn volume(&self) -> u64 {
        let span = |lo: u16, hi: u16| u64::from(hi - lo) + 1;
        span(self.min.x, self.max.x) * span(self.min.y, self.max.y) * span(self.min.z, self.max.z)
    }

    /// Every position in the region, x-major
    pub fn positions(&self) -> impl Iterator<Item = Position> + '_ {
        (self.min.x..=self.max.x).flat_map(move |x| {
            (self.min.y..=self.max.y)
                .flat_map(move |y| (self.min.z..=self.max.z).map(move |z| Position::new(x, y, z)))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offset_in_range() {
        let p = Position::new(10, 20, 30);
        let moved = p.offset(Offset { dx: -5, dy: 0, dz: 2 }).unwrap();
        assert_eq!(moved, Position::new(5, 20, 32));
    }

    #[test]
    fn test_offset_out_of_range() {
        let p = Position::new(1, 1, 1);
        assert!(p.offset(Offset { dx: -2, dy: 0, dz: 0 }).is_none());
        assert!(Position::new(u16::MAX, 0, 0).offset(Offset { dx: 1, dy: 0, dz: 0 }).is_none());
    }

    #[test]
    fn test_delta_from_roundtrip() {
        let a = Position::new(3, 4, 5);
        let b = Position::new(10, 0, 7);
        assert_eq!(a.offset(b.delta_from(a)), Some(b));
    }

    #[test]
    fn test_region_normalizes_corners() {
        let r = Region::new(Position::new(5, 0, 9), Position::new(1, 3, 2));
        assert_eq!(r.min(), Position::new(1, 0, 2));
        assert_eq!(r.max(), Position::new(5, 3, 9));
    }

    #[test]
    fn test_region_contains() {
        let r = Region::new(Position::new(0, 0, 0), Position::new(2, 2, 2));
        assert!(r.contains(Position::new(2, 0, 1)));
        assert!(!r.contains(Position::new(3, 0, 1)));
    }

    #[test]
    fn test_region_volume_and_positions() {
        let r = Region::new(Position::new(0, 0, 0), Position::new(1, 2, 0));
        assert_eq!(r.volume(), 6);
        assert_eq!(r.positions().count(), 6);
        assert_eq!(Region::single(Position::new(4, 4, 4)).volume(), 1);
    }
}
