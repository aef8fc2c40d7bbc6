//! Integer grid coordinates of the processing-element array.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A position in the processing-element array.
///
/// `x` grows left to right (columns) and `y` grows top to bottom (rows), so
/// row 0 is the row adjacent to the input ports.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
pub struct Coord {
    /// Column index.
    pub x: u32,
    /// Row index.
    pub y: u32,
}

impl Coord {
    /// Creates a coordinate.
    pub const fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }

    /// Manhattan distance to `other`.
    pub fn manhattan(self, other: Coord) -> u32 {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }

    /// Squared Euclidean distance from the array origin.
    pub fn radial_sq(self) -> u64 {
        let x = u64::from(self.x);
        let y = u64::from(self.y);
        x * x + y * y
    }

    /// Row-major index of this coordinate in an array `width` columns wide.
    pub fn linear(self, width: u32) -> usize {
        (self.y * width + self.x) as usize
    }
}

impl fmt::Display for Coord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manhattan_is_symmetric() {
        let a = Coord::new(0, 3);
        let b = Coord::new(2, 1);
        assert_eq!(a.manhattan(b), 4);
        assert_eq!(b.manhattan(a), 4);
        assert_eq!(a.manhattan(a), 0);
    }

    #[test]
    fn radial_ordering() {
        assert!(Coord::new(1, 1).radial_sq() < Coord::new(0, 2).radial_sq());
    }

    #[test]
    fn linear_is_row_major() {
        assert_eq!(Coord::new(2, 1).linear(4), 6);
    }

    #[test]
    fn display() {
        assert_eq!(format!("{}", Coord::new(3, 4)), "(3, 4)");
    }
}
