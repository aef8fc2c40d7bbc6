//! Node and edge types of the resource graph.

use crate::ids::NodeId;
use serde::{Deserialize, Serialize};
use std::fmt;
use tessera_common::Coord;

/// The kind of a fabric resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    /// A processing element able to execute one operation.
    Compute,
    /// One outgoing direction of a switch; the unit of wire sharing.
    SwitchOutput,
    /// A constant-value register.
    ConstReg,
    /// An array input port.
    InPort,
    /// An array output port.
    OutPort,
}

/// Output direction of a switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Direction {
    /// Towards row `y - 1`.
    North,
    /// Towards column `x + 1`.
    East,
    /// Towards row `y + 1`.
    South,
    /// Towards column `x - 1`.
    West,
}

impl Direction {
    /// All four directions in declaration order.
    pub const ALL: [Direction; 4] = [
        Direction::North,
        Direction::East,
        Direction::South,
        Direction::West,
    ];

    /// The opposite direction.
    pub fn opposite(self) -> Direction {
        match self {
            Direction::North => Direction::South,
            Direction::East => Direction::West,
            Direction::South => Direction::North,
            Direction::West => Direction::East,
        }
    }

    /// `(dx, dy)` step of this direction.
    pub fn delta(self) -> (i64, i64) {
        match self {
            Direction::North => (0, -1),
            Direction::East => (1, 0),
            Direction::South => (0, 1),
            Direction::West => (-1, 0),
        }
    }

    /// Index of this direction within [`Direction::ALL`].
    pub fn index(self) -> usize {
        self as usize
    }
}

/// Stable identity of a node: kind plus coordinate, direction, or index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKey {
    /// The compute unit at a coordinate.
    Compute(Coord),
    /// The switch output at a coordinate facing a direction.
    Switch(Coord, Direction),
    /// Constant register `i`.
    Const(u32),
    /// Input port `i`.
    InPort(u32),
    /// Output port `i`.
    OutPort(u32),
}

impl NodeKey {
    /// Returns the node kind implied by this key.
    pub fn kind(self) -> NodeKind {
        match self {
            NodeKey::Compute(_) => NodeKind::Compute,
            NodeKey::Switch(..) => NodeKind::SwitchOutput,
            NodeKey::Const(_) => NodeKind::ConstReg,
            NodeKey::InPort(_) => NodeKind::InPort,
            NodeKey::OutPort(_) => NodeKind::OutPort,
        }
    }

    /// Returns the grid coordinate the resource sits at, if it has one.
    pub fn coord(self) -> Option<Coord> {
        match self {
            NodeKey::Compute(c) | NodeKey::Switch(c, _) => Some(c),
            _ => None,
        }
    }
}

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeKey::Compute(c) => write!(f, "ALU{c}"),
            NodeKey::Switch(c, d) => write!(f, "SW{c}.{d:?}"),
            NodeKey::Const(i) => write!(f, "CONST{i}"),
            NodeKey::InPort(i) => write!(f, "IN{i}"),
            NodeKey::OutPort(i) => write!(f, "OUT{i}"),
        }
    }
}

/// A node of the resource graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    /// The node's id (equal to its arena index).
    pub id: NodeId,
    /// The node's stable key.
    pub key: NodeKey,
}

impl Node {
    /// The node kind.
    pub fn kind(&self) -> NodeKind {
        self.key.kind()
    }
}

/// A directed edge of the resource graph with its base routing cost.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Edge {
    /// Driving node.
    pub src: NodeId,
    /// Driven node.
    pub dst: NodeId,
    /// Base routing cost before any per-individual overlay.
    pub weight: f64,
    /// Index of the pipeline cut line this edge crosses, if any.
    pub cut: Option<u32>,
}
