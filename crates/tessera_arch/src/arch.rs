//! The architecture query surface consumed by the mapper.

use crate::error::ArchError;
use crate::graph::ResourceGraph;
use crate::grid::{GridArchitecture, GridParams};
use crate::ids::NodeId;
use crate::types::{NodeKey, NodeKind};
use tessera_common::Coord;

/// The read-only query surface of a fabric model.
///
/// The placer only needs the array dimensions and the usable coordinates; the
/// router additionally looks up resources by coordinate, enumerates constant
/// registers and ports, and asks for pipeline-stage partitioning. The
/// topology itself is exposed through [`resource_graph`](Self::resource_graph)
/// and is shared read-only by every individual during a run.
pub trait Architecture: std::fmt::Debug + Send + Sync {
    /// Returns the model name (used in persisted records).
    fn name(&self) -> &str;

    /// Returns the array dimensions as `(width, height)`.
    fn dimensions(&self) -> (u32, u32);

    /// Returns the fabric topology.
    fn resource_graph(&self) -> &ResourceGraph;

    /// Returns the fabric topology for base-weight assignment at setup.
    fn resource_graph_mut(&mut self) -> &mut ResourceGraph;

    /// Returns the compute unit at `coord`, if the array has one there.
    fn compute_node(&self, coord: Coord) -> Option<NodeId>;

    /// Returns the switch outputs located at `coord`.
    fn switch_outputs(&self, coord: Coord) -> Vec<NodeId>;

    /// Returns all constant registers.
    fn const_registers(&self) -> &[NodeId];

    /// Returns all input ports.
    fn input_ports(&self) -> &[NodeId];

    /// Returns all output ports.
    fn output_ports(&self) -> &[NodeId];

    /// Returns the number of potential pipeline cut lines.
    fn pipeline_len(&self) -> usize;

    /// Returns whether constants have to be routed through constant registers.
    fn needs_const_routing(&self) -> bool;

    /// Returns the kind of a node.
    fn kind_of(&self, node: NodeId) -> NodeKind {
        self.resource_graph().kind(node)
    }

    /// Returns the coordinate a node sits at, if any.
    fn coord_of(&self, node: NodeId) -> Option<Coord> {
        self.resource_graph().node(node).key.coord()
    }

    /// Returns every coordinate that holds a compute unit, row-major.
    fn coords(&self) -> Vec<Coord> {
        let (width, height) = self.dimensions();
        (0..height)
            .flat_map(|y| (0..width).map(move |x| Coord::new(x, y)))
            .filter(|&c| self.compute_node(c).is_some())
            .collect()
    }

    /// Returns the pipeline stage of `node` under the given cut activation.
    ///
    /// Cut `k` lies between rows `k` and `k + 1`. Input ports and constant
    /// registers belong to the first stage, output ports to the last.
    fn stage_of(&self, node: NodeId, pipeline: &[bool]) -> usize {
        let active = |k: usize| pipeline.get(k).copied().unwrap_or(false);
        match self.resource_graph().node(node).key {
            NodeKey::Compute(c) | NodeKey::Switch(c, _) => {
                (0..pipeline.len()).filter(|&k| active(k) && k < c.y as usize).count()
            }
            NodeKey::OutPort(_) => pipeline.iter().filter(|&&b| b).count(),
            NodeKey::InPort(_) | NodeKey::Const(_) => 0,
        }
    }

    /// Lower bound on the routing cost from `from` to `to`.
    ///
    /// Used as the A* heuristic; the default of zero turns A* into Dijkstra.
    fn hop_lower_bound(&self, _from: NodeId, _to: NodeId) -> f64 {
        0.0
    }
}

/// Creates an architecture model by family name.
///
/// Only the `"mesh"` family is built in.
pub fn load_architecture(
    kind: &str,
    name: &str,
    params: GridParams,
) -> Result<Box<dyn Architecture>, ArchError> {
    match kind {
        "mesh" => Ok(Box::new(GridArchitecture::mesh(name, params)?)),
        other => Err(ArchError::UnknownKind(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_mesh() {
        let arch = load_architecture("mesh", "m", GridParams::new(3, 2)).unwrap();
        assert_eq!(arch.name(), "m");
        assert_eq!(arch.coords().len(), 6);
    }

    #[test]
    fn load_unknown_kind() {
        let err = load_architecture("torus", "t", GridParams::new(3, 2)).unwrap_err();
        assert!(matches!(err, ArchError::UnknownKind(_)));
    }

    #[test]
    fn stage_partitioning() {
        let mut params = GridParams::new(2, 4);
        params.pipeline_cuts = 3;
        params.input_ports = 1;
        params.output_ports = 1;
        let arch = load_architecture("mesh", "m", params).unwrap();
        let pipeline = [false, true, false];
        let top = arch.compute_node(Coord::new(0, 0)).unwrap();
        let row1 = arch.compute_node(Coord::new(0, 1)).unwrap();
        let row2 = arch.compute_node(Coord::new(0, 2)).unwrap();
        assert_eq!(arch.stage_of(top, &pipeline), 0);
        assert_eq!(arch.stage_of(row1, &pipeline), 0);
        assert_eq!(arch.stage_of(row2, &pipeline), 1);
        assert_eq!(arch.stage_of(arch.input_ports()[0], &pipeline), 0);
        assert_eq!(arch.stage_of(arch.output_ports()[0], &pipeline), 1);
    }
}
