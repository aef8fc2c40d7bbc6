//! Grid-shaped fabrics: the built-in mesh factory and hand-assembled grids.

use crate::arch::Architecture;
use crate::error::ArchError;
use crate::graph::ResourceGraph;
use crate::ids::NodeId;
use crate::types::{Direction, NodeKey};
use tessera_common::Coord;

/// Parameters of a grid fabric.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridParams {
    /// Number of columns.
    pub width: u32,
    /// Number of rows.
    pub height: u32,
    /// Number of constant registers.
    pub const_registers: u32,
    /// Number of input ports above row 0.
    pub input_ports: u32,
    /// Number of output ports below the last row.
    pub output_ports: u32,
    /// Number of potential pipeline cut lines.
    pub pipeline_cuts: u32,
    /// Whether constants need explicit routing.
    pub const_routing: bool,
}

impl GridParams {
    /// A bare `width` x `height` array without registers, ports, or cuts.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            const_registers: 0,
            input_ports: 0,
            output_ports: 0,
            pipeline_cuts: 0,
            const_routing: true,
        }
    }
}

/// A rectangular array of compute units connected by a switch fabric.
#[derive(Debug, Clone)]
pub struct GridArchitecture {
    name: String,
    width: u32,
    height: u32,
    graph: ResourceGraph,
    compute: Vec<Option<NodeId>>,
    switches: Vec<Vec<NodeId>>,
    consts: Vec<NodeId>,
    inputs: Vec<NodeId>,
    outputs: Vec<NodeId>,
    pipeline_cuts: u32,
    const_routing: bool,
}

impl GridArchitecture {
    /// Wraps a hand-assembled graph, indexing its resources by key.
    ///
    /// Constant registers and ports are ordered by their key index.
    pub fn from_graph(
        name: impl Into<String>,
        width: u32,
        height: u32,
        graph: ResourceGraph,
        pipeline_cuts: u32,
        const_routing: bool,
    ) -> Result<Self, ArchError> {
        if width == 0 || height == 0 {
            return Err(ArchError::InvalidParameters(format!(
                "array must be non-empty, got {width}x{height}"
            )));
        }
        let cells = (width * height) as usize;
        let mut compute = vec![None; cells];
        let mut switches = vec![Vec::new(); cells];
        let mut consts = Vec::new();
        let mut inputs = Vec::new();
        let mut outputs = Vec::new();
        for node in graph.nodes() {
            match node.key {
                NodeKey::Compute(c) | NodeKey::Switch(c, _) if c.x >= width || c.y >= height => {
                    return Err(ArchError::InvalidParameters(format!(
                        "{} lies outside the {width}x{height} array",
                        node.key
                    )));
                }
                NodeKey::Compute(c) => compute[c.linear(width)] = Some(node.id),
                NodeKey::Switch(c, _) => switches[c.linear(width)].push(node.id),
                NodeKey::Const(i) => consts.push((i, node.id)),
                NodeKey::InPort(i) => inputs.push((i, node.id)),
                NodeKey::OutPort(i) => outputs.push((i, node.id)),
            }
        }
        let by_index = |mut v: Vec<(u32, NodeId)>| {
            v.sort_unstable();
            v.into_iter().map(|(_, id)| id).collect::<Vec<_>>()
        };
        Ok(Self {
            name: name.into(),
            width,
            height,
            graph,
            compute,
            switches,
            consts: by_index(consts),
            inputs: by_index(inputs),
            outputs: by_index(outputs),
            pipeline_cuts,
            const_routing,
        })
    }

    /// Builds a mesh: every compute unit drives four switch outputs, every
    /// switch output drives the neighbouring compute unit and the neighbour's
    /// onward switch outputs, constant registers broadcast to all compute
    /// units, input ports feed row 0 and output ports are fed by the last row.
    pub fn mesh(name: impl Into<String>, params: GridParams) -> Result<Self, ArchError> {
        let GridParams { width, height, .. } = params;
        if width == 0 || height == 0 {
            return Err(ArchError::InvalidParameters(format!(
                "array must be non-empty, got {width}x{height}"
            )));
        }
        if params.pipeline_cuts >= height {
            return Err(ArchError::InvalidParameters(format!(
                "{} pipeline cuts do not fit between {height} rows",
                params.pipeline_cuts
            )));
        }

        let mut g = ResourceGraph::new();
        let in_bounds = |c: Coord, d: Direction| -> Option<Coord> {
            let (dx, dy) = d.delta();
            let x = i64::from(c.x) + dx;
            let y = i64::from(c.y) + dy;
            (x >= 0 && y >= 0 && x < i64::from(width) && y < i64::from(height))
                .then(|| Coord::new(x as u32, y as u32))
        };
        let cells: Vec<Coord> = (0..height)
            .flat_map(|y| (0..width).map(move |x| Coord::new(x, y)))
            .collect();

        for &c in &cells {
            g.add_node(NodeKey::Compute(c))?;
            for d in Direction::ALL {
                if in_bounds(c, d).is_some() {
                    g.add_node(NodeKey::Switch(c, d))?;
                }
            }
        }
        let node = |g: &ResourceGraph, key: NodeKey| {
            g.node_id(key)
                .ok_or_else(|| ArchError::InvalidParameters(format!("{key} was not created")))
        };

        for &c in &cells {
            let alu = node(&g, NodeKey::Compute(c))?;
            for d in Direction::ALL {
                let Some(n) = in_bounds(c, d) else { continue };
                let sw = node(&g, NodeKey::Switch(c, d))?;
                g.add_edge(alu, sw, 1.0);
                let cut = crossed_cut(c, n, params.pipeline_cuts);
                let target = node(&g, NodeKey::Compute(n))?;
                g.add_edge_across(sw, target, 0.0, cut);
                for onward in Direction::ALL {
                    if onward == d.opposite() || in_bounds(n, onward).is_none() {
                        continue;
                    }
                    let next = node(&g, NodeKey::Switch(n, onward))?;
                    g.add_edge_across(sw, next, 1.0, cut);
                }
            }
        }

        for i in 0..params.const_registers {
            let reg = g.add_node(NodeKey::Const(i))?;
            for &c in &cells {
                let alu = node(&g, NodeKey::Compute(c))?;
                g.add_edge(reg, alu, 0.0);
            }
        }

        for i in 0..params.input_ports {
            let port = g.add_node(NodeKey::InPort(i))?;
            let entry = Coord::new(i % width, 0);
            let alu = node(&g, NodeKey::Compute(entry))?;
            g.add_edge(port, alu, 0.0);
            for d in Direction::ALL {
                if in_bounds(entry, d).is_some() {
                    let sw = node(&g, NodeKey::Switch(entry, d))?;
                    g.add_edge(port, sw, 1.0);
                }
            }
        }

        for i in 0..params.output_ports {
            let port = g.add_node(NodeKey::OutPort(i))?;
            let exit = Coord::new(i % width, height - 1);
            let alu = node(&g, NodeKey::Compute(exit))?;
            g.add_edge(alu, port, 0.0);
            for d in Direction::ALL {
                let Some(from) = in_bounds(exit, d) else { continue };
                let sw = node(&g, NodeKey::Switch(from, d.opposite()))?;
                g.add_edge(sw, port, 0.0);
            }
        }

        Self::from_graph(
            name,
            width,
            height,
            g,
            params.pipeline_cuts,
            params.const_routing,
        )
    }

    /// Position a node's signal is at or heading to, for distance estimates.
    fn reach(&self, node: NodeId) -> Option<(i64, i64)> {
        match self.graph.node(node).key {
            NodeKey::Compute(c) => Some((i64::from(c.x), i64::from(c.y))),
            NodeKey::Switch(c, d) => {
                let (dx, dy) = d.delta();
                Some((i64::from(c.x) + dx, i64::from(c.y) + dy))
            }
            _ => None,
        }
    }
}

/// Cut line crossed when a signal moves from row `from.y` to row `to.y`.
fn crossed_cut(from: Coord, to: Coord, cuts: u32) -> Option<u32> {
    let upper = from.y.min(to.y);
    (from.y != to.y && upper < cuts).then_some(upper)
}

impl Architecture for GridArchitecture {
    fn name(&self) -> &str {
        &self.name
    }

    fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn resource_graph(&self) -> &ResourceGraph {
        &self.graph
    }

    fn resource_graph_mut(&mut self) -> &mut ResourceGraph {
        &mut self.graph
    }

    fn compute_node(&self, coord: Coord) -> Option<NodeId> {
        if coord.x >= self.width || coord.y >= self.height {
            return None;
        }
        self.compute[coord.linear(self.width)]
    }

    fn switch_outputs(&self, coord: Coord) -> Vec<NodeId> {
        if coord.x >= self.width || coord.y >= self.height {
            return Vec::new();
        }
        self.switches[coord.linear(self.width)].clone()
    }

    fn const_registers(&self) -> &[NodeId] {
        &self.consts
    }

    fn input_ports(&self) -> &[NodeId] {
        &self.inputs
    }

    fn output_ports(&self) -> &[NodeId] {
        &self.outputs
    }

    fn pipeline_len(&self) -> usize {
        self.pipeline_cuts as usize
    }

    fn needs_const_routing(&self) -> bool {
        self.const_routing
    }

    fn hop_lower_bound(&self, from: NodeId, to: NodeId) -> f64 {
        match (self.reach(from), self.reach(to)) {
            (Some((fx, fy)), Some((tx, ty))) => ((fx - tx).abs() + (fy - ty).abs()) as f64,
            _ => 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::NodeKind;

    #[test]
    fn mesh_2x2_counts() {
        let arch = GridArchitecture::mesh("m", GridParams::new(2, 2)).unwrap();
        let g = arch.resource_graph();
        assert_eq!(g.nodes_of_kind(NodeKind::Compute).len(), 4);
        // Corners have two in-bounds directions each.
        assert_eq!(g.nodes_of_kind(NodeKind::SwitchOutput).len(), 8);
        assert_eq!(arch.switch_outputs(Coord::new(0, 0)).len(), 2);
    }

    #[test]
    fn mesh_switch_feeds_neighbour() {
        let arch = GridArchitecture::mesh("m", GridParams::new(3, 1)).unwrap();
        let g = arch.resource_graph();
        let sw = g
            .node_id(NodeKey::Switch(Coord::new(0, 0), Direction::East))
            .unwrap();
        let right = arch.compute_node(Coord::new(1, 0)).unwrap();
        assert!(g.find_edge(sw, right).is_some());
        let onward = g
            .node_id(NodeKey::Switch(Coord::new(1, 0), Direction::East))
            .unwrap();
        assert!(g.find_edge(sw, onward).is_some());
        let back = g
            .node_id(NodeKey::Switch(Coord::new(1, 0), Direction::West))
            .unwrap();
        assert!(g.find_edge(sw, back).is_none());
    }

    #[test]
    fn mesh_ports_and_consts() {
        let mut params = GridParams::new(2, 3);
        params.const_registers = 2;
        params.input_ports = 2;
        params.output_ports = 1;
        let arch = GridArchitecture::mesh("m", params).unwrap();
        assert_eq!(arch.const_registers().len(), 2);
        assert_eq!(arch.input_ports().len(), 2);
        assert_eq!(arch.output_ports().len(), 1);
        let g = arch.resource_graph();
        assert_eq!(g.out_edges(arch.const_registers()[0]).len(), 6);
        let exit = arch.compute_node(Coord::new(0, 2)).unwrap();
        assert!(g.find_edge(exit, arch.output_ports()[0]).is_some());
    }

    #[test]
    fn mesh_marks_cut_crossings() {
        let mut params = GridParams::new(1, 3);
        params.pipeline_cuts = 2;
        let arch = GridArchitecture::mesh("m", params).unwrap();
        let g = arch.resource_graph();
        let down = g
            .node_id(NodeKey::Switch(Coord::new(0, 1), Direction::South))
            .unwrap();
        let bottom = arch.compute_node(Coord::new(0, 2)).unwrap();
        let e = g.find_edge(down, bottom).unwrap();
        assert_eq!(g.edge(e).cut, Some(1));
    }

    #[test]
    fn mesh_rejects_bad_cuts() {
        let mut params = GridParams::new(2, 2);
        params.pipeline_cuts = 2;
        assert!(GridArchitecture::mesh("m", params).is_err());
    }

    #[test]
    fn hop_bound_uses_switch_heading() {
        let arch = GridArchitecture::mesh("m", GridParams::new(3, 3)).unwrap();
        let g = arch.resource_graph();
        let target = arch.compute_node(Coord::new(2, 0)).unwrap();
        let source = arch.compute_node(Coord::new(0, 0)).unwrap();
        let heading_east = g
            .node_id(NodeKey::Switch(Coord::new(0, 0), Direction::East))
            .unwrap();
        assert_eq!(arch.hop_lower_bound(source, target), 2.0);
        assert_eq!(arch.hop_lower_bound(heading_east, target), 1.0);
    }

    #[test]
    fn from_graph_rejects_out_of_bounds() {
        let mut g = ResourceGraph::new();
        g.add_node(NodeKey::Compute(Coord::new(5, 0))).unwrap();
        assert!(GridArchitecture::from_graph("x", 2, 2, g, 0, true).is_err());
    }
}
