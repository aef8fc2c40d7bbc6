//! The application model and its builder.

use crate::error::DfgError;
use crate::ids::OpId;
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use std::collections::HashMap;

/// One operation of the dataflow graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operation {
    /// Unique name.
    pub name: String,
    /// Opcode mnemonic, opaque to the mapper.
    pub opcode: String,
}

/// A data dependency between two operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompEdge {
    /// Producing operation.
    pub src: OpId,
    /// Consuming operation.
    pub dst: OpId,
    /// Operand slot of the consumer.
    pub slot: u32,
}

/// A constant operand feeding an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConstEdge {
    /// The constant value.
    pub value: i64,
    /// Consuming operation.
    pub consumer: OpId,
    /// Operand slot of the consumer.
    pub slot: u32,
}

/// An application input and the operations reading it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputPort {
    /// Input name.
    pub name: String,
    /// `(consumer, slot)` pairs.
    pub consumers: Vec<(OpId, u32)>,
}

/// An application output and the operation producing it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPort {
    /// Output name.
    pub name: String,
    /// Producing operation.
    pub producer: OpId,
}

/// A validated, acyclic application dataflow graph.
///
/// Operation `i` is node `i` of the computation subgraph, so [`OpId`] and
/// petgraph node indices convert one to one.
#[derive(Debug, Clone)]
pub struct Application {
    name: String,
    ops: Vec<Operation>,
    comp: DiGraph<OpId, u32>,
    consts: Vec<ConstEdge>,
    inputs: Vec<InputPort>,
    outputs: Vec<OutputPort>,
    topo: Vec<OpId>,
}

impl Application {
    /// The application name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of operations.
    pub fn op_count(&self) -> usize {
        self.ops.len()
    }

    /// All operations in id order.
    pub fn operations(&self) -> &[Operation] {
        &self.ops
    }

    /// Returns one operation.
    pub fn op(&self, id: OpId) -> &Operation {
        &self.ops[id.index()]
    }

    /// All operation ids in declaration order.
    pub fn op_ids(&self) -> impl Iterator<Item = OpId> {
        (0..self.ops.len() as u32).map(OpId::from_raw)
    }

    /// Looks an operation up by name.
    pub fn find_op(&self, name: &str) -> Option<OpId> {
        self.ops
            .iter()
            .position(|op| op.name == name)
            .map(|i| OpId::from_raw(i as u32))
    }

    /// The computation subgraph; edge weights are operand slots.
    pub fn comp_graph(&self) -> &DiGraph<OpId, u32> {
        &self.comp
    }

    /// Every operation-to-operation dependency.
    pub fn comp_edges(&self) -> Vec<CompEdge> {
        self.comp
            .edge_references()
            .map(|e| CompEdge {
                src: self.comp[e.source()],
                dst: self.comp[e.target()],
                slot: *e.weight(),
            })
            .collect()
    }

    /// Distinct operations consuming the result of `op`, in id order.
    pub fn consumers(&self, op: OpId) -> Vec<OpId> {
        self.neighbours(op, Direction::Outgoing)
    }

    /// Distinct operations whose results `op` consumes, in id order.
    pub fn producers(&self, op: OpId) -> Vec<OpId> {
        self.neighbours(op, Direction::Incoming)
    }

    fn neighbours(&self, op: OpId, dir: Direction) -> Vec<OpId> {
        let mut out: Vec<OpId> = self
            .comp
            .neighbors_directed(NodeIndex::new(op.index()), dir)
            .map(|n| self.comp[n])
            .collect();
        out.sort_unstable();
        out.dedup();
        out
    }

    /// Number of distinct consumers of `op`.
    pub fn fan_out(&self, op: OpId) -> usize {
        self.consumers(op).len()
    }

    /// The constant subgraph.
    pub fn const_edges(&self) -> &[ConstEdge] {
        &self.consts
    }

    /// Distinct constant values, ascending.
    pub fn distinct_constants(&self) -> Vec<i64> {
        let mut values: Vec<i64> = self.consts.iter().map(|c| c.value).collect();
        values.sort_unstable();
        values.dedup();
        values
    }

    /// The input port subgraph.
    pub fn inputs(&self) -> &[InputPort] {
        &self.inputs
    }

    /// The output port subgraph.
    pub fn outputs(&self) -> &[OutputPort] {
        &self.outputs
    }

    /// Operations in a topological order of the computation subgraph.
    pub fn topo_order(&self) -> &[OpId] {
        &self.topo
    }

    /// Whether any operation reads a constant.
    pub fn uses_constants(&self) -> bool {
        !self.consts.is_empty()
    }

    /// Whether any input has a consumer.
    pub fn uses_inputs(&self) -> bool {
        self.inputs.iter().any(|p| !p.consumers.is_empty())
    }

    /// Whether the application drives any output.
    pub fn uses_outputs(&self) -> bool {
        !self.outputs.is_empty()
    }
}

/// Incrementally assembles an [`Application`].
#[derive(Debug, Default)]
pub struct ApplicationBuilder {
    name: String,
    ops: Vec<Operation>,
    names: HashMap<String, OpId>,
    edges: Vec<CompEdge>,
    consts: Vec<ConstEdge>,
    inputs: Vec<InputPort>,
    outputs: Vec<OutputPort>,
}

impl ApplicationBuilder {
    /// Starts an empty application.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    fn claim_name(&self, name: &str) -> Result<(), DfgError> {
        let taken = self.names.contains_key(name)
            || self.inputs.iter().any(|p| p.name == name)
            || self.outputs.iter().any(|p| p.name == name);
        if taken {
            return Err(DfgError::DuplicateName(name.to_string()));
        }
        Ok(())
    }

    /// Adds an operation.
    pub fn op(&mut self, name: &str, opcode: &str) -> Result<OpId, DfgError> {
        self.claim_name(name)?;
        let id = OpId::from_raw(self.ops.len() as u32);
        self.ops.push(Operation {
            name: name.to_string(),
            opcode: opcode.to_string(),
        });
        self.names.insert(name.to_string(), id);
        Ok(id)
    }

    /// Looks up an operation added earlier.
    pub fn op_id(&self, name: &str) -> Option<OpId> {
        self.names.get(name).copied()
    }

    /// Adds a dependency feeding operand `slot` of `dst` from `src`.
    pub fn edge(&mut self, src: OpId, dst: OpId, slot: u32) -> &mut Self {
        self.edges.push(CompEdge { src, dst, slot });
        self
    }

    /// Feeds constant `value` into operand `slot` of `consumer`.
    pub fn constant(&mut self, value: i64, consumer: OpId, slot: u32) -> &mut Self {
        self.consts.push(ConstEdge {
            value,
            consumer,
            slot,
        });
        self
    }

    /// Declares an input and returns its index.
    pub fn input(&mut self, name: &str) -> Result<usize, DfgError> {
        self.claim_name(name)?;
        self.inputs.push(InputPort {
            name: name.to_string(),
            consumers: Vec::new(),
        });
        Ok(self.inputs.len() - 1)
    }

    /// Looks up an input declared earlier.
    pub fn input_index(&self, name: &str) -> Option<usize> {
        self.inputs.iter().position(|p| p.name == name)
    }

    /// Feeds input `port` into operand `slot` of `consumer`.
    pub fn input_edge(&mut self, port: usize, consumer: OpId, slot: u32) -> &mut Self {
        if let Some(p) = self.inputs.get_mut(port) {
            p.consumers.push((consumer, slot));
        }
        self
    }

    /// Declares an output driven by `producer`.
    pub fn output(&mut self, name: &str, producer: OpId) -> Result<(), DfgError> {
        self.claim_name(name)?;
        self.outputs.push(OutputPort {
            name: name.to_string(),
            producer,
        });
        Ok(())
    }

    /// Validates acyclicity and produces the application.
    pub fn build(self) -> Result<Application, DfgError> {
        if self.ops.is_empty() {
            return Err(DfgError::Empty(self.name));
        }
        let mut comp = DiGraph::<OpId, u32>::with_capacity(self.ops.len(), self.edges.len());
        for i in 0..self.ops.len() {
            comp.add_node(OpId::from_raw(i as u32));
        }
        for e in &self.edges {
            comp.add_edge(NodeIndex::new(e.src.index()), NodeIndex::new(e.dst.index()), e.slot);
        }
        let topo = match toposort(&comp, None) {
            Ok(order) => order.into_iter().map(|n| comp[n]).collect(),
            Err(cycle) => {
                let op = comp[cycle.node_id()];
                return Err(DfgError::Cycle(self.ops[op.index()].name.clone()));
            }
        };
        Ok(Application {
            name: self.name,
            ops: self.ops,
            comp,
            consts: self.consts,
            inputs: self.inputs,
            outputs: self.outputs,
            topo,
        })
    }
}
