//! Liveness as a forward dataflow problem over the control graph.

use ara_ir::ast::ResourceExpr;
use ara_ir::{Direction, Environment, Ident, Span};

use crate::dataflow::{DataflowProblem, Neighbours};
use crate::graph::{BlockId, ControlGraph};
use crate::paths::{created_resources, destroyed_resources, resource_paths, ResourcePath};
use crate::storage::StorageError;

use super::LivenessDescriptor;

/// Forward liveness over the blocks of one routine.
///
/// The begin block starts with every input parameter initialized at its
/// declaration; every other block, and every OUT value, starts unknown.
pub struct LivenessProblem<'g, 'r> {
    graph: &'g ControlGraph<'r>,
    begin_in: LivenessDescriptor,
    unknown: LivenessDescriptor,
}

impl<'g, 'r> LivenessProblem<'g, 'r> {
    pub fn new(
        graph: &'g ControlGraph<'r>,
        env: &Environment,
        inputs: &[Ident],
    ) -> Result<Self, StorageError> {
        let unknown = LivenessDescriptor::all_unknown(env)?;
        let mut begin_in = unknown.clone();
        for input in inputs {
            begin_in.initialize(&ResourcePath::root(input.name.clone()), input.span)?;
        }
        Ok(LivenessProblem {
            graph,
            begin_in,
            unknown,
        })
    }
}

/// Apply `update` to every slot `exprs` denote, at the expression's span.
fn apply(
    state: &mut LivenessDescriptor,
    exprs: &[ResourceExpr],
    update: fn(&mut LivenessDescriptor, &ResourcePath, Span) -> Result<(), StorageError>,
) {
    for expr in exprs {
        for path in resource_paths(expr) {
            if let Err(error) = update(state, &path, expr.span()) {
                tracing::warn!(%path, %error, "skipping resource outside the environment");
            }
        }
    }
}

impl DataflowProblem for LivenessProblem<'_, '_> {
    type Node = BlockId;
    type Value = LivenessDescriptor;

    fn direction(&self) -> Direction {
        Direction::Forward
    }

    fn nodes(&self) -> Vec<BlockId> {
        self.graph.blocks().iter().map(|block| block.id).collect()
    }

    fn predecessors(&self, node: BlockId) -> Neighbours<BlockId> {
        self.graph.predecessors(node)
    }

    fn successors(&self, node: BlockId) -> Neighbours<BlockId> {
        self.graph.successors(node)
    }

    fn initial_in(&self, node: BlockId) -> LivenessDescriptor {
        if node == self.graph.begin() {
            self.begin_in.clone()
        } else {
            self.unknown.clone()
        }
    }

    fn initial_out(&self, _node: BlockId) -> LivenessDescriptor {
        self.unknown.clone()
    }

    fn combine(&self, a: &LivenessDescriptor, b: &LivenessDescriptor) -> LivenessDescriptor {
        a.meet(b)
    }

    /// Finalize what each instruction destroys, then initialize what it
    /// creates, in instruction order.
    fn transfer(&self, value: &LivenessDescriptor, node: BlockId) -> LivenessDescriptor {
        let mut state = value.clone();
        for instruction in self.graph.block(node).instructions {
            apply(&mut state, destroyed_resources(instruction), LivenessDescriptor::finalize);
            apply(&mut state, created_resources(instruction), LivenessDescriptor::initialize);
        }
        state
    }
}
