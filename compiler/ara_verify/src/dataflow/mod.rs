//! Generic worklist dataflow framework.
//!
//! A [`DataflowProblem`] names its nodes, their neighbours, a direction,
//! initial values, a meet (`combine`) and a transfer function. A
//! [`DataflowSolver`] turns it into a [`DataflowSolution`] holding the IN and
//! OUT value of every node.
//!
//! # Algorithm
//!
//! The solver works on *equation* inputs and outputs. For a forward problem
//! the equation input of a node is its IN value and the equation output its
//! OUT value; for a backward problem the roles swap.
//!
//! 1. Seed the equation maps from the initial values (swapped for backward).
//! 2. Queue every node.
//! 3. Pop a node, meet its current equation input with the equation output
//!    of every equation-input neighbour (predecessors if forward, successors
//!    if backward), run the transfer function.
//! 4. If the equation output changed, queue every equation-output neighbour
//!    not already queued.
//!
//! Termination relies on a finite-height lattice and a monotone meet; the
//! current equation input always takes part in the meet, so values only move
//! up the lattice.

use std::collections::VecDeque;
use std::fmt;
use std::hash::Hash;

use ara_ir::Direction;
use rustc_hash::{FxHashMap, FxHashSet};
use smallvec::SmallVec;

/// Neighbour list returned by [`DataflowProblem::predecessors`] and
/// [`DataflowProblem::successors`].
pub type Neighbours<N> = SmallVec<[N; 2]>;

/// An instance of a dataflow analysis over some graph.
pub trait DataflowProblem {
    type Node: Copy + Eq + Hash + fmt::Debug;
    type Value: Clone + PartialEq;

    fn direction(&self) -> Direction;

    /// Every node, in the order they are first queued.
    fn nodes(&self) -> Vec<Self::Node>;

    fn predecessors(&self, node: Self::Node) -> Neighbours<Self::Node>;

    fn successors(&self, node: Self::Node) -> Neighbours<Self::Node>;

    fn initial_in(&self, node: Self::Node) -> Self::Value;

    fn initial_out(&self, node: Self::Node) -> Self::Value;

    /// Meet of two values.
    fn combine(&self, a: &Self::Value, b: &Self::Value) -> Self::Value;

    /// Equation output of `node` given its equation input.
    fn transfer(&self, value: &Self::Value, node: Self::Node) -> Self::Value;
}

/// Strategy for computing the fixpoint of a [`DataflowProblem`].
pub trait DataflowSolver {
    fn solve<P: DataflowProblem>(&self, problem: &P) -> DataflowSolution<P::Node, P::Value>;
}

/// Solve `problem` with the default [`WorklistSolver`].
pub fn solve<P: DataflowProblem>(problem: &P) -> DataflowSolution<P::Node, P::Value> {
    WorklistSolver.solve(problem)
}

/// IN and OUT values of every node at the fixpoint.
///
/// Both maps are defined for exactly the nodes of the problem.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DataflowSolution<N: Eq + Hash, V> {
    ins: FxHashMap<N, V>,
    outs: FxHashMap<N, V>,
    iterations: usize,
}

impl<N: Copy + Eq + Hash, V> DataflowSolution<N, V> {
    pub fn get_in(&self, node: N) -> Option<&V> {
        self.ins.get(&node)
    }

    pub fn get_out(&self, node: N) -> Option<&V> {
        self.outs.get(&node)
    }

    /// Number of nodes popped from the worklist before it emptied.
    pub fn iterations(&self) -> usize {
        self.iterations
    }

    pub fn len(&self) -> usize {
        self.ins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ins.is_empty()
    }
}

/// FIFO worklist solver.
#[derive(Clone, Copy, Debug, Default)]
pub struct WorklistSolver;

impl WorklistSolver {
    fn equation_inputs<P: DataflowProblem>(problem: &P, node: P::Node) -> Neighbours<P::Node> {
        match problem.direction() {
            Direction::Forward => problem.predecessors(node),
            Direction::Backward => problem.successors(node),
        }
    }

    fn equation_outputs<P: DataflowProblem>(problem: &P, node: P::Node) -> Neighbours<P::Node> {
        match problem.direction() {
            Direction::Forward => problem.successors(node),
            Direction::Backward => problem.predecessors(node),
        }
    }
}

impl DataflowSolver for WorklistSolver {
    fn solve<P: DataflowProblem>(&self, problem: &P) -> DataflowSolution<P::Node, P::Value> {
        let direction = problem.direction();
        let nodes = problem.nodes();

        tracing::debug!(%direction, num_nodes = nodes.len(), "solving dataflow problem");

        let mut eq_in: FxHashMap<P::Node, P::Value> = FxHashMap::default();
        let mut eq_out: FxHashMap<P::Node, P::Value> = FxHashMap::default();
        for &node in &nodes {
            let (input, output) = match direction {
                Direction::Forward => (problem.initial_in(node), problem.initial_out(node)),
                Direction::Backward => (problem.initial_out(node), problem.initial_in(node)),
            };
            eq_in.insert(node, input);
            eq_out.insert(node, output);
        }

        let mut worklist: VecDeque<P::Node> = nodes.iter().copied().collect();
        let mut queued: FxHashSet<P::Node> = nodes.iter().copied().collect();
        let mut iterations = 0usize;

        while let Some(node) = worklist.pop_front() {
            queued.remove(&node);
            iterations += 1;

            let Some(current) = eq_in.get(&node) else {
                continue;
            };
            let mut input = current.clone();
            for neighbour in Self::equation_inputs(problem, node) {
                if let Some(value) = eq_out.get(&neighbour) {
                    input = problem.combine(&input, value);
                }
            }

            let output = problem.transfer(&input, node);
            eq_in.insert(node, input);

            let changed = eq_out.get(&node) != Some(&output);
            tracing::trace!(iteration = iterations, ?node, changed, "dataflow step");
            if changed {
                eq_out.insert(node, output);
                for affected in Self::equation_outputs(problem, node) {
                    if eq_in.contains_key(&affected) && queued.insert(affected) {
                        worklist.push_back(affected);
                    }
                }
            }
        }

        tracing::debug!(iterations, "dataflow converged");

        let (ins, outs) = match direction {
            Direction::Forward => (eq_in, eq_out),
            Direction::Backward => (eq_out, eq_in),
        };
        DataflowSolution {
            ins,
            outs,
            iterations,
        }
    }
}

#[cfg(test)]
mod tests;
