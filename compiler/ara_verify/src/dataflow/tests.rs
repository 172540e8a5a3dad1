use ara_ir::Direction;
use pretty_assertions::assert_eq;

use super::*;

/// Reachability over bitmasks: every node adds its own bit, meet is union.
struct Reach {
    nodes: u32,
    edges: Vec<(u32, u32)>,
    direction: Direction,
    seed: u64,
}

impl Reach {
    fn new(nodes: u32, edges: &[(u32, u32)], direction: Direction) -> Self {
        Reach {
            nodes,
            edges: edges.to_vec(),
            direction,
            seed: 0,
        }
    }
}

impl DataflowProblem for Reach {
    type Node = u32;
    type Value = u64;

    fn direction(&self) -> Direction {
        self.direction
    }

    fn nodes(&self) -> Vec<u32> {
        (0..self.nodes).collect()
    }

    fn predecessors(&self, node: u32) -> Neighbours<u32> {
        self.edges.iter().filter(|e| e.1 == node).map(|e| e.0).collect()
    }

    fn successors(&self, node: u32) -> Neighbours<u32> {
        self.edges.iter().filter(|e| e.0 == node).map(|e| e.1).collect()
    }

    fn initial_in(&self, node: u32) -> u64 {
        if node == 0 {
            self.seed
        } else {
            0
        }
    }

    fn initial_out(&self, _node: u32) -> u64 {
        0
    }

    fn combine(&self, a: &u64, b: &u64) -> u64 {
        a | b
    }

    fn transfer(&self, value: &u64, node: u32) -> u64 {
        value | (1 << node)
    }
}

#[test]
fn forward_chain_accumulates_predecessors() {
    let problem = Reach::new(3, &[(0, 1), (1, 2)], Direction::Forward);
    let solution = solve(&problem);

    assert_eq!(solution.len(), 3);
    assert_eq!(solution.get_in(0), Some(&0b000));
    assert_eq!(solution.get_out(0), Some(&0b001));
    assert_eq!(solution.get_in(2), Some(&0b011));
    assert_eq!(solution.get_out(2), Some(&0b111));
    assert_eq!(solution.get_in(3), None);
}

#[test]
fn backward_chain_swaps_in_and_out() {
    let problem = Reach::new(3, &[(0, 1), (1, 2)], Direction::Backward);
    let solution = WorklistSolver.solve(&problem);

    // IN is the transfer result, OUT the meet over successors.
    assert_eq!(solution.get_in(2), Some(&0b100));
    assert_eq!(solution.get_out(1), Some(&0b100));
    assert_eq!(solution.get_in(1), Some(&0b110));
    assert_eq!(solution.get_in(0), Some(&0b111));
    assert_eq!(solution.get_out(0), Some(&0b110));
}

#[test]
fn initial_values_take_part_in_the_meet() {
    let mut problem = Reach::new(3, &[(0, 1), (1, 2)], Direction::Forward);
    problem.seed = 0b1000;
    let solution = solve(&problem);

    assert_eq!(solution.get_in(0), Some(&0b1000));
    assert_eq!(solution.get_out(2), Some(&0b1111));
}

#[test]
fn cycles_converge() {
    // 0 -> 1 -> 2 -> 1
    let problem = Reach::new(3, &[(0, 1), (1, 2), (2, 1)], Direction::Forward);
    let solution = solve(&problem);

    assert_eq!(solution.get_in(1), Some(&0b111));
    assert_eq!(solution.get_out(1), Some(&0b111));
    assert_eq!(solution.get_out(2), Some(&0b111));
    assert!(solution.iterations() >= 3);
}

#[test]
fn disconnected_nodes_keep_their_own_value() {
    let problem = Reach::new(2, &[], Direction::Forward);
    let solution = solve(&problem);

    assert_eq!(solution.get_out(0), Some(&0b01));
    assert_eq!(solution.get_out(1), Some(&0b10));
    assert_eq!(solution.iterations(), 2);
}

#[test]
fn solving_twice_is_deterministic() {
    let edges = [(0, 1), (0, 2), (1, 3), (2, 3), (3, 1)];
    let problem = Reach::new(4, &edges, Direction::Forward);

    assert_eq!(solve(&problem), solve(&problem));
}

#[test]
fn empty_problem_has_empty_solution() {
    let problem = Reach::new(0, &[], Direction::Forward);
    let solution = solve(&problem);

    assert!(solution.is_empty());
    assert_eq!(solution.iterations(), 0);
}
