//! Sudoku as a constraint graph.
//!
//! Models the 9×9 grid as an 81-vertex graph whose edges connect cells
//! sharing a row, column, or 3×3 block, and solves it by backtracking
//! search over per-vertex value domains. Three components, bottom-up:
//!
//! - [`ConstraintGraph`] owns the grid, the graph topology, and the
//!   per-vertex domains; every external mutation goes through its
//!   legality-checked value setters.
//! - [`Solver`] runs the MRV-guided backtracking search, producing a
//!   [`SolveResult`] with the full step trace and statistics, and answers
//!   the solvability and uniqueness probes.
//! - [`Generator`] builds complete random grids and carves puzzles out of
//!   them per [`Difficulty`] tier, re-validating through the solver after
//!   every removal.

mod bitset;
mod generator;
mod graph;
mod solver;

pub use bitset::{DomainSet, NeighborSet};
pub use generator::{
    predefined_puzzle, Difficulty, DifficultySettings, Generator, UnknownDifficulty,
};
pub use graph::{
    cell_to_id, id_to_cell, Cell, ConstraintGraph, Graph, GraphStats, GridSnapshot, MoveError,
    Vertex,
};
pub use solver::{SolveResult, Solver, Statistics, Step, StepAction};
