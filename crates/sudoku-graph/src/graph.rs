//! Constraint graph over the 9×9 grid.
//!
//! Owns the 81 cells and their 81-vertex graph mirror. The edge set is the
//! fixed Sudoku adjacency (shared row, column, or 3×3 block); only vertex
//! values and domains change after construction. All external mutation goes
//! through the value-setting operations, which re-validate legality and
//! recompute every domain.

use crate::bitset::{DomainSet, NeighborSet};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One Sudoku square in puzzle representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cell {
    /// 0 = empty, 1..=9 = assigned value
    pub value: u8,
    /// Whether the value is a puzzle clue
    pub is_fixed: bool,
    pub row: usize,
    pub col: usize,
    /// 3×3 block index, 0..=8
    pub block: usize,
}

/// One Sudoku square in graph representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vertex {
    /// `row * 9 + col`
    pub id: usize,
    pub row: usize,
    pub col: usize,
    pub block: usize,
    /// Mirrors the cell value
    pub value: u8,
    /// Values still legal for this vertex ({value} once assigned)
    pub domain: DomainSet,
    /// Ids of vertices sharing a row, column, or block; fixed at construction
    pub neighbors: NeighborSet,
}

/// The 81 vertices plus the symmetric, static edge list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Graph {
    pub vertices: Vec<Vertex>,
    /// One entry per connected pair, `(i, j)` with `i < j`
    pub edges: Vec<(usize, usize)>,
}

/// Summary counts for the visualization layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphStats {
    pub total_vertices: usize,
    pub total_edges: usize,
    pub empty_vertices: usize,
    pub filled_vertices: usize,
    /// Rounded fill percentage, 0..=100
    pub completion_percentage: usize,
}

/// Why a value-setting operation was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveError {
    /// Row or column outside 0..=8
    OutOfBounds { row: usize, col: usize },
    /// Value outside 0..=9
    InvalidValue { value: u8 },
    /// Another cell in the same row, column, or block holds the value
    Conflict { row: usize, col: usize, value: u8 },
}

impl fmt::Display for MoveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MoveError::OutOfBounds { row, col } => {
                write!(f, "cell ({row}, {col}) is outside the grid")
            }
            MoveError::InvalidValue { value } => write!(f, "value {value} is outside 0..=9"),
            MoveError::Conflict { row, col, value } => {
                write!(f, "value {value} conflicts with a peer of ({row}, {col})")
            }
        }
    }
}

impl std::error::Error for MoveError {}

/// Raw capture of the grid state (values and fixed flags), used to restore
/// a graph after a probing search without going through the legality checks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridSnapshot {
    /// Indexed by vertex id: `(value, is_fixed)`
    pub cells: Vec<(u8, bool)>,
}

/// Convert (row, col) to the unique vertex id.
#[inline]
pub fn cell_to_id(row: usize, col: usize) -> usize {
    row * 9 + col
}

/// Convert a vertex id back to (row, col).
#[inline]
pub fn id_to_cell(id: usize) -> (usize, usize) {
    (id / 9, id % 9)
}

#[inline]
fn block_of(row: usize, col: usize) -> usize {
    (row / 3) * 3 + col / 3
}

/// The 20 ids sharing a row, column, or block with `id`, excluding `id`.
fn compute_neighbors(id: usize) -> NeighborSet {
    let (row, col) = id_to_cell(id);
    let block = block_of(row, col);
    let mut set = NeighborSet::empty();
    for other in 0..81 {
        if other == id {
            continue;
        }
        let (r, c) = id_to_cell(other);
        if r == row || c == col || block_of(r, c) == block {
            set.insert(other);
        }
    }
    set
}

/// The 81-cell grid and its constraint-graph mirror.
pub struct ConstraintGraph {
    grid: [[Cell; 9]; 9],
    graph: Graph,
}

impl Default for ConstraintGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl ConstraintGraph {
    /// Create an empty grid with the full Sudoku adjacency.
    pub fn new() -> Self {
        let grid = std::array::from_fn(|row| {
            std::array::from_fn(|col| Cell {
                value: 0,
                is_fixed: false,
                row,
                col,
                block: block_of(row, col),
            })
        });

        let vertices: Vec<Vertex> = (0..81)
            .map(|id| {
                let (row, col) = id_to_cell(id);
                Vertex {
                    id,
                    row,
                    col,
                    block: block_of(row, col),
                    value: 0,
                    domain: DomainSet::full(),
                    neighbors: compute_neighbors(id),
                }
            })
            .collect();

        let mut edges = Vec::new();
        for i in 0..81 {
            for j in (i + 1)..81 {
                if vertices[i].neighbors.contains(j) {
                    edges.push((i, j));
                }
            }
        }

        Self {
            grid,
            graph: Graph { vertices, edges },
        }
    }

    /// Build a graph from an 81-character puzzle literal, row-major, with
    /// `0` or `.` for empty cells. Whitespace is ignored. Returns `None` on
    /// malformed input or clues that conflict with each other.
    pub fn from_string(s: &str) -> Option<Self> {
        let mut puzzle = [[0u8; 9]; 9];
        let mut idx = 0;
        for ch in s.chars() {
            if ch.is_whitespace() {
                continue;
            }
            if idx >= 81 {
                return None;
            }
            let value = match ch {
                '0' | '.' => 0,
                '1'..='9' => ch as u8 - b'0',
                _ => return None,
            };
            let (row, col) = id_to_cell(idx);
            puzzle[row][col] = value;
            idx += 1;
        }
        if idx != 81 {
            return None;
        }

        let mut graph = Self::new();
        if graph.load_puzzle(&puzzle) {
            Some(graph)
        } else {
            None
        }
    }

    // ==================== Mutation ====================

    /// Set a cell value as a normal (non-clue) move. `value == 0` clears
    /// the cell and always succeeds for in-range coordinates. Returns false
    /// and leaves the graph untouched on out-of-range input or a conflict.
    pub fn set_value(&mut self, row: usize, col: usize, value: u8) -> bool {
        self.apply_value(row, col, value, false).is_ok()
    }

    /// Set a cell value as a puzzle clue (`is_fixed = true`).
    pub fn set_given(&mut self, row: usize, col: usize, value: u8) -> bool {
        self.apply_value(row, col, value, true).is_ok()
    }

    /// Reset every non-fixed cell to empty; clues are preserved.
    pub fn clear(&mut self) {
        for row in 0..9 {
            for col in 0..9 {
                if !self.grid[row][col].is_fixed {
                    self.grid[row][col].value = 0;
                    self.graph.vertices[cell_to_id(row, col)].value = 0;
                }
            }
        }
        self.recompute_domains();
    }

    /// Load a puzzle: reset everything (clues included), then assign each
    /// nonzero entry as a fixed clue. Clues that conflict with an earlier
    /// clue are skipped and logged. Returns whether every clue was accepted.
    pub fn load_puzzle(&mut self, puzzle: &[[u8; 9]; 9]) -> bool {
        self.reset_all();
        let mut all_accepted = true;
        for row in 0..9 {
            for col in 0..9 {
                let value = puzzle[row][col];
                if value == 0 {
                    continue;
                }
                if self.apply_value(row, col, value, true).is_err() {
                    log::warn!("skipping illegal clue {value} at ({row}, {col})");
                    all_accepted = false;
                }
            }
        }
        all_accepted
    }

    fn reset_all(&mut self) {
        for row in 0..9 {
            for col in 0..9 {
                self.grid[row][col].value = 0;
                self.grid[row][col].is_fixed = false;
            }
        }
        for vertex in &mut self.graph.vertices {
            vertex.value = 0;
        }
        self.recompute_domains();
    }

    fn apply_value(
        &mut self,
        row: usize,
        col: usize,
        value: u8,
        is_fixed: bool,
    ) -> Result<(), MoveError> {
        self.check_move(row, col, value)?;

        let cell = &mut self.grid[row][col];
        if value == 0 {
            cell.value = 0;
            cell.is_fixed = false;
        } else {
            cell.value = value;
            cell.is_fixed = is_fixed;
        }
        self.graph.vertices[cell_to_id(row, col)].value = value;
        self.recompute_domains();
        Ok(())
    }

    /// Recompute every vertex domain from the current assignment: assigned
    /// vertices get the singleton of their value, empty vertices get the
    /// full domain minus their assigned neighbors' values.
    fn recompute_domains(&mut self) {
        let values: [u8; 81] = std::array::from_fn(|id| self.graph.vertices[id].value);
        for vertex in &mut self.graph.vertices {
            if vertex.value != 0 {
                vertex.domain = DomainSet::singleton(vertex.value);
            } else {
                let mut domain = DomainSet::full();
                for neighbor in vertex.neighbors.iter() {
                    if values[neighbor] != 0 {
                        domain.remove(values[neighbor]);
                    }
                }
                vertex.domain = domain;
            }
        }
    }

    // ==================== Legality ====================

    /// Structured legality check for a prospective move.
    pub fn check_move(&self, row: usize, col: usize, value: u8) -> Result<(), MoveError> {
        if row > 8 || col > 8 {
            return Err(MoveError::OutOfBounds { row, col });
        }
        if value > 9 {
            return Err(MoveError::InvalidValue { value });
        }
        if value == 0 {
            // Clearing is always legal.
            return Ok(());
        }
        let id = cell_to_id(row, col);
        for neighbor in self.graph.vertices[id].neighbors.iter() {
            if self.graph.vertices[neighbor].value == value {
                return Err(MoveError::Conflict { row, col, value });
            }
        }
        Ok(())
    }

    /// Whether placing `value` at (row, col) would conflict with a peer.
    pub fn is_valid_move(&self, row: usize, col: usize, value: u8) -> bool {
        self.check_move(row, col, value).is_ok()
    }

    /// Whether no two assigned cells conflict under the row/column/block rule.
    pub fn is_valid(&self) -> bool {
        self.graph.vertices.iter().all(|vertex| {
            vertex.value == 0
                || vertex
                    .neighbors
                    .iter()
                    .all(|n| self.graph.vertices[n].value != vertex.value)
        })
    }

    /// Whether all 81 cells are assigned and the assignment is valid.
    pub fn is_complete(&self) -> bool {
        self.graph.vertices.iter().all(|v| v.value != 0) && self.is_valid()
    }

    // ==================== Snapshot / restore ====================

    /// Capture the current values and fixed flags.
    pub fn snapshot(&self) -> GridSnapshot {
        GridSnapshot {
            cells: (0..81)
                .map(|id| {
                    let (row, col) = id_to_cell(id);
                    let cell = &self.grid[row][col];
                    (cell.value, cell.is_fixed)
                })
                .collect(),
        }
    }

    /// Restore a previously captured state by direct assignment, bypassing
    /// the legality checks, then recompute all domains. Probing searches
    /// rely on this to leave the graph exactly as they found it.
    pub fn restore(&mut self, snapshot: &GridSnapshot) {
        for (id, &(value, is_fixed)) in snapshot.cells.iter().enumerate().take(81) {
            let (row, col) = id_to_cell(id);
            self.grid[row][col].value = value;
            self.grid[row][col].is_fixed = is_fixed;
            self.graph.vertices[id].value = value;
        }
        self.recompute_domains();
    }

    // ==================== Accessors ====================

    pub fn grid(&self) -> &[[Cell; 9]; 9] {
        &self.grid
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn cell(&self, row: usize, col: usize) -> Option<&Cell> {
        if row > 8 || col > 8 {
            return None;
        }
        Some(&self.grid[row][col])
    }

    pub fn vertex(&self, id: usize) -> Option<&Vertex> {
        self.graph.vertices.get(id)
    }

    /// The current assignment as a plain 9×9 value matrix.
    pub fn values(&self) -> [[u8; 9]; 9] {
        std::array::from_fn(|row| std::array::from_fn(|col| self.grid[row][col].value))
    }

    pub fn stats(&self) -> GraphStats {
        let total_vertices = self.graph.vertices.len();
        let empty_vertices = self.graph.vertices.iter().filter(|v| v.value == 0).count();
        let filled_vertices = total_vertices - empty_vertices;
        GraphStats {
            total_vertices,
            total_edges: self.graph.edges.len(),
            empty_vertices,
            filled_vertices,
            completion_percentage: (filled_vertices * 100 + total_vertices / 2) / total_vertices,
        }
    }
}

impl fmt::Display for ConstraintGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in 0..9 {
            if row % 3 == 0 && row != 0 {
                writeln!(f, "------+-------+------")?;
            }
            for col in 0..9 {
                if col % 3 == 0 && col != 0 {
                    write!(f, "| ")?;
                }
                match self.grid[row][col].value {
                    0 => write!(f, ". ")?,
                    v => write!(f, "{v} ")?,
                }
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
