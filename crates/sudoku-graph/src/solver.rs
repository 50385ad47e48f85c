//! Backtracking search over the constraint graph.
//!
//! Variable ordering is Minimum Remaining Values with a degree tie-break
//! (most constraining variable); values are tried in ascending order, so a
//! given starting grid always searches the same way. The same recursive
//! core serves two policies: stop at the first solution (the main solve
//! path) and count solutions up to a limit (the uniqueness probe).

use crate::graph::ConstraintGraph;
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// What a trace step records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepAction {
    Assign,
    Backtrack,
    Conflict,
}

/// One step of the search, in the order it happened. `domain_sizes` holds
/// every vertex's domain size at the instant the step was recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    pub vertex_id: usize,
    pub value: u8,
    pub action: StepAction,
    pub domain_sizes: Vec<u8>,
    /// Milliseconds since the search started
    pub timestamp_ms: u64,
}

/// Aggregate counters for one solve invocation.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Statistics {
    pub total_steps: usize,
    pub backtrack_steps: usize,
    pub conflicts_found: usize,
    pub time_elapsed_ms: f64,
    /// Playback cursor owned by the consuming layer; always 0 here
    pub current_step: usize,
}

/// Outcome of a solve: whether a solution was found, the full step trace,
/// and the accumulated statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolveResult {
    pub success: bool,
    pub steps: Vec<Step>,
    pub statistics: Statistics,
}

enum SearchPolicy {
    /// Accept the first solution and leave it on the graph.
    FirstSolution,
    /// Keep searching, undoing every assignment, until `limit` solutions
    /// have been seen or the space is exhausted.
    CountUpTo(usize),
}

struct SearchContext {
    policy: SearchPolicy,
    steps: Vec<Step>,
    stats: Statistics,
    solutions: usize,
    trace: bool,
    started: Instant,
}

impl SearchContext {
    fn new(policy: SearchPolicy, trace: bool) -> Self {
        Self {
            policy,
            steps: Vec::new(),
            stats: Statistics::default(),
            solutions: 0,
            trace,
            started: Instant::now(),
        }
    }

    fn record(&mut self, graph: &ConstraintGraph, vertex_id: usize, value: u8, action: StepAction) {
        if !self.trace {
            return;
        }
        let domain_sizes = graph
            .graph()
            .vertices
            .iter()
            .map(|v| v.domain.count() as u8)
            .collect();
        self.steps.push(Step {
            vertex_id,
            value,
            action,
            domain_sizes,
            timestamp_ms: self.started.elapsed().as_millis() as u64,
        });
    }
}

/// Tentative assignment that reverts itself unless explicitly kept, so a
/// failed branch cannot leave a value behind on any exit path.
struct ScopedAssign<'g> {
    graph: &'g mut ConstraintGraph,
    row: usize,
    col: usize,
    keep: bool,
}

impl<'g> ScopedAssign<'g> {
    /// Wrap an assignment that has already been applied to (row, col).
    fn new(graph: &'g mut ConstraintGraph, row: usize, col: usize) -> Self {
        Self {
            graph,
            row,
            col,
            keep: false,
        }
    }

    fn graph(&mut self) -> &mut ConstraintGraph {
        &mut *self.graph
    }

    /// Commit the assignment: the value stays when the guard drops.
    fn keep(mut self) {
        self.keep = true;
    }
}

impl Drop for ScopedAssign<'_> {
    fn drop(&mut self) {
        if !self.keep {
            self.graph.set_value(self.row, self.col, 0);
        }
    }
}

/// MRV vertex selection: among empty vertices, the smallest domain wins
/// and a larger degree breaks ties. `None` means no empty vertex remains.
fn select_next_vertex(graph: &ConstraintGraph) -> Option<usize> {
    let mut best: Option<(usize, usize, usize)> = None;
    for vertex in &graph.graph().vertices {
        if vertex.value != 0 {
            continue;
        }
        let domain_size = vertex.domain.count();
        let degree = vertex.neighbors.count();
        let better = match best {
            None => true,
            Some((_, best_size, best_degree)) => {
                domain_size < best_size || (domain_size == best_size && degree > best_degree)
            }
        };
        if better {
            best = Some((vertex.id, domain_size, degree));
        }
    }
    best.map(|(id, _, _)| id)
}

/// Stateless backtracking solver; all per-call state lives in the result.
pub struct Solver;

impl Default for Solver {
    fn default() -> Self {
        Self::new()
    }
}

impl Solver {
    pub fn new() -> Self {
        Self
    }

    /// Run the backtracking search to the first solution. On success the
    /// graph is left solved; on failure every tentative assignment has
    /// been undone and only the starting values remain.
    pub fn solve(&self, graph: &mut ConstraintGraph) -> SolveResult {
        let mut cx = SearchContext::new(SearchPolicy::FirstSolution, true);
        let success = self.search(graph, &mut cx);
        cx.stats.time_elapsed_ms = cx.started.elapsed().as_secs_f64() * 1000.0;
        log::debug!(
            "solve finished: success={success} steps={} backtracks={} conflicts={}",
            cx.stats.total_steps,
            cx.stats.backtrack_steps,
            cx.stats.conflicts_found,
        );
        SolveResult {
            success,
            steps: cx.steps,
            statistics: cx.stats,
        }
    }

    /// Count solutions up to `limit`, then restore the graph to the state
    /// it was in when the call was made.
    pub fn count_solutions(&self, graph: &mut ConstraintGraph, limit: usize) -> usize {
        if limit == 0 {
            return 0;
        }
        let snapshot = graph.snapshot();
        let mut cx = SearchContext::new(SearchPolicy::CountUpTo(limit), false);
        self.search(graph, &mut cx);
        graph.restore(&snapshot);
        cx.solutions
    }

    /// Whether the puzzle admits exactly one solution. Read-only probe:
    /// the graph is restored before returning.
    pub fn has_unique_solution(&self, graph: &mut ConstraintGraph) -> bool {
        self.count_solutions(graph, 2) == 1
    }

    /// Whether the puzzle admits at least one solution. Read-only probe:
    /// fails fast on an invalid grid or an empty vertex with an empty
    /// domain, otherwise solves against the current state and restores it.
    pub fn is_puzzle_solvable(&self, graph: &mut ConstraintGraph) -> bool {
        if !graph.is_valid() {
            return false;
        }
        if graph
            .graph()
            .vertices
            .iter()
            .any(|v| v.value == 0 && v.domain.is_empty())
        {
            return false;
        }

        let snapshot = graph.snapshot();
        let result = self.solve(graph);
        graph.restore(&snapshot);
        result.success
    }

    /// Recursive core shared by both policies. Returns true when the
    /// search should stop unwinding: first solution found, or the
    /// counting limit reached.
    fn search(&self, graph: &mut ConstraintGraph, cx: &mut SearchContext) -> bool {
        let Some(id) = select_next_vertex(graph) else {
            cx.solutions += 1;
            return match cx.policy {
                SearchPolicy::FirstSolution => true,
                SearchPolicy::CountUpTo(limit) => cx.solutions >= limit,
            };
        };

        let vertex = &graph.graph().vertices[id];
        let (row, col) = (vertex.row, vertex.col);
        let domain = vertex.domain;

        if domain.is_empty() {
            cx.stats.conflicts_found += 1;
            cx.record(graph, id, 0, StepAction::Conflict);
            return false;
        }

        for value in domain.iter() {
            cx.stats.total_steps += 1;

            if graph.set_value(row, col, value) {
                cx.record(graph, id, value, StepAction::Assign);
                let mut placed = ScopedAssign::new(graph, row, col);

                if self.search(placed.graph(), cx) {
                    if matches!(cx.policy, SearchPolicy::FirstSolution) {
                        placed.keep();
                    }
                    return true;
                }

                cx.stats.backtrack_steps += 1;
                cx.record(placed.graph(), id, 0, StepAction::Backtrack);
                // Guard drops here and reverts the assignment.
            } else {
                // Stale domain data only; the graph was not mutated.
                cx.stats.conflicts_found += 1;
                cx.record(graph, id, value, StepAction::Conflict);
            }
        }

        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CLASSIC: &str =
        "530070000600195000098000060800060003400803001700020006060000280000419005000080079";

    fn assert_solved(graph: &ConstraintGraph) {
        assert!(graph.is_complete());
        let values = graph.values();
        for i in 0..9 {
            let mut row_seen = [false; 10];
            let mut col_seen = [false; 10];
            let mut block_seen = [false; 10];
            for j in 0..9 {
                row_seen[values[i][j] as usize] = true;
                col_seen[values[j][i] as usize] = true;
                let (r, c) = ((i / 3) * 3 + j / 3, (i % 3) * 3 + j % 3);
                block_seen[values[r][c] as usize] = true;
            }
            for v in 1..=9 {
                assert!(row_seen[v] && col_seen[v] && block_seen[v]);
            }
        }
    }

    #[test]
    fn test_solve_classic_puzzle() {
        let mut graph = ConstraintGraph::from_string(CLASSIC).unwrap();
        let solver = Solver::new();
        let result = solver.solve(&mut graph);

        assert!(result.success);
        assert_solved(&graph);
        assert!(result.statistics.total_steps > 0);
        assert_eq!(result.statistics.current_step, 0);
        // Clues were never touched by the search.
        assert_eq!(graph.cell(0, 0).unwrap().value, 5);
        assert!(graph.cell(0, 0).unwrap().is_fixed);
    }

    #[test]
    fn test_solve_empty_grid() {
        let mut graph = ConstraintGraph::new();
        let solver = Solver::new();
        let result = solver.solve(&mut graph);
        assert!(result.success);
        assert_solved(&graph);
    }

    #[test]
    fn test_solve_is_deterministic() {
        let solver = Solver::new();
        let mut first = ConstraintGraph::from_string(CLASSIC).unwrap();
        let mut second = ConstraintGraph::from_string(CLASSIC).unwrap();

        let a = solver.solve(&mut first);
        let b = solver.solve(&mut second);

        assert_eq!(a.success, b.success);
        assert_eq!(first.values(), second.values());
        assert_eq!(a.statistics.total_steps, b.statistics.total_steps);
    }

    #[test]
    fn test_solve_failure_restores_graph() {
        // Box 0 forces (0, 2) to be empty-domained: row 0 holds 1..=6 via
        // other cells, column 2 holds 7 and 8, and the block holds 9.
        let mut graph = ConstraintGraph::new();
        for (col, value) in [(0, 1), (1, 2), (3, 3), (4, 4), (5, 5), (6, 6)] {
            assert!(graph.set_given(0, col, value));
        }
        assert!(graph.set_given(1, 2, 9));
        assert!(graph.set_given(2, 2, 7));
        assert!(graph.set_given(3, 2, 8));
        assert!(graph
            .vertex(crate::graph::cell_to_id(0, 2))
            .unwrap()
            .domain
            .is_empty());

        let before = graph.snapshot();
        let solver = Solver::new();
        let result = solver.solve(&mut graph);

        assert!(!result.success);
        assert!(result.statistics.conflicts_found > 0);
        // Backtracking unwound every tentative assignment.
        assert_eq!(graph.snapshot(), before);
    }

    #[test]
    fn test_step_trace_shape() {
        let mut graph = ConstraintGraph::from_string(CLASSIC).unwrap();
        let solver = Solver::new();
        let result = solver.solve(&mut graph);

        assert!(!result.steps.is_empty());
        assert_eq!(result.steps[0].action, StepAction::Assign);
        for step in &result.steps {
            assert_eq!(step.domain_sizes.len(), 81);
            assert!(step.vertex_id < 81);
        }
        let assigns = result
            .steps
            .iter()
            .filter(|s| s.action == StepAction::Assign)
            .count();
        let backtracks = result
            .steps
            .iter()
            .filter(|s| s.action == StepAction::Backtrack)
            .count();
        // Every solved cell is one surviving assignment.
        assert_eq!(assigns - backtracks, 51);
        assert_eq!(result.statistics.backtrack_steps, backtracks);
    }

    #[test]
    fn test_select_next_vertex_initial() {
        let graph = ConstraintGraph::new();
        let id = select_next_vertex(&graph).unwrap();
        let vertex = graph.vertex(id).unwrap();
        assert_eq!(vertex.domain.count(), 9);
        assert_eq!(vertex.neighbors.count(), 20);
    }

    #[test]
    fn test_select_next_vertex_prefers_small_domain() {
        let mut graph = ConstraintGraph::from_string(CLASSIC).unwrap();
        let id = select_next_vertex(&graph).unwrap();
        let chosen = graph.vertex(id).unwrap().domain.count();
        let min = graph
            .graph()
            .vertices
            .iter()
            .filter(|v| v.value == 0)
            .map(|v| v.domain.count())
            .min()
            .unwrap();
        assert_eq!(chosen, min);

        // Exhausted grid: no empty vertex left.
        let solver = Solver::new();
        assert!(solver.solve(&mut graph).success);
        assert_eq!(select_next_vertex(&graph), None);
    }

    #[test]
    fn test_is_puzzle_solvable() {
        let solver = Solver::new();

        let mut graph = ConstraintGraph::from_string(CLASSIC).unwrap();
        let before = graph.snapshot();
        assert!(solver.is_puzzle_solvable(&mut graph));
        // Read-only probe: the graph is exactly as it was found.
        assert_eq!(graph.snapshot(), before);

        let mut empty = ConstraintGraph::new();
        assert!(solver.is_puzzle_solvable(&mut empty));
    }

    #[test]
    fn test_unsolvable_fails_fast() {
        let solver = Solver::new();

        // Invalid grid: two 5s in one row, forced through restore.
        let mut graph = ConstraintGraph::new();
        let mut snapshot = graph.snapshot();
        snapshot.cells[0] = (5, true);
        snapshot.cells[4] = (5, true);
        graph.restore(&snapshot);
        assert!(!solver.is_puzzle_solvable(&mut graph));

        // Valid grid with an empty-domained vertex.
        let mut pinched = ConstraintGraph::new();
        for (col, value) in [(0, 1), (1, 2), (3, 3), (4, 4), (5, 5), (6, 6)] {
            assert!(pinched.set_given(0, col, value));
        }
        assert!(pinched.set_given(1, 2, 9));
        assert!(pinched.set_given(2, 2, 7));
        assert!(pinched.set_given(3, 2, 8));
        assert!(!solver.is_puzzle_solvable(&mut pinched));
    }

    #[test]
    fn test_unique_solution() {
        let solver = Solver::new();
        let mut graph = ConstraintGraph::from_string(CLASSIC).unwrap();
        let before = graph.snapshot();

        assert!(solver.has_unique_solution(&mut graph));
        assert_eq!(graph.snapshot(), before);
    }

    #[test]
    fn test_multiple_solutions() {
        let solver = Solver::new();
        let mut empty = ConstraintGraph::new();
        assert!(!solver.has_unique_solution(&mut empty));
        assert_eq!(solver.count_solutions(&mut empty, 2), 2);
        // The probe restored the empty grid.
        assert_eq!(empty.stats().empty_vertices, 81);
    }

    #[test]
    fn test_count_solutions_on_solved_grid() {
        let solver = Solver::new();
        let mut graph = ConstraintGraph::from_string(CLASSIC).unwrap();
        assert!(solver.solve(&mut graph).success);
        assert_eq!(solver.count_solutions(&mut graph, 2), 1);
        assert_eq!(solver.count_solutions(&mut graph, 0), 0);
    }

    #[test]
    fn test_solve_result_serializes() {
        let mut graph = ConstraintGraph::from_string(CLASSIC).unwrap();
        let solver = Solver::new();
        let result = solver.solve(&mut graph);

        let json = serde_json::to_string(&result).unwrap();
        let back: SolveResult = serde_json::from_str(&json).unwrap();
        assert_eq!(back.success, result.success);
        assert_eq!(back.steps, result.steps);
        assert_eq!(back.statistics.total_steps, result.statistics.total_steps);
    }
}
