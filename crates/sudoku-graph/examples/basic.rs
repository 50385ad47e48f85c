//! Basic example of driving the constraint-graph engine

use sudoku_graph::{ConstraintGraph, Difficulty, Generator, Solver};

fn main() {
    env_logger::init();

    // Generate a puzzle
    println!("Generating a dificil puzzle...\n");
    let mut generator = Generator::new();
    let puzzle = generator.generate(Difficulty::Dificil);

    let mut graph = ConstraintGraph::new();
    graph.load_puzzle(&puzzle);
    println!("Generated puzzle:");
    println!("{graph}");

    // Show some graph stats
    let stats = graph.stats();
    println!("Vertices: {}", stats.total_vertices);
    println!("Edges: {}", stats.total_edges);
    println!("Given cells: {}", stats.filled_vertices);
    println!("Fill: {}%\n", stats.completion_percentage);

    // Solve it
    println!("Solving...\n");
    let solver = Solver::new();
    let result = solver.solve(&mut graph);
    if result.success {
        println!("Solution:");
        println!("{graph}");
        println!("Search steps: {}", result.statistics.total_steps);
        println!("Backtracks: {}", result.statistics.backtrack_steps);
        println!("Conflicts: {}", result.statistics.conflicts_found);
        println!("Elapsed: {:.2} ms", result.statistics.time_elapsed_ms);
        println!("Trace length: {}\n", result.steps.len());
    } else {
        println!("No solution found (this shouldn't happen for a generated puzzle!)");
    }

    // Parse a puzzle from a string
    println!("--- Parsing a puzzle from string ---\n");
    let puzzle_string =
        "530070000600195000098000060800060003400803001700020006060000280000419005000080079";
    if let Some(mut parsed) = ConstraintGraph::from_string(puzzle_string) {
        println!("Parsed puzzle:");
        println!("{parsed}");

        // Check uniqueness
        let solutions = solver.count_solutions(&mut parsed, 2);
        println!("Number of solutions (up to 2): {solutions}");
    }
}
