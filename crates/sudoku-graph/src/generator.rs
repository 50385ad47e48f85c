//! Puzzle generation: randomized complete-grid construction followed by
//! best-effort clue removal validated through the graph solver.

use crate::graph::ConstraintGraph;
use crate::solver::Solver;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Difficulty tier of a generated puzzle. String-valued on the external
/// interface: `facil | medio | dificil | extremo`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Facil,
    Medio,
    Dificil,
    Extremo,
}

/// Removal parameters for one difficulty tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DifficultySettings {
    /// Target number of clues to remove from the complete grid
    pub cells_to_remove: usize,
    /// Random picks spent before the removal loop gives up
    pub max_attempts: usize,
    /// Whether every removal must preserve solution uniqueness
    pub require_unique: bool,
}

impl Difficulty {
    /// Removal settings for this tier. Uniqueness is enforced for the two
    /// hardest tiers only.
    pub fn settings(&self) -> DifficultySettings {
        match self {
            Difficulty::Facil => DifficultySettings {
                cells_to_remove: 35,
                max_attempts: 50,
                require_unique: false,
            },
            Difficulty::Medio => DifficultySettings {
                cells_to_remove: 45,
                max_attempts: 70,
                require_unique: false,
            },
            Difficulty::Dificil => DifficultySettings {
                cells_to_remove: 55,
                max_attempts: 90,
                require_unique: true,
            },
            Difficulty::Extremo => DifficultySettings {
                cells_to_remove: 65,
                max_attempts: 120,
                require_unique: true,
            },
        }
    }

    pub fn all_levels() -> &'static [Difficulty] {
        &[
            Difficulty::Facil,
            Difficulty::Medio,
            Difficulty::Dificil,
            Difficulty::Extremo,
        ]
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Difficulty::Facil => write!(f, "facil"),
            Difficulty::Medio => write!(f, "medio"),
            Difficulty::Dificil => write!(f, "dificil"),
            Difficulty::Extremo => write!(f, "extremo"),
        }
    }
}

/// Error for an unrecognized difficulty name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownDifficulty(pub String);

impl fmt::Display for UnknownDifficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown difficulty level: {:?}", self.0)
    }
}

impl std::error::Error for UnknownDifficulty {}

impl FromStr for Difficulty {
    type Err = UnknownDifficulty;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "facil" => Ok(Difficulty::Facil),
            "medio" => Ok(Difficulty::Medio),
            "dificil" => Ok(Difficulty::Dificil),
            "extremo" => Ok(Difficulty::Extremo),
            other => Err(UnknownDifficulty(other.to_string())),
        }
    }
}

/// Sudoku puzzle generator.
pub struct Generator {
    rng: SimpleRng,
}

impl Default for Generator {
    fn default() -> Self {
        Self::new()
    }
}

impl Generator {
    /// Create a generator seeded from system entropy.
    pub fn new() -> Self {
        Self {
            rng: SimpleRng::new(),
        }
    }

    /// Create a generator with a fixed seed for reproducible output.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: SimpleRng::with_seed(seed),
        }
    }

    /// Build a fully filled valid grid by randomized backtracking over a
    /// plain value array. Works independently of the graph abstraction;
    /// its only job is to seed a complete grid fast.
    pub fn generate_complete(&mut self) -> [[u8; 9]; 9] {
        loop {
            let mut grid = [[0u8; 9]; 9];
            if self.fill_grid(&mut grid) {
                return grid;
            }
        }
    }

    /// Generate a puzzle at the requested difficulty: a complete grid with
    /// clues removed under the tier's settings.
    pub fn generate(&mut self, difficulty: Difficulty) -> [[u8; 9]; 9] {
        let mut grid = self.generate_complete();
        self.remove_cells(&mut grid, difficulty);
        grid
    }

    fn fill_grid(&mut self, grid: &mut [[u8; 9]; 9]) -> bool {
        for row in 0..9 {
            for col in 0..9 {
                if grid[row][col] != 0 {
                    continue;
                }
                let mut values: [u8; 9] = [1, 2, 3, 4, 5, 6, 7, 8, 9];
                self.shuffle(&mut values);

                for &value in &values {
                    if value_fits(grid, row, col, value) {
                        grid[row][col] = value;
                        if self.fill_grid(grid) {
                            return true;
                        }
                        grid[row][col] = 0;
                    }
                }
                return false;
            }
        }
        true
    }

    /// Remove clues one at a time, re-validating solvability (always) and
    /// uniqueness (when the tier requires it) after every removal. Best
    /// effort: the loop stops after `max_attempts` random picks even if
    /// the removal quota was not reached.
    fn remove_cells(&mut self, grid: &mut [[u8; 9]; 9], difficulty: Difficulty) {
        let settings = difficulty.settings();
        let solver = Solver::new();
        let mut remaining = settings.cells_to_remove;

        for attempt in 0..settings.max_attempts {
            if remaining == 0 {
                break;
            }
            let row = self.rng.next_usize(9);
            let col = self.rng.next_usize(9);
            if grid[row][col] == 0 {
                continue;
            }

            let backup = grid[row][col];
            grid[row][col] = 0;

            let mut probe = ConstraintGraph::new();
            probe.load_puzzle(grid);
            let removal_ok = solver.is_puzzle_solvable(&mut probe)
                && (!settings.require_unique || solver.has_unique_solution(&mut probe));

            if removal_ok {
                remaining -= 1;
                log::debug!(
                    "attempt {attempt}: removed ({row}, {col}), {remaining} removals left"
                );
            } else {
                grid[row][col] = backup;
                log::debug!("attempt {attempt}: restored ({row}, {col})");
            }
        }

        if remaining > 0 {
            log::debug!(
                "removal quota missed by {remaining} after {} attempts ({difficulty})",
                settings.max_attempts
            );
        }
    }

    fn shuffle<T>(&mut self, slice: &mut [T]) {
        for i in (1..slice.len()).rev() {
            let j = self.rng.next_usize(i + 1);
            slice.swap(i, j);
        }
    }
}

/// Row/column/block legality check on a plain value array.
fn value_fits(grid: &[[u8; 9]; 9], row: usize, col: usize, value: u8) -> bool {
    for c in 0..9 {
        if grid[row][c] == value {
            return false;
        }
    }
    for r in 0..9 {
        if grid[r][col] == value {
            return false;
        }
    }
    let (block_row, block_col) = ((row / 3) * 3, (col / 3) * 3);
    for r in block_row..block_row + 3 {
        for c in block_col..block_col + 3 {
            if grid[r][c] == value {
                return false;
            }
        }
    }
    true
}

/// A fixed demonstration puzzle for each difficulty tier.
pub fn predefined_puzzle(difficulty: Difficulty) -> [[u8; 9]; 9] {
    match difficulty {
        Difficulty::Facil => [
            [5, 3, 0, 0, 7, 0, 0, 0, 0],
            [6, 0, 0, 1, 9, 5, 0, 0, 0],
            [0, 9, 8, 0, 0, 0, 0, 6, 0],
            [8, 0, 0, 0, 6, 0, 0, 0, 3],
            [4, 0, 0, 8, 0, 3, 0, 0, 1],
            [7, 0, 0, 0, 2, 0, 0, 0, 6],
            [0, 6, 0, 0, 0, 0, 2, 8, 0],
            [0, 0, 0, 4, 1, 9, 0, 0, 5],
            [0, 0, 0, 0, 8, 0, 0, 7, 9],
        ],
        Difficulty::Medio => [
            [0, 0, 0, 6, 0, 0, 4, 0, 0],
            [7, 0, 0, 0, 0, 3, 6, 0, 0],
            [0, 0, 0, 0, 9, 1, 0, 8, 0],
            [0, 0, 0, 0, 0, 0, 0, 0, 0],
            [0, 5, 0, 1, 8, 0, 0, 0, 3],
            [0, 0, 0, 3, 0, 6, 0, 4, 5],
            [0, 4, 0, 2, 0, 0, 0, 6, 0],
            [9, 0, 3, 0, 0, 0, 0, 0, 0],
            [0, 2, 0, 0, 0, 0, 1, 0, 0],
        ],
        Difficulty::Dificil => [
            [0, 0, 0, 0, 0, 6, 0, 0, 0],
            [0, 5, 9, 0, 0, 0, 0, 0, 8],
            [2, 0, 0, 0, 0, 8, 0, 0, 0],
            [0, 4, 5, 0, 0, 0, 0, 0, 0],
            [0, 0, 3, 0, 0, 0, 0, 0, 0],
            [0, 0, 6, 0, 0, 3, 0, 5, 4],
            [0, 0, 0, 3, 2, 5, 0, 0, 6],
            [0, 0, 0, 0, 0, 0, 0, 0, 0],
            [0, 0, 0, 0, 0, 0, 0, 0, 0],
        ],
        Difficulty::Extremo => [
            [0, 0, 0, 0, 0, 0, 0, 1, 0],
            [4, 0, 0, 0, 0, 0, 0, 0, 0],
            [0, 0, 0, 0, 0, 0, 6, 0, 2],
            [0, 0, 0, 0, 3, 0, 0, 0, 0],
            [5, 0, 0, 0, 0, 0, 0, 0, 0],
            [0, 0, 0, 0, 0, 0, 0, 7, 0],
            [0, 0, 6, 0, 0, 0, 0, 0, 0],
            [1, 0, 0, 0, 0, 0, 0, 0, 8],
            [0, 0, 0, 0, 2, 0, 0, 0, 0],
        ],
    }
}

/// Small PCG-style PRNG, seeded from `getrandom` so the generator also
/// works on wasm targets. Not cryptographic; shuffle quality is all the
/// generator needs.
struct SimpleRng {
    state: u64,
}

impl SimpleRng {
    fn new() -> Self {
        let mut seed_bytes = [0u8; 8];
        if getrandom::getrandom(&mut seed_bytes).is_err() {
            // Entropy source unavailable; fall back to a process-local counter.
            static COUNTER: std::sync::atomic::AtomicU64 = std::sync::atomic::AtomicU64::new(1);
            let counter = COUNTER.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
            seed_bytes = counter.to_le_bytes();
        }
        Self::with_seed(u64::from_le_bytes(seed_bytes))
    }

    fn with_seed(seed: u64) -> Self {
        Self {
            state: seed.wrapping_add(1),
        }
    }

    fn next_u64(&mut self) -> u64 {
        self.state = self
            .state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        let xorshifted = (((self.state >> 18) ^ self.state) >> 27) as u32;
        let rot = (self.state >> 59) as u32;
        u64::from(xorshifted.rotate_right(rot))
    }

    fn next_usize(&mut self, bound: usize) -> usize {
        (self.next_u64() as usize) % bound
    }
}
