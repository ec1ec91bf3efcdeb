use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::models::CellStatus;

/// A generated cell before it is persisted
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct BoardCell {
    pub x: i32,
    pub y: i32,
    pub is_mine: bool,
    /// Only meaningful when `is_mine` is false
    pub neighbor_mine_count: i32,
    pub status: CellStatus,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Board {
    pub rows: i32,
    pub columns: i32,
    pub mine_density: f64,
    /// Row-major: the cell at (x, y) lives at index `y * columns + x`
    pub cells: Vec<BoardCell>,
}

impl Board {
    #[cfg(test)]
    pub fn cell(&self, x: i32, y: i32) -> Option<&BoardCell> {
        if x < 0 || y < 0 || x >= self.columns || y >= self.rows {
            return None;
        }
        self.cells.get((y * self.columns + x) as usize)
    }

    pub fn mine_count(&self) -> usize {
        self.cells.iter().filter(|cell| cell.is_mine).count()
    }
}

pub struct BoardGenerator;

impl BoardGenerator {
    /// Number of mines placed for the given dimensions and density
    pub fn mine_count(rows: i32, columns: i32, mine_density: f64) -> usize {
        let total = (rows.max(0) as usize) * (columns.max(0) as usize);
        let mines = (total as f64 * mine_density).floor();
        if mines <= 0.0 {
            0
        } else {
            (mines as usize).min(total)
        }
    }

    /// Generate a fresh board using the thread-local RNG
    pub fn generate(rows: i32, columns: i32, mine_density: f64) -> Board {
        Self::generate_with_rng(rows, columns, mine_density, &mut rand::rng())
    }

    pub fn generate_with_rng(
        rows: i32,
        columns: i32,
        mine_density: f64,
        rng: &mut impl Rng,
    ) -> Board {
        let rows = rows.max(0);
        let columns = columns.max(0);
        let total_cells = (rows * columns) as usize;
        let mine_count = Self::mine_count(rows, columns, mine_density);

        let mut cells = Vec::with_capacity(total_cells);
        for y in 0..rows {
            for x in 0..columns {
                cells.push(BoardCell {
                    x,
                    y,
                    is_mine: false,
                    neighbor_mine_count: 0,
                    status: CellStatus::Hidden,
                });
            }
        }

        for position in Self::mine_positions(total_cells, mine_count, rng) {
            cells[position].is_mine = true;
        }

        // A fully mined board has no counts to compute
        if mine_count < total_cells {
            Self::fill_neighbor_counts(&mut cells, rows, columns);
        }

        Board {
            rows,
            columns,
            mine_density,
            cells,
        }
    }

    /// Pick `count` distinct indices out of `0..total` without replacement.
    /// Partial Fisher-Yates: each pick is drawn from the candidates not yet taken.
    fn mine_positions(total: usize, count: usize, rng: &mut impl Rng) -> Vec<usize> {
        let mut candidates: Vec<usize> = (0..total).collect();
        for i in 0..count {
            let pick = rng.random_range(i..total);
            candidates.swap(i, pick);
        }
        candidates.truncate(count);
        candidates
    }

    fn fill_neighbor_counts(cells: &mut [BoardCell], rows: i32, columns: i32) {
        for index in 0..cells.len() {
            if cells[index].is_mine {
                continue;
            }
            let (x, y) = (cells[index].x, cells[index].y);
            let mut count = 0;
            for dy in -1..=1 {
                for dx in -1..=1 {
                    if dx == 0 && dy == 0 {
                        continue;
                    }
                    let (nx, ny) = (x + dx, y + dy);
                    if nx < 0 || ny < 0 || nx >= columns || ny >= rows {
                        continue;
                    }
                    if cells[(ny * columns + nx) as usize].is_mine {
                        count += 1;
                    }
                }
            }
            cells[index].neighbor_mine_count = count;
        }
    }
}
