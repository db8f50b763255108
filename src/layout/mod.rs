//! Batch grid layout.
//!
//! N batches share one terrain footprint and are tiled row-major on a square
//! grid of side `ceil(sqrt(N))`. Index, grid cell and world offset map onto
//! each other deterministically for a fixed batch count.

pub mod palette;

pub use palette::Rgba;

/// Keyboard-style neighbour direction on the batch grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

#[derive(Debug, Clone)]
pub struct BatchLayout {
    sim_batches: usize,
    side: usize,
    cell_x: f32,
    cell_y: f32,
    collapse: bool,
    colors: Vec<Rgba>,
}

impl BatchLayout {
    /// `sim_batches` is clamped to at least 1.
    pub fn new(sim_batches: usize, size_x: f32, size_y: f32, spacing: f32) -> Self {
        let sim_batches = sim_batches.max(1);
        Self {
            sim_batches,
            side: grid_side(sim_batches),
            cell_x: size_x + spacing,
            cell_y: size_y + spacing,
            collapse: false,
            colors: palette::diverging_palette(sim_batches),
        }
    }

    /// Overlay every batch at the origin instead of tiling.
    pub fn with_collapse(mut self, collapse: bool) -> Self {
        self.collapse = collapse;
        self
    }

    pub fn sim_batches(&self) -> usize {
        self.sim_batches
    }

    pub fn side(&self) -> usize {
        self.side
    }

    pub fn is_collapsed(&self) -> bool {
        self.collapse
    }

    pub fn row_col(&self, index: usize) -> Option<(usize, usize)> {
        if index >= self.sim_batches {
            return None;
        }
        Some((index / self.side, index % self.side))
    }

    /// Inverse of [`row_col`](Self::row_col). `None` for any cell outside the
    /// populated part of the grid, including negative coordinates.
    pub fn index_from_row_col(&self, row: isize, col: isize) -> Option<usize> {
        if row < 0 || col < 0 {
            return None;
        }
        let (row, col) = (row as usize, col as usize);
        if row >= self.side || col >= self.side {
            return None;
        }
        let index = row * self.side + col;
        (index < self.sim_batches).then_some(index)
    }

    pub fn neighbor(&self, index: usize, dir: Direction) -> Option<usize> {
        let (row, col) = self.row_col(index)?;
        let (row, col) = (row as isize, col as isize);
        let (r, c) = match dir {
            Direction::Up => (row - 1, col),
            Direction::Down => (row + 1, col),
            Direction::Left => (row, col - 1),
            Direction::Right => (row, col + 1),
        };
        self.index_from_row_col(r, c)
    }

    /// World-space translation of batch `index`. Out-of-range indices map to the origin.
    pub fn offset(&self, index: usize) -> [f32; 3] {
        if self.collapse {
            return [0.0; 3];
        }
        match self.row_col(index) {
            Some((row, col)) => [col as f32 * self.cell_x, row as f32 * self.cell_y, 0.0],
            None => [0.0; 3],
        }
    }

    /// Width and depth covered by all populated cells.
    pub fn extent(&self) -> [f32; 2] {
        if self.collapse {
            return [self.cell_x, self.cell_y];
        }
        let rows = self.sim_batches.div_ceil(self.side);
        let cols = self.side.min(self.sim_batches);
        [cols as f32 * self.cell_x, rows as f32 * self.cell_y]
    }

    pub fn color(&self, index: usize) -> Option<Rgba> {
        self.colors.get(index).copied()
    }

    pub fn colors(&self) -> &[Rgba] {
        &self.colors
    }
}

fn grid_side(n: usize) -> usize {
    let mut side = (n as f64).sqrt().ceil() as usize;
    // guard against float rounding on perfect squares
    while side * side < n {
        side += 1;
    }
    while side > 1 && (side - 1) * (side - 1) >= n {
        side -= 1;
    }
    side.max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grid_side_is_ceil_sqrt() {
        assert_eq!(grid_side(1), 1);
        assert_eq!(grid_side(2), 2);
        assert_eq!(grid_side(4), 2);
        assert_eq!(grid_side(5), 3);
        assert_eq!(grid_side(9), 3);
        assert_eq!(grid_side(10), 4);
    }

    #[test]
    fn two_batches_side_by_side() {
        let layout = BatchLayout::new(2, 10.0, 10.0, 0.5);
        assert_eq!(layout.offset(0), [0.0, 0.0, 0.0]);
        assert_eq!(layout.offset(1), [10.5, 0.0, 0.0]);
    }

    #[test]
    fn row_col_round_trip_for_every_batch() {
        for n in 1..=50 {
            let layout = BatchLayout::new(n, 1.0, 1.0, 0.0);
            for i in 0..n {
                let (r, c) = layout.row_col(i).unwrap();
                assert_eq!(layout.index_from_row_col(r as isize, c as isize), Some(i));
            }
        }
    }

    #[test]
    fn unpopulated_cells_are_invalid() {
        // 5 batches on a 3x3 grid: cells 5..9 are empty
        let layout = BatchLayout::new(5, 1.0, 1.0, 0.0);
        assert_eq!(layout.index_from_row_col(1, 2), None);
        assert_eq!(layout.index_from_row_col(2, 0), None);
        assert_eq!(layout.index_from_row_col(-1, 0), None);
        assert_eq!(layout.index_from_row_col(0, 3), None);
        assert_eq!(layout.row_col(5), None);
    }

    #[test]
    fn neighbours_stop_at_populated_edge() {
        let layout = BatchLayout::new(5, 1.0, 1.0, 0.0);
        assert_eq!(layout.neighbor(0, Direction::Right), Some(1));
        assert_eq!(layout.neighbor(0, Direction::Up), None);
        assert_eq!(layout.neighbor(4, Direction::Right), None);
        assert_eq!(layout.neighbor(2, Direction::Down), None);
        assert_eq!(layout.neighbor(1, Direction::Down), Some(4));
    }

    #[test]
    fn collapse_overlays_batches() {
        let layout = BatchLayout::new(4, 10.0, 10.0, 0.5).with_collapse(true);
        assert_eq!(layout.offset(3), [0.0; 3]);
        assert_eq!(layout.row_col(3), Some((1, 1)));
    }

    #[test]
    fn one_color_per_batch() {
        let layout = BatchLayout::new(6, 1.0, 1.0, 0.0);
        assert_eq!(layout.colors().len(), 6);
        assert!(layout.color(5).is_some());
        assert!(layout.color(6).is_none());
    }

    #[test]
    fn zero_batches_is_treated_as_one() {
        let layout = BatchLayout::new(0, 1.0, 1.0, 0.0);
        assert_eq!(layout.sim_batches(), 1);
        assert_eq!(layout.row_col(0), Some((0, 0)));
    }
}
