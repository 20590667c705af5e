use rand::Rng;
use serde::{Deserialize, Serialize};

/// State of a single grid cell.
///
/// Each model gives the states its own meaning: for the droplet model
/// `Empty` is sand, `Occupied` is rock and `Active` is water; for the fire
/// model they are tree, mud and fire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Cell {
    #[default]
    Empty,
    Occupied,
    Active,
}

/// Row/column coordinate, row 0 at the top
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Position {
    pub row: usize,
    pub col: usize,
}

impl Position {
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }
}

/// Grid dimensions for one sweep configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridSize {
    pub height: usize,
    pub width: usize,
}

impl GridSize {
    pub fn new(height: usize, width: usize) -> Self {
        Self { height, width }
    }

    pub fn square(n: usize) -> Self {
        Self::new(n, n)
    }
}

impl std::fmt::Display for GridSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.height, self.width)
    }
}

/// Occupancy grid owned by a single trial
#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
    pub height: usize,
    pub width: usize,
    cells: Vec<Cell>,
}

impl Grid {
    /// Grid with every cell in the same state
    #[cfg(test)]
    pub fn filled(height: usize, width: usize, cell: Cell) -> Self {
        Self {
            height,
            width,
            cells: vec![cell; height * width],
        }
    }

    /// Draw an i.i.d. Bernoulli occupancy field.
    ///
    /// A cell is `Occupied` when a uniform draw in `[0, 1)` falls below
    /// `density`, so `0.0` never occupies and `1.0` always does. Densities
    /// outside `[0, 1]` are clamped.
    pub fn generate<R: Rng + ?Sized>(height: usize, width: usize, density: f64, rng: &mut R) -> Self {
        let density = density.clamp(0.0, 1.0);
        let cells = (0..height * width)
            .map(|_| {
                if rng.gen::<f64>() < density {
                    Cell::Occupied
                } else {
                    Cell::Empty
                }
            })
            .collect();
        Self {
            height,
            width,
            cells,
        }
    }

    pub fn size(&self) -> GridSize {
        GridSize::new(self.height, self.width)
    }

    pub fn contains(&self, pos: Position) -> bool {
        pos.row < self.height && pos.col < self.width
    }

    fn index(&self, pos: Position) -> usize {
        pos.row * self.width + pos.col
    }

    /// Cell at `pos`, `None` outside the grid
    pub fn get(&self, pos: Position) -> Option<Cell> {
        if self.contains(pos) {
            Some(self.cells[self.index(pos)])
        } else {
            None
        }
    }

    pub fn is_empty_at(&self, pos: Position) -> bool {
        self.get(pos) == Some(Cell::Empty)
    }

    /// Overwrite the cell at `pos`. Positions outside the grid are ignored.
    pub fn set(&mut self, pos: Position, cell: Cell) {
        if self.contains(pos) {
            let idx = self.index(pos);
            self.cells[idx] = cell;
        }
    }

    /// Apply a (row, column) displacement, returning `None` when the result
    /// leaves the grid
    pub fn offset(&self, pos: Position, drow: isize, dcol: isize) -> Option<Position> {
        let row = pos.row.checked_add_signed(drow)?;
        let col = pos.col.checked_add_signed(dcol)?;
        let target = Position::new(row, col);
        self.contains(target).then_some(target)
    }

    pub fn is_last_row(&self, pos: Position) -> bool {
        pos.row + 1 == self.height
    }

    pub fn is_last_col(&self, pos: Position) -> bool {
        pos.col + 1 == self.width
    }

    pub fn count(&self, cell: Cell) -> usize {
        self.cells.iter().filter(|&&c| c == cell).count()
    }

    /// All empty positions in row-major order
    pub fn empty_positions(&self) -> Vec<Position> {
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, &c)| c == Cell::Empty)
            .map(|(i, _)| Position::new(i / self.width, i % self.width))
            .collect()
    }

    /// Row-major view of the cells
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_generate_zero_density_is_all_empty() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let grid = Grid::generate(15, 12, 0.0, &mut rng);
        assert_eq!(grid.count(Cell::Empty), 15 * 12);
    }

    #[test]
    fn test_generate_full_density_is_all_occupied() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let grid = Grid::generate(10, 10, 1.0, &mut rng);
        assert_eq!(grid.count(Cell::Occupied), 100);
    }

    #[test]
    fn test_generate_clamps_out_of_range_density() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        assert_eq!(Grid::generate(5, 5, 1.7, &mut rng).count(Cell::Occupied), 25);
        assert_eq!(Grid::generate(5, 5, -0.2, &mut rng).count(Cell::Empty), 25);
    }

    #[test]
    fn test_generate_density_is_roughly_respected() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let grid = Grid::generate(100, 100, 0.3, &mut rng);
        let fraction = grid.count(Cell::Occupied) as f64 / 10_000.0;
        assert!((fraction - 0.3).abs() < 0.03, "fraction was {fraction}");
    }

    #[test]
    fn test_generate_is_deterministic_for_seed() {
        let a = Grid::generate(20, 20, 0.5, &mut ChaCha8Rng::seed_from_u64(99));
        let b = Grid::generate(20, 20, 0.5, &mut ChaCha8Rng::seed_from_u64(99));
        assert_eq!(a, b);
    }

    #[test]
    fn test_offset_rejects_out_of_bounds() {
        let grid = Grid::filled(4, 3, Cell::Empty);
        let origin = Position::new(0, 0);
        assert_eq!(grid.offset(origin, -1, 0), None);
        assert_eq!(grid.offset(origin, 0, -1), None);
        assert_eq!(grid.offset(Position::new(3, 2), 1, 0), None);
        assert_eq!(grid.offset(Position::new(3, 2), 0, 1), None);
        assert_eq!(grid.offset(origin, 1, 1), Some(Position::new(1, 1)));
    }

    #[test]
    fn test_get_and_set_ignore_outside_positions() {
        let mut grid = Grid::filled(2, 2, Cell::Empty);
        grid.set(Position::new(5, 5), Cell::Active);
        assert_eq!(grid.get(Position::new(5, 5)), None);
        assert_eq!(grid.count(Cell::Active), 0);

        grid.set(Position::new(1, 0), Cell::Active);
        assert_eq!(grid.get(Position::new(1, 0)), Some(Cell::Active));
    }

    #[test]
    fn test_empty_positions_row_major() {
        let mut grid = Grid::filled(2, 3, Cell::Occupied);
        grid.set(Position::new(1, 2), Cell::Empty);
        grid.set(Position::new(0, 1), Cell::Empty);
        assert_eq!(
            grid.empty_positions(),
            vec![Position::new(0, 1), Position::new(1, 2)]
        );
    }
}
