// Dense 2D grid used for food tracking on the board
//
// Cells are stored row-major in a flat Vec. Indexing is by `Position`;
// callers are expected to bounds-check with `Board::is_in_bounds` first.

use std::ops::{Index, IndexMut};

use crate::simulator::Position;

/// A width x height grid of `T`, row-major, fixed size after construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Grid<T> {
    width: u32,
    cells: Vec<T>,
}

impl<T: Clone + Default> Grid<T> {
    /// Creates a grid with every cell set to `T::default()`.
    pub fn new(width: u32, height: u32) -> Self {
        Grid {
            width,
            cells: vec![T::default(); (width * height) as usize],
        }
    }
}

impl<T> Grid<T> {
    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.cells.len() as u32 / self.width
    }

    pub fn size(&self) -> usize {
        self.cells.len()
    }

    fn offset(&self, position: Position) -> usize {
        debug_assert!(
            position.x >= 0
                && position.y >= 0
                && (position.x as u32) < self.width
                && (position.y as u32) < self.height(),
            "grid access out of bounds: {:?}",
            position
        );
        position.y as usize * self.width as usize + position.x as usize
    }
}

impl<T> Index<Position> for Grid<T> {
    type Output = T;

    /// Panics if `position` is outside the grid.
    fn index(&self, position: Position) -> &T {
        &self.cells[self.offset(position)]
    }
}

impl<T> IndexMut<Position> for Grid<T> {
    fn index_mut(&mut self, position: Position) -> &mut T {
        let offset = self.offset(position);
        &mut self.cells[offset]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(x: i32, y: i32) -> Position {
        Position { x, y }
    }

    #[test]
    fn test_new_grid_is_default_initialized() {
        let grid: Grid<bool> = Grid::new(10, 10);

        assert_eq!(grid.width(), 10);
        assert_eq!(grid.height(), 10);
        assert_eq!(grid.size(), 100);
        for y in 0..10 {
            for x in 0..10 {
                assert!(!grid[at(x, y)]);
            }
        }
    }

    #[test]
    fn test_index_mut_round_trips() {
        let mut grid: Grid<bool> = Grid::new(10, 10);

        grid[at(3, 4)] = true;
        assert!(grid[at(3, 4)]);

        grid[at(3, 4)] = false;
        assert!(!grid[at(3, 4)]);
    }

    #[test]
    fn test_non_square_dimensions() {
        let grid: Grid<u8> = Grid::new(8, 5);

        assert_eq!(grid.width(), 8);
        assert_eq!(grid.height(), 5);
        assert_eq!(grid.size(), 40);
    }

    #[test]
    fn test_equality_compares_contents_and_shape() {
        let g1: Grid<bool> = Grid::new(10, 10);
        let g2: Grid<bool> = Grid::new(10, 10);
        let g3: Grid<bool> = Grid::new(8, 5);

        let mut g4: Grid<bool> = Grid::new(10, 10);
        g4[at(0, 0)] = true;

        let mut g5: Grid<bool> = Grid::new(10, 10);
        g5[at(0, 0)] = true;

        assert_eq!(g1, g2);
        assert_ne!(g1, g3);
        assert_ne!(g1, g4);
        assert_eq!(g4, g5);
    }
}
