use serde::Serialize;
use std::ops::{Index, IndexMut};

/// Dense 2D grid indexed `[x][z]`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Grid<T> {
    x_cells: usize,
    z_cells: usize,
    cells: Vec<T>,
}

impl<T: Clone> Grid<T> {
    pub fn new(x_cells: usize, z_cells: usize, fill: T) -> Self {
        Self {
            x_cells,
            z_cells,
            cells: vec![fill; x_cells * z_cells],
        }
    }

    /// Values along x for a fixed z
    pub fn row(&self, k: usize) -> Vec<T> {
        (0..self.x_cells).map(|i| self[(i, k)].clone()).collect()
    }

    pub fn set_row(&mut self, k: usize, values: &[T]) {
        for (i, v) in values.iter().enumerate().take(self.x_cells) {
            self[(i, k)] = v.clone();
        }
    }

    /// Values along z for a fixed x
    pub fn column(&self, i: usize) -> Vec<T> {
        self.cells[i * self.z_cells..(i + 1) * self.z_cells].to_vec()
    }

    pub fn set_column(&mut self, i: usize, values: &[T]) {
        for (k, v) in values.iter().enumerate().take(self.z_cells) {
            self[(i, k)] = v.clone();
        }
    }

    /// Nested `[x][z]` vectors, the layout mesh builders expect
    pub fn to_nested(&self) -> Vec<Vec<T>> {
        (0..self.x_cells).map(|i| self.column(i)).collect()
    }
}

impl<T> Grid<T> {
    pub fn x_cells(&self) -> usize {
        self.x_cells
    }

    pub fn z_cells(&self) -> usize {
        self.z_cells
    }

    pub fn get(&self, i: usize, k: usize) -> Option<&T> {
        if i < self.x_cells && k < self.z_cells {
            self.cells.get(i * self.z_cells + k)
        } else {
            None
        }
    }

    pub fn get_mut(&mut self, i: usize, k: usize) -> Option<&mut T> {
        if i < self.x_cells && k < self.z_cells {
            self.cells.get_mut(i * self.z_cells + k)
        } else {
            None
        }
    }

    /// Cells with their (x, z) indices
    pub fn iter(&self) -> impl Iterator<Item = ((usize, usize), &T)> {
        let z_cells = self.z_cells;
        self.cells
            .iter()
            .enumerate()
            .map(move |(n, v)| ((n / z_cells, n % z_cells), v))
    }

    pub fn values(&self) -> impl Iterator<Item = &T> {
        self.cells.iter()
    }

    pub fn map<U, F: FnMut(&T) -> U>(&self, f: F) -> Grid<U> {
        Grid {
            x_cells: self.x_cells,
            z_cells: self.z_cells,
            cells: self.cells.iter().map(f).collect(),
        }
    }
}

impl<T> Index<(usize, usize)> for Grid<T> {
    type Output = T;

    fn index(&self, (i, k): (usize, usize)) -> &T {
        &self.cells[i * self.z_cells + k]
    }
}

impl<T> IndexMut<(usize, usize)> for Grid<T> {
    fn index_mut(&mut self, (i, k): (usize, usize)) -> &mut T {
        &mut self.cells[i * self.z_cells + k]
    }
}

/// Nearest cell index at or below `position * res`, clamped to the grid
pub fn truncate_to_cell(position: f64, res: usize, cells: usize) -> usize {
    let scaled = (position * res as f64 + 1e-9).floor();
    if scaled <= 0.0 {
        0
    } else {
        (scaled as usize).min(cells.saturating_sub(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_layout() {
        let mut grid = Grid::new(3, 2, 0);
        grid[(2, 1)] = 7;
        assert_eq!(grid.get(2, 1), Some(&7));
        assert_eq!(grid.get(3, 0), None);
        assert_eq!(grid.column(2), vec![0, 7]);
        assert_eq!(grid.row(1), vec![0, 0, 7]);
    }

    #[test]
    fn test_set_row_and_column() {
        let mut grid = Grid::new(2, 3, 0);
        grid.set_row(0, &[1, 2]);
        grid.set_column(1, &[5, 6, 7]);
        assert_eq!(grid.to_nested(), vec![vec![1, 0, 0], vec![5, 6, 7]]);
    }

    #[test]
    fn test_iter_indices() {
        let grid = Grid::new(2, 2, 1);
        let idx: Vec<(usize, usize)> = grid.iter().map(|(ik, _)| ik).collect();
        assert_eq!(idx, vec![(0, 0), (0, 1), (1, 0), (1, 1)]);
    }

    #[test]
    fn test_truncate_to_cell() {
        assert_eq!(truncate_to_cell(0.0, 10, 11), 0);
        assert_eq!(truncate_to_cell(0.37, 10, 11), 3);
        assert_eq!(truncate_to_cell(0.7, 10, 11), 7);
        assert_eq!(truncate_to_cell(1.0, 10, 11), 10);
        assert_eq!(truncate_to_cell(1.5, 10, 11), 10);
        assert_eq!(truncate_to_cell(-0.2, 10, 11), 0);
    }
}
