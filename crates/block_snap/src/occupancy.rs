use bevy::prelude::*;

/// Which cells of the board are covered by a placed shape.
///
/// Written by the placement pass only. Cells are never released.
#[derive(Resource, Debug, Clone, PartialEq, Eq)]
pub struct OccupancyMap {
    columns: usize,
    rows: usize,
    occupied: Vec<bool>,
}

impl OccupancyMap {
    pub fn new(columns: usize, rows: usize) -> Self {
        Self {
            columns,
            rows,
            occupied: vec![false; columns * rows],
        }
    }

    pub const fn columns(&self) -> usize {
        self.columns
    }

    pub const fn rows(&self) -> usize {
        self.rows
    }

    fn index(&self, cell: IVec2) -> Option<usize> {
        if cell.x < 0 || cell.y < 0 {
            return None;
        }
        let (col, row) = (cell.x as usize, cell.y as usize);
        (col < self.columns && row < self.rows).then_some(row * self.columns + col)
    }

    /// Out-of-bounds cells read as not occupied.
    pub fn is_occupied(&self, cell: IVec2) -> bool {
        self.index(cell)
            .and_then(|index| self.occupied.get(index))
            .is_some_and(|taken| *taken)
    }

    /// True when every cell is inside the map and none is taken yet.
    pub fn is_free(&self, cells: &[IVec2]) -> bool {
        cells
            .iter()
            .all(|&cell| {
                self.index(cell)
                    .and_then(|index| self.occupied.get(index))
                    .is_some_and(|taken| !taken)
            })
    }

    /// Marks the cells as occupied. Out-of-bounds cells are ignored.
    pub fn mark(&mut self, cells: &[IVec2]) {
        for &cell in cells {
            if let Some(taken) = self.index(cell).and_then(|index| self.occupied.get_mut(index)) {
                *taken = true;
            }
        }
    }

    pub fn occupied_count(&self) -> usize {
        self.occupied.iter().filter(|taken| **taken).count()
    }
}
