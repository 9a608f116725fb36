use std::collections::BTreeMap;

use foundation::geo::ScreenPoint;

/// Grid cell address in world-pixel space.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CellKey {
    pub x: i64,
    pub y: i64,
}

/// Uniform screen-space grid over world-pixel positions.
///
/// Items are bucketed by `floor(position / cell_size_px)`. The index is a
/// leaf utility: it knows nothing about pins, only opaque item indices.
///
/// Ordering contract:
/// - `cells()` iterates in ascending `(x, y)` cell order.
/// - Within a cell, items keep insertion order.
#[derive(Debug, Clone, PartialEq)]
pub struct GridIndex {
    cell_size_px: f64,
    cells: BTreeMap<CellKey, Vec<usize>>,
}

impl GridIndex {
    pub fn new(cell_size_px: f64) -> Self {
        Self {
            cell_size_px: cell_size_px.max(f64::MIN_POSITIVE),
            cells: BTreeMap::new(),
        }
    }

    pub fn cell_size_px(&self) -> f64 {
        self.cell_size_px
    }

    pub fn cell_of(&self, position: ScreenPoint) -> CellKey {
        CellKey {
            x: (position.x / self.cell_size_px).floor() as i64,
            y: (position.y / self.cell_size_px).floor() as i64,
        }
    }

    pub fn insert(&mut self, item: usize, position: ScreenPoint) -> CellKey {
        let key = self.cell_of(position);
        self.cells.entry(key).or_default().push(item);
        key
    }

    pub fn len_cells(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Iterates occupied cells in ascending cell-key order.
    pub fn cells(&self) -> impl Iterator<Item = (CellKey, &[usize])> {
        self.cells.iter().map(|(k, v)| (*k, v.as_slice()))
    }
}

#[cfg(test)]
mod tests {
    use super::{CellKey, GridIndex};
    use foundation::geo::ScreenPoint;

    #[test]
    fn items_bucket_by_floor_division() {
        let mut grid = GridIndex::new(40.0);
        grid.insert(0, ScreenPoint::new(5.0, 5.0));
        grid.insert(1, ScreenPoint::new(39.9, 0.0));
        grid.insert(2, ScreenPoint::new(40.0, 0.0));
        grid.insert(3, ScreenPoint::new(-1.0, -1.0));

        let cells: Vec<(CellKey, Vec<usize>)> = grid
            .cells()
            .map(|(k, items)| (k, items.to_vec()))
            .collect();
        assert_eq!(
            cells,
            vec![
                (CellKey { x: -1, y: -1 }, vec![3]),
                (CellKey { x: 0, y: 0 }, vec![0, 1]),
                (CellKey { x: 1, y: 0 }, vec![2]),
            ]
        );
    }

    #[test]
    fn iteration_order_is_independent_of_insertion_order() {
        let mut a = GridIndex::new(10.0);
        a.insert(0, ScreenPoint::new(95.0, 0.0));
        a.insert(1, ScreenPoint::new(5.0, 0.0));

        let mut b = GridIndex::new(10.0);
        b.insert(1, ScreenPoint::new(5.0, 0.0));
        b.insert(0, ScreenPoint::new(95.0, 0.0));

        let ka: Vec<CellKey> = a.cells().map(|(k, _)| k).collect();
        let kb: Vec<CellKey> = b.cells().map(|(k, _)| k).collect();
        assert_eq!(ka, kb);
    }
}
