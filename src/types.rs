//! Core types for the delivery grid.
//!
//! Defines grid cells and bounds, the closed action set, and the
//! relative-target direction used by the discretized learning state.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A cell on the discrete grid, addressed as (row, col).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Cell {
    pub row: usize,
    pub col: usize,
}

impl Cell {
    /// Creates a new cell.
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }

    /// Returns the cell displaced by `(dr, dc)`, or `None` when the result
    /// would have a negative coordinate.
    ///
    /// Displacements past the far grid edge are representable; callers
    /// bounds-check with [`GridSize::contains`].
    pub fn offset(self, dr: i64, dc: i64) -> Option<Cell> {
        let row = self.row as i64 + dr;
        let col = self.col as i64 + dc;
        if row < 0 || col < 0 {
            None
        } else {
            Some(Cell::new(row as usize, col as usize))
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

/// Dimensions of the grid: `rows × cols`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridSize {
    pub rows: usize,
    pub cols: usize,
}

impl GridSize {
    /// Creates new grid dimensions.
    pub fn new(rows: usize, cols: usize) -> Self {
        Self { rows, cols }
    }

    /// Returns true if `cell` lies within the grid.
    pub fn contains(&self, cell: Cell) -> bool {
        cell.row < self.rows && cell.col < self.cols
    }
}

impl fmt::Display for GridSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.rows, self.cols)
    }
}

/// An action a drone can take on one tick.
///
/// Index values are part of the persisted Q-table layout and must stay
/// stable: 0=up, 1=down, 2=left, 3=right, 4=skip, 5=circumnavigate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Up,
    Down,
    Left,
    Right,
    Skip,
    Circumnavigate,
}

impl Action {
    /// Number of actions.
    pub const COUNT: usize = 6;

    /// Returns all actions in index order.
    pub fn all() -> [Action; Self::COUNT] {
        [
            Action::Up,
            Action::Down,
            Action::Left,
            Action::Right,
            Action::Skip,
            Action::Circumnavigate,
        ]
    }

    /// Returns the stable index of this action.
    pub fn index(self) -> usize {
        match self {
            Action::Up => 0,
            Action::Down => 1,
            Action::Left => 2,
            Action::Right => 3,
            Action::Skip => 4,
            Action::Circumnavigate => 5,
        }
    }

    /// Decodes an action from its index, or `None` when out of range.
    pub fn from_index(index: usize) -> Option<Action> {
        Action::all().get(index).copied()
    }

    /// Returns a human-readable name for this action.
    pub fn name(self) -> &'static str {
        match self {
            Action::Up => "up",
            Action::Down => "down",
            Action::Left => "left",
            Action::Right => "right",
            Action::Skip => "skip",
            Action::Circumnavigate => "circumnavigate",
        }
    }

    /// Name lookup for a raw action value, with a stable fallback label
    /// for out-of-range integers.
    pub fn name_of(index: usize) -> &'static str {
        match Action::from_index(index) {
            Some(action) => action.name(),
            None => "unknown",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The dominant cardinal direction toward a drone's current goal cell,
/// or [`RelativeTarget::None`] when the drone is already on the goal.
///
/// Index values are part of the persisted Q-table layout: 0=up, 1=down,
/// 2=left, 3=right, 4=none (mirroring the first five action indices).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelativeTarget {
    Up,
    Down,
    Left,
    Right,
    None,
}

impl RelativeTarget {
    /// Number of relative-target values.
    pub const COUNT: usize = 5;

    /// Returns the stable index of this value.
    pub fn index(self) -> usize {
        match self {
            RelativeTarget::Up => 0,
            RelativeTarget::Down => 1,
            RelativeTarget::Left => 2,
            RelativeTarget::Right => 3,
            RelativeTarget::None => 4,
        }
    }

    /// Unit (row, col) displacement of this direction, or `None` for
    /// [`RelativeTarget::None`].
    pub fn delta(self) -> Option<(i64, i64)> {
        match self {
            RelativeTarget::Up => Some((-1, 0)),
            RelativeTarget::Down => Some((1, 0)),
            RelativeTarget::Left => Some((0, -1)),
            RelativeTarget::Right => Some((0, 1)),
            RelativeTarget::None => None,
        }
    }

    /// Computes the dominant direction from `from` toward `to`.
    ///
    /// The larger-magnitude axis wins; vertical wins ties. Returns
    /// [`RelativeTarget::None`] when the cells coincide.
    pub fn toward(from: Cell, to: Cell) -> RelativeTarget {
        let dr = to.row as i64 - from.row as i64;
        let dc = to.col as i64 - from.col as i64;

        if dr != 0 && dr.abs() >= dc.abs() {
            if dr < 0 {
                RelativeTarget::Up
            } else {
                RelativeTarget::Down
            }
        } else if dc != 0 {
            if dc < 0 {
                RelativeTarget::Left
            } else {
                RelativeTarget::Right
            }
        } else {
            RelativeTarget::None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_indices_round_trip() {
        for action in Action::all() {
            assert_eq!(Action::from_index(action.index()), Some(action));
        }
        assert_eq!(Action::from_index(6), None);
    }

    #[test]
    fn action_name_fallback() {
        assert_eq!(Action::name_of(5), "circumnavigate");
        assert_eq!(Action::name_of(42), "unknown");
    }

    #[test]
    fn relative_target_matches_action_indices() {
        assert_eq!(RelativeTarget::Up.index(), Action::Up.index());
        assert_eq!(RelativeTarget::Right.index(), Action::Right.index());
        assert_eq!(RelativeTarget::None.index(), Action::Skip.index());
    }

    #[test]
    fn toward_vertical_dominates() {
        let from = Cell::new(5, 5);
        assert_eq!(RelativeTarget::toward(from, Cell::new(1, 4)), RelativeTarget::Up);
        assert_eq!(RelativeTarget::toward(from, Cell::new(8, 6)), RelativeTarget::Down);
    }

    #[test]
    fn toward_horizontal_dominates() {
        let from = Cell::new(5, 5);
        assert_eq!(RelativeTarget::toward(from, Cell::new(4, 1)), RelativeTarget::Left);
        assert_eq!(RelativeTarget::toward(from, Cell::new(6, 9)), RelativeTarget::Right);
    }

    #[test]
    fn toward_vertical_wins_ties() {
        let from = Cell::new(5, 5);
        assert_eq!(RelativeTarget::toward(from, Cell::new(2, 2)), RelativeTarget::Up);
        assert_eq!(RelativeTarget::toward(from, Cell::new(7, 3)), RelativeTarget::Down);
    }

    #[test]
    fn toward_on_target_is_none() {
        let cell = Cell::new(3, 3);
        assert_eq!(RelativeTarget::toward(cell, cell), RelativeTarget::None);
    }

    #[test]
    fn cell_offset_rejects_negative() {
        assert_eq!(Cell::new(0, 3).offset(-1, 0), None);
        assert_eq!(Cell::new(2, 0).offset(0, -1), None);
        assert_eq!(Cell::new(2, 3).offset(-1, 1), Some(Cell::new(1, 4)));
    }

    #[test]
    fn grid_contains() {
        let grid = GridSize::new(5, 7);
        assert!(grid.contains(Cell::new(4, 6)));
        assert!(!grid.contains(Cell::new(5, 0)));
        assert!(!grid.contains(Cell::new(0, 7)));
    }
}
