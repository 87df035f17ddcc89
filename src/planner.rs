//! Breadth-first shortest-path search over the grid.

use std::collections::{HashMap, HashSet, VecDeque};

use crate::types::{Cell, GridSize};

/// Exploration order: up, down, left, right. The order fixes the tie-break
/// among equal-length paths and is relied upon by deterministic tests.
const DIRECTIONS: [(i64, i64); 4] = [(-1, 0), (1, 0), (0, -1), (0, 1)];

/// Finds a shortest path from `start` to `goal` over 4-connected cells,
/// treating every cell in `blocked` as impassable.
///
/// Returns the path excluding `start` and including `goal`, or an empty
/// vector when the goal is unreachable (a normal outcome, not an error) or
/// when `start == goal`. Each cell is visited at most once; the path is
/// reconstructed from parent pointers at goal discovery rather than copied
/// along with every queue entry.
pub fn shortest_path(grid: GridSize, start: Cell, goal: Cell, blocked: &HashSet<Cell>) -> Vec<Cell> {
    if start == goal {
        return Vec::new();
    }

    let mut visited = HashSet::new();
    visited.insert(start);
    let mut parent: HashMap<Cell, Cell> = HashMap::new();
    let mut queue = VecDeque::new();
    queue.push_back(start);

    while let Some(current) = queue.pop_front() {
        if current == goal {
            return reconstruct(&parent, start, goal);
        }
        for (dr, dc) in DIRECTIONS {
            let next = match current.offset(dr, dc) {
                Some(cell) => cell,
                None => continue,
            };
            if grid.contains(next) && !blocked.contains(&next) && visited.insert(next) {
                parent.insert(next, current);
                queue.push_back(next);
            }
        }
    }

    Vec::new()
}

fn reconstruct(parent: &HashMap<Cell, Cell>, start: Cell, goal: Cell) -> Vec<Cell> {
    let mut path = vec![goal];
    let mut node = goal;
    while let Some(&prev) = parent.get(&node) {
        if prev == start {
            break;
        }
        path.push(prev);
        node = prev;
    }
    path.reverse();
    path
}
