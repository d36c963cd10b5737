use std::collections::{HashMap, VecDeque};

use crate::types::{Cell, Direction};
use crate::world::GridMap;

const NEIGHBOR_ORDER: [Direction; 4] = [
    Direction::Right,
    Direction::Left,
    Direction::Down,
    Direction::Up,
];

/// Walls and anything outside the grid are impassable. Tunnels are not
/// edges. Returns `None` when `goal` cannot be reached.
pub fn find_path(grid: &GridMap, start: Cell, goal: Cell) -> Option<Vec<Cell>> {
    if !grid.is_walkable(goal) {
        return None;
    }
    if start == goal {
        return Some(vec![start]);
    }

    let mut parents: HashMap<Cell, Cell> = HashMap::new();
    let mut queue = VecDeque::from([start]);
    parents.insert(start, start);

    while let Some(cell) = queue.pop_front() {
        for dir in NEIGHBOR_ORDER {
            let next = cell.step(dir);
            if parents.contains_key(&next) || !grid.is_walkable(next) {
                continue;
            }
            parents.insert(next, cell);
            if next == goal {
                return Some(unwind(&parents, start, goal));
            }
            queue.push_back(next);
        }
    }
    None
}

fn unwind(parents: &HashMap<Cell, Cell>, start: Cell, goal: Cell) -> Vec<Cell> {
    let mut path = vec![goal];
    let mut cursor = goal;
    while cursor != start {
        match parents.get(&cursor) {
            Some(parent) => {
                cursor = *parent;
                path.push(cursor);
            }
            None => break,
        }
    }
    path.reverse();
    path
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_contiguous(grid: &GridMap, path: &[Cell]) {
        for cell in path {
            assert!(grid.is_walkable(*cell), "{cell:?} is not walkable");
        }
        for pair in path.windows(2) {
            assert!(pair[0].is_adjacent(pair[1]), "{:?} -> {:?}", pair[0], pair[1]);
        }
    }

    #[test]
    fn open_room_path_has_manhattan_length() {
        let grid = GridMap::parse("#######\n#P    #\n#     #\n#     #\n#######").expect("map");
        let start = Cell::new(1, 1);
        let goal = Cell::new(5, 3);
        let path = find_path(&grid, start, goal).expect("reachable");
        assert_eq!(path.len(), 4 + 2 + 1);
        assert_eq!(path.first(), Some(&start));
        assert_eq!(path.last(), Some(&goal));
        assert_contiguous(&grid, &path);
    }

    #[test]
    fn ties_break_by_expansion_order() {
        let grid = GridMap::parse("####\n#P #\n#  #\n####").expect("map");
        let path = find_path(&grid, Cell::new(1, 1), Cell::new(2, 2)).expect("reachable");
        // east is expanded before south
        assert_eq!(path, vec![Cell::new(1, 1), Cell::new(2, 1), Cell::new(2, 2)]);

        let back = find_path(&grid, Cell::new(2, 2), Cell::new(1, 1)).expect("reachable");
        // west is expanded before north
        assert_eq!(back, vec![Cell::new(2, 2), Cell::new(1, 2), Cell::new(1, 1)]);
    }

    #[test]
    fn detours_around_walls() {
        let grid = GridMap::parse("#####\n#P#.#\n#...#\n#####").expect("map");
        let path = find_path(&grid, Cell::new(1, 1), Cell::new(3, 1)).expect("reachable");
        assert_eq!(path.len(), 5);
        assert_contiguous(&grid, &path);
    }

    #[test]
    fn unreachable_or_blocked_goal_has_no_path() {
        let grid = GridMap::parse("#####\n#P#.#\n#####").expect("map");
        assert_eq!(find_path(&grid, Cell::new(1, 1), Cell::new(3, 1)), None);
        assert_eq!(find_path(&grid, Cell::new(1, 1), Cell::new(2, 1)), None);
        assert_eq!(find_path(&grid, Cell::new(1, 1), Cell::new(9, 9)), None);
    }

    #[test]
    fn start_equals_goal_is_single_node() {
        let grid = GridMap::parse("###\n#P#\n###").expect("map");
        assert_eq!(
            find_path(&grid, Cell::new(1, 1), Cell::new(1, 1)),
            Some(vec![Cell::new(1, 1)])
        );
    }

    #[test]
    fn default_level_paths_are_contiguous() {
        let grid = GridMap::parse(include_str!("../../maps/level_1.txt")).expect("map");
        let player = grid.find_symbol('P')[0];
        for ghost in grid.find_symbol('G') {
            let path = find_path(&grid, ghost, player).expect("ghost reaches player");
            assert_eq!(path.first(), Some(&ghost));
            assert_eq!(path.last(), Some(&player));
            assert_contiguous(&grid, &path);
        }
    }
}
