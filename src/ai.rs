// Default move policies
//
// Small heuristic players used as rollout policies by the search and as
// opponents in the arena driver. All of them degrade to FALLBACK_DIRECTION
// instead of failing when no safe move exists.

use rand::seq::IndexedRandom;
use rand::Rng;

use crate::simulator::{Board, Direction, Position, FALLBACK_DIRECTION};

/// Manhattan distance between two cells.
pub fn grid_distance(a: Position, b: Position) -> u32 {
    ((a.x - b.x).abs() + (a.y - b.y).abs()) as u32
}

/// The moves that land `id`'s head on an immediately safe cell.
///
/// Panics if `id` is not on the board.
pub fn safe_moves(board: &Board, id: &str) -> Vec<Direction> {
    let head = board.snake(id).head();
    Direction::ALL
        .iter()
        .filter(|direction| board.is_safe_cell(id, direction.apply(head)))
        .copied()
        .collect()
}

/// Uniform over all four directions, safety be damned.
pub fn random_player(rng: &mut impl Rng) -> Direction {
    Direction::ALL[rng.random_range(0..Direction::ALL.len())]
}

/// Uniform over the currently safe moves.
pub fn avoid_walls_player(board: &Board, id: &str, rng: &mut impl Rng) -> Direction {
    safe_moves(board, id)
        .choose(rng)
        .copied()
        .unwrap_or(FALLBACK_DIRECTION)
}

/// Moves toward the nearest food: restricts the safe moves to those that
/// strictly decrease the Manhattan distance to the closest food cell, and
/// falls back to a random safe move (then to the fixed fallback) when that
/// filter comes up empty.
pub fn seek_food_player(board: &Board, id: &str, rng: &mut impl Rng) -> Direction {
    let possible = safe_moves(board, id);
    let head = board.snake(id).head();
    let ruleset = board.ruleset();

    let mut closest_food = head;
    let mut closest_distance = u32::MAX;
    for y in 0..ruleset.height as i32 {
        for x in 0..ruleset.width as i32 {
            let position = Position { x, y };
            let distance = grid_distance(position, head);
            if board.food().has_food(position) && distance < closest_distance {
                closest_food = position;
                closest_distance = distance;
            }
        }
    }

    let seeking: Vec<Direction> = possible
        .iter()
        .filter(|direction| grid_distance(direction.apply(head), closest_food) < closest_distance)
        .copied()
        .collect();

    if let Some(direction) = seeking.choose(rng) {
        *direction
    } else if let Some(direction) = possible.choose(rng) {
        *direction
    } else {
        FALLBACK_DIRECTION
    }
}

/// The closed set of policies the rollout phase samples from. An enum rather
/// than function pointers so the policy set stays explicit and exhaustively
/// testable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RolloutStrategy {
    RandomSafe,
    SeekFood,
}

impl RolloutStrategy {
    pub const ALL: [RolloutStrategy; 2] = [RolloutStrategy::RandomSafe, RolloutStrategy::SeekFood];

    pub fn choose_move(self, board: &Board, id: &str, rng: &mut impl Rng) -> Direction {
        match self {
            RolloutStrategy::RandomSafe => avoid_walls_player(board, id, rng),
            RolloutStrategy::SeekFood => seek_food_player(board, id, rng),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulator::{FoodGrid, Ruleset, Snake};
    use fxhash::FxHashMap;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    fn at(x: i32, y: i32) -> Position {
        Position { x, y }
    }

    fn board_with(snakes: Vec<(&str, Snake)>, food_at: Vec<Position>) -> Board {
        let ruleset = Ruleset::default();
        let map: FxHashMap<String, Snake> = snakes
            .into_iter()
            .map(|(id, snake)| (id.to_string(), snake))
            .collect();
        let mut food = FoodGrid::empty(ruleset.width, ruleset.height);
        for position in food_at {
            food.place(position);
        }
        Board::new(map, food, ruleset)
    }

    #[test]
    fn test_grid_distance() {
        assert_eq!(grid_distance(at(0, 0), at(0, 0)), 0);
        assert_eq!(grid_distance(at(0, 0), at(3, 4)), 7);
        assert_eq!(grid_distance(at(3, 4), at(0, 0)), 7);
    }

    #[test]
    fn test_safe_moves_respects_walls_and_bodies() {
        // Head in the corner with the body blocking Right.
        let board = board_with(
            vec![("a", Snake::new(vec![at(2, 0), at(1, 0), at(0, 0)], 100))],
            vec![],
        );

        let moves = safe_moves(&board, "a");
        assert_eq!(moves, vec![Direction::Down]);
    }

    #[test]
    fn test_safe_moves_empty_when_trapped() {
        // Corner head walled in by another snake.
        let board = board_with(
            vec![
                ("a", Snake::stacked(at(0, 0), 1, 100)),
                ("b", Snake::new(vec![at(2, 0), at(1, 0), at(1, 1), at(0, 1)], 100)),
            ],
            vec![],
        );

        assert!(safe_moves(&board, "a").is_empty());

        let mut rng = SmallRng::seed_from_u64(0);
        assert_eq!(avoid_walls_player(&board, "a", &mut rng), FALLBACK_DIRECTION);
        assert_eq!(seek_food_player(&board, "a", &mut rng), FALLBACK_DIRECTION);
    }

    #[test]
    fn test_avoid_walls_player_only_picks_safe_moves() {
        let board = board_with(
            vec![("a", Snake::new(vec![at(2, 0), at(1, 0), at(0, 0)], 100))],
            vec![],
        );

        let mut rng = SmallRng::seed_from_u64(7);
        for _ in 0..20 {
            assert_eq!(avoid_walls_player(&board, "a", &mut rng), Direction::Down);
        }
    }

    #[test]
    fn test_seek_food_moves_strictly_closer() {
        // Head at (5, 5), food at (8, 5): only Right decreases the distance.
        let board = board_with(
            vec![("a", Snake::new(vec![at(4, 5), at(5, 5)], 100))],
            vec![at(8, 5)],
        );

        let mut rng = SmallRng::seed_from_u64(3);
        for _ in 0..20 {
            assert_eq!(seek_food_player(&board, "a", &mut rng), Direction::Right);
        }
    }

    #[test]
    fn test_seek_food_without_food_falls_back_to_safe_moves() {
        let board = board_with(
            vec![("a", Snake::new(vec![at(4, 5), at(5, 5)], 100))],
            vec![],
        );

        let mut rng = SmallRng::seed_from_u64(3);
        for _ in 0..20 {
            let chosen = seek_food_player(&board, "a", &mut rng);
            assert!(safe_moves(&board, "a").contains(&chosen));
        }
    }

    #[test]
    fn test_random_player_covers_all_directions() {
        let mut rng = SmallRng::seed_from_u64(11);
        let mut seen = [false; 4];
        for _ in 0..100 {
            match random_player(&mut rng) {
                Direction::Up => seen[0] = true,
                Direction::Down => seen[1] = true,
                Direction::Left => seen[2] = true,
                Direction::Right => seen[3] = true,
            }
        }
        assert!(seen.iter().all(|covered| *covered));
    }

    #[test]
    fn test_rollout_strategies_return_safe_moves_when_available() {
        let board = board_with(
            vec![("a", Snake::new(vec![at(4, 5), at(5, 5)], 100))],
            vec![at(8, 5)],
        );

        let mut rng = SmallRng::seed_from_u64(5);
        for strategy in RolloutStrategy::ALL {
            let chosen = strategy.choose_move(&board, "a", &mut rng);
            assert!(safe_moves(&board, "a").contains(&chosen));
        }
    }
}
