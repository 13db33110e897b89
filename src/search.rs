// SUCT search engine
//
// UCT adapted to a simultaneous-move game by serializing each round into a
// fixed turn order: a search state is a board snapshot plus the moves picked
// so far this round, and a full round is applied to the board only once every
// snake in the turn order has picked. Statistics live in a transposition
// table keyed by state content, so different move sequences reaching the same
// state share a node.
//
// One `SuctSearch` instance serves exactly one decision: the table and the
// RNG are private to it and must not be shared between concurrent requests.

use std::hash::{Hash, Hasher};
use std::time::Instant;

use fxhash::FxHashMap;
use log::debug;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::ai::{safe_moves, RolloutStrategy};
use crate::simulator::{Board, Direction, FALLBACK_DIRECTION};

/// Tuning knobs for one search invocation.
#[derive(Debug, Clone, Copy)]
pub struct SearchParams {
    /// Wall-clock budget. The budget is only checked between whole
    /// iterations; a started iteration always runs to completion.
    pub compute_time_ms: u64,
    /// UCB1 exploration constant.
    pub exploration_constant: f32,
    /// Optional hard cap on iterations. Wall-clock time varies from run to
    /// run, so seeded replays need this to reproduce a decision exactly.
    pub max_iterations: Option<u64>,
}

impl Default for SearchParams {
    fn default() -> Self {
        SearchParams {
            compute_time_ms: 200,
            exploration_constant: 1.0,
            max_iterations: None,
        }
    }
}

/// Per-snake cumulative rewards.
type RewardMap = FxHashMap<String, f32>;

/// The unit the search tree is keyed on: a board, the round's fixed turn
/// order, and the moves selected so far this round.
#[derive(Debug, Clone, PartialEq, Eq)]
struct State {
    board: Board,
    turn_order: Vec<String>,
    selected_moves: Vec<Direction>,
}

// Board content plus an order-sensitive fold over the selected move codes.
// The turn order is deliberately left out: the board hash already covers the
// snakes, and the turn order is constant across one search.
impl Hash for State {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.board.hash(state);
        for direction in &self.selected_moves {
            (*direction as u8).hash(state);
        }
    }
}

impl State {
    /// Root state for a search: the deciding snake moves first (biasing the
    /// serialized game toward treating its safety first), the others follow
    /// in sorted order, and food spawning is switched off inside the tree to
    /// keep transitions deterministic and the branching bounded.
    fn from_board(board: &Board, player_id: &str) -> Self {
        let mut turn_order = Vec::with_capacity(board.snakes().len());
        turn_order.push(player_id.to_string());

        let mut others: Vec<String> = board
            .snakes()
            .keys()
            .filter(|id| id.as_str() != player_id)
            .cloned()
            .collect();
        others.sort();
        turn_order.extend(others);

        let mut ruleset = *board.ruleset();
        ruleset.spawn_food = false;

        State {
            board: board.with_ruleset(ruleset),
            turn_order,
            selected_moves: Vec::new(),
        }
    }

    /// The snake whose turn it is at this state.
    fn acting_snake(&self) -> &str {
        &self.turn_order[self.selected_moves.len()]
    }

    /// Safe moves for the acting snake. The turn order is fixed for the
    /// whole search, so it can name a snake that has since been eliminated;
    /// an eliminated actor simply has no safe moves and gets forced into
    /// the fallback direction (its move is ignored by the board).
    fn actor_safe_moves(&self) -> Vec<Direction> {
        let actor = self.acting_snake();
        if self.board.contains_snake(actor) {
            safe_moves(&self.board, actor)
        } else {
            Vec::new()
        }
    }
}

/// Aggregated statistics for one state.
#[derive(Debug, Default)]
struct Node {
    visit_count: u32,
    rewards: RewardMap,
}

/// One-shot SUCT search: build it, call `choose_move` once, drop it.
pub struct SuctSearch {
    params: SearchParams,
    nodes: FxHashMap<State, Node>,
    rng: SmallRng,
}

impl SuctSearch {
    /// A search seeded from the OS for production use.
    pub fn new(params: SearchParams) -> Self {
        Self::with_rng(params, SmallRng::from_os_rng())
    }

    /// A deterministically seeded search for tests and replays.
    pub fn seeded(params: SearchParams, seed: u64) -> Self {
        Self::with_rng(params, SmallRng::seed_from_u64(seed))
    }

    fn with_rng(params: SearchParams, rng: SmallRng) -> Self {
        SuctSearch {
            params,
            nodes: FxHashMap::default(),
            rng,
        }
    }

    /// Runs search iterations until the time budget expires, then returns
    /// the root snake's safe move with the highest average reward among
    /// visited children. Falls back to the first safe move if nothing got
    /// visited, and to `FALLBACK_DIRECTION` if nothing is safe.
    ///
    /// Panics if `player_id` is not on the board.
    pub fn choose_move(&mut self, board: &Board, player_id: &str) -> Direction {
        let started = Instant::now();
        let root = State::from_board(board, player_id);

        self.nodes.clear();
        self.nodes.insert(root.clone(), Node::default());

        let mut iterations: u64 = 0;
        let cap = self.params.max_iterations.unwrap_or(u64::MAX);
        while iterations < cap
            && (started.elapsed().as_millis() as u64) < self.params.compute_time_ms
        {
            self.iterate(&root);
            iterations += 1;
        }

        let possible = safe_moves(board, player_id);
        let Some(&first) = possible.first() else {
            debug!("no safe move at root, falling back to {:?}", FALLBACK_DIRECTION);
            return FALLBACK_DIRECTION;
        };

        let mut best_move = first;
        let mut best_score = f32::NEG_INFINITY;
        for &direction in &possible {
            let child = self.advance(&root, direction);
            if let Some(node) = self.nodes.get(&child) {
                if node.visit_count > 0 {
                    let total = node.rewards.get(player_id).copied().unwrap_or(0.0);
                    let score = total / node.visit_count as f32;
                    if score > best_score {
                        best_move = direction;
                        best_score = score;
                    }
                }
            }
        }

        debug!(
            "search finished: {} iterations, {} nodes, best {:?} (mean reward {:.3})",
            iterations,
            self.nodes.len(),
            best_move,
            best_score
        );

        best_move
    }

    /// One full selection/expansion/rollout/backpropagation pass from
    /// `state`. Returns the reward vector propagated along the visited path.
    fn iterate(&mut self, state: &State) -> RewardMap {
        if state.board.is_game_over() {
            return evaluate(state);
        }

        let unexplored = self.unexplored_moves(state);

        if self.nodes.contains_key(state) && !unexplored.is_empty() {
            // Expansion: materialize one untried child and bootstrap its
            // statistics with a rollout.
            let direction = unexplored[self.rng.random_range(0..unexplored.len())];
            let child = self.advance(state, direction);

            let rewards = self.rollout(&child);
            let node = self.nodes.entry(child).or_default();
            node.rewards = rewards.clone();
            node.visit_count += 1;

            self.record(state, &rewards);
            rewards
        } else {
            // Selection: descend along the UCB1-best child.
            let direction = self.select_move(state);
            let child = self.advance(state, direction);

            let rewards = self.iterate(&child);
            self.record(state, &rewards);
            rewards
        }
    }

    /// Applies one selected move to a state: completes the round and runs
    /// the board transition once every snake in the turn order has moved.
    /// Deterministic, because the search board never spawns food.
    fn advance(&mut self, state: &State, direction: Direction) -> State {
        let mut selected = state.selected_moves.clone();
        selected.push(direction);

        if selected.len() == state.turn_order.len() {
            let moves: FxHashMap<String, Direction> = state
                .turn_order
                .iter()
                .cloned()
                .zip(selected)
                .collect();

            let mut board = state.board.clone();
            board.update(&moves, &mut self.rng);

            return State {
                board,
                turn_order: state.turn_order.clone(),
                selected_moves: Vec::new(),
            };
        }

        State {
            board: state.board.clone(),
            turn_order: state.turn_order.clone(),
            selected_moves: selected,
        }
    }

    /// The acting snake's safe moves whose successor state has no node yet.
    fn unexplored_moves(&mut self, state: &State) -> Vec<Direction> {
        state
            .actor_safe_moves()
            .into_iter()
            .filter(|direction| {
                let child = self.advance(state, *direction);
                !self.nodes.contains_key(&child)
            })
            .collect()
    }

    /// UCB1 selection over the acting snake's safe moves. An unvisited child
    /// scores +infinity and wins immediately; no safe moves means the snake
    /// is forced into the fallback direction.
    fn select_move(&mut self, state: &State) -> Direction {
        let actor = state.acting_snake().to_string();
        let possible = state.actor_safe_moves();
        let Some(&first) = possible.first() else {
            return FALLBACK_DIRECTION;
        };

        let parent_visits = self
            .nodes
            .get(state)
            .map(|node| node.visit_count)
            .unwrap_or(0);

        let mut best_move = first;
        let mut best_score = f32::NEG_INFINITY;
        for &direction in &possible {
            let child = self.advance(state, direction);
            let Some(node) = self.nodes.get(&child) else {
                return direction;
            };

            let total = node.rewards.get(&actor).copied().unwrap_or(0.0);
            let score = ucb(
                total,
                node.visit_count,
                parent_visits,
                self.params.exploration_constant,
            );
            if score > best_score {
                best_move = direction;
                best_score = score;
            }
        }

        best_move
    }

    /// Plays the state out to a terminal board, sampling uniformly between
    /// the rollout policies at every decision point, and returns the
    /// terminal evaluation vector. Not memoized.
    fn rollout(&mut self, state: &State) -> RewardMap {
        let mut current = state.clone();
        while !current.board.is_game_over() {
            let actor = current.acting_snake().to_string();
            let direction = if current.board.contains_snake(&actor) {
                let strategy =
                    RolloutStrategy::ALL[self.rng.random_range(0..RolloutStrategy::ALL.len())];
                strategy.choose_move(&current.board, &actor, &mut self.rng)
            } else {
                FALLBACK_DIRECTION
            };
            current = self.advance(&current, direction);
        }
        evaluate(&current)
    }

    /// Folds a reward vector into `state`'s node (creating it if absent) and
    /// counts the visit.
    fn record(&mut self, state: &State, rewards: &RewardMap) {
        let node = self.nodes.entry(state.clone()).or_default();
        for (id, reward) in rewards {
            *node.rewards.entry(id.clone()).or_insert(0.0) += reward;
        }
        node.visit_count += 1;
    }
}

/// Terminal reward vector: 1.0 for the sole survivor, 0.0 for everyone
/// else; a draw is all zeros.
fn evaluate(state: &State) -> RewardMap {
    let mut rewards = RewardMap::default();
    for id in &state.turn_order {
        rewards.insert(id.clone(), 0.0);
    }
    if let Some(winner) = state.board.get_winner() {
        rewards.insert(winner.to_string(), 1.0);
    }
    rewards
}

/// UCB1 score from the acting snake's perspective. A zero-visit child is
/// always preferred; the parent count is clamped to 1 so `ln` can never
/// poison a selectable candidate with NaN.
fn ucb(total_reward: f32, visits: u32, parent_visits: u32, exploration: f32) -> f32 {
    if visits == 0 {
        return f32::INFINITY;
    }

    let n = visits as f32;
    let big_n = parent_visits.max(1) as f32;
    total_reward / n + exploration * (big_n.ln() / n).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulator::{FoodGrid, Position, Ruleset, Snake};

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

    fn two_snake_board() -> Board {
        board_with(
            vec![
                ("me", Snake::new(vec![at(1, 1), at(2, 1), at(3, 1)], 100)),
                ("them", Snake::new(vec![at(9, 9), at(8, 9), at(7, 9)], 100)),
            ],
            vec![at(5, 5)],
        )
    }

    #[test]
    fn test_root_state_puts_decider_first_and_disables_spawning() {
        let board = two_snake_board();
        let state = State::from_board(&board, "them");

        assert_eq!(state.turn_order, vec!["them".to_string(), "me".to_string()]);
        assert!(state.selected_moves.is_empty());
        assert!(!state.board.ruleset().spawn_food);
        assert_eq!(state.acting_snake(), "them");
    }

    #[test]
    fn test_advance_completes_a_round_at_turn_order_length() {
        let board = two_snake_board();
        let mut search = SuctSearch::seeded(SearchParams::default(), 0);
        let root = State::from_board(&board, "me");

        let half = search.advance(&root, Direction::Down);
        assert_eq!(half.selected_moves, vec![Direction::Down]);
        assert_eq!(half.board, root.board);
        assert_eq!(half.acting_snake(), "them");

        let full = search.advance(&half, Direction::Down);
        assert!(full.selected_moves.is_empty());
        assert_ne!(full.board, root.board);
        assert_eq!(full.board.snake("me").head(), at(3, 2));
        assert_eq!(full.board.snake("them").head(), at(7, 10));
    }

    #[test]
    fn test_state_equality_and_hash_agree() {
        use std::collections::hash_map::DefaultHasher;

        let board = two_snake_board();
        let mut search = SuctSearch::seeded(SearchParams::default(), 0);

        let s1 = search.advance(&State::from_board(&board, "me"), Direction::Down);
        let s2 = search.advance(&State::from_board(&board, "me"), Direction::Down);
        let s3 = search.advance(&State::from_board(&board, "me"), Direction::Up);

        let hash = |state: &State| {
            let mut hasher = DefaultHasher::new();
            state.hash(&mut hasher);
            hasher.finish()
        };

        assert_eq!(s1, s2);
        assert_eq!(hash(&s1), hash(&s2));
        assert_ne!(s1, s3);
    }

    #[test]
    fn test_evaluate_rewards_sole_survivor() {
        let board = board_with(
            vec![("me", Snake::new(vec![at(1, 1), at(2, 1)], 100))],
            vec![],
        );
        let state = State {
            board: board.clone(),
            turn_order: vec!["me".to_string(), "them".to_string()],
            selected_moves: Vec::new(),
        };

        let rewards = evaluate(&state);
        assert_eq!(rewards["me"], 1.0);
        assert_eq!(rewards["them"], 0.0);
    }

    #[test]
    fn test_evaluate_draw_is_all_zeros() {
        let board = board_with(vec![], vec![]);
        let state = State {
            board,
            turn_order: vec!["a".to_string(), "b".to_string()],
            selected_moves: Vec::new(),
        };

        let rewards = evaluate(&state);
        assert!(rewards.values().all(|reward| *reward == 0.0));
    }

    #[test]
    fn test_ucb_prefers_unvisited_children() {
        assert_eq!(ucb(0.0, 0, 10, 1.0), f32::INFINITY);
    }

    #[test]
    fn test_ucb_balances_value_and_exploration() {
        // Same mean, fewer visits -> higher score.
        assert!(ucb(1.0, 2, 100, 1.0) > ucb(2.0, 4, 100, 1.0));
        // Same visits, higher mean -> higher score.
        assert!(ucb(3.0, 4, 100, 1.0) > ucb(2.0, 4, 100, 1.0));
        // Degenerate parent counts must not produce NaN.
        assert!(!ucb(1.0, 1, 0, 1.0).is_nan());
        assert!(!ucb(1.0, 1, 1, 1.0).is_nan());
    }

    #[test]
    fn test_choose_move_returns_the_only_safe_move() {
        // Head boxed into a corner lane: Down is the only safe move.
        let board = board_with(
            vec![
                ("me", Snake::new(vec![at(2, 0), at(1, 0), at(0, 0)], 100)),
                ("them", Snake::new(vec![at(9, 9), at(8, 9), at(7, 9)], 100)),
            ],
            vec![],
        );

        let params = SearchParams {
            compute_time_ms: 10,
            ..SearchParams::default()
        };
        let mut search = SuctSearch::seeded(params, 0);
        assert_eq!(search.choose_move(&board, "me"), Direction::Down);
    }

    #[test]
    fn test_choose_move_falls_back_when_trapped() {
        let board = board_with(
            vec![
                ("me", Snake::stacked(at(0, 0), 1, 100)),
                (
                    "them",
                    Snake::new(vec![at(2, 0), at(1, 0), at(1, 1), at(0, 1)], 100),
                ),
            ],
            vec![],
        );

        let params = SearchParams {
            compute_time_ms: 5,
            ..SearchParams::default()
        };
        let mut search = SuctSearch::seeded(params, 0);
        assert_eq!(search.choose_move(&board, "me"), FALLBACK_DIRECTION);
    }

    #[test]
    fn test_identical_seeds_give_identical_decisions() {
        let board = two_snake_board();
        // An iteration cap instead of a pure time budget makes the run
        // exactly reproducible.
        let params = SearchParams {
            compute_time_ms: 10_000,
            max_iterations: Some(200),
            ..SearchParams::default()
        };

        let first = SuctSearch::seeded(params, 99).choose_move(&board, "me");
        let second = SuctSearch::seeded(params, 99).choose_move(&board, "me");
        assert_eq!(first, second);
    }

    #[test]
    fn test_search_survives_mid_game_eliminations_in_turn_order() {
        // The middle snake starves almost immediately, but stays in the
        // fixed turn order for the rest of the search.
        let board = board_with(
            vec![
                ("me", Snake::new(vec![at(1, 1), at(2, 1), at(3, 1)], 100)),
                ("b", Snake::new(vec![at(9, 1), at(8, 1), at(7, 1)], 2)),
                ("c", Snake::new(vec![at(9, 9), at(8, 9), at(7, 9)], 100)),
            ],
            vec![at(5, 5)],
        );

        let params = SearchParams {
            compute_time_ms: 50,
            ..SearchParams::default()
        };
        let chosen = SuctSearch::seeded(params, 3).choose_move(&board, "me");
        assert!(safe_moves(&board, "me").contains(&chosen));
    }

    #[test]
    fn test_search_avoids_certain_head_on_loss() {
        // A short snake one gap away from a longer one. Moving Right is a
        // guaranteed head-on loss or body collision next round; the search
        // should keep its distance by picking one of the vertical moves.
        let board = board_with(
            vec![
                ("me", Snake::new(vec![at(1, 5), at(2, 5)], 100)),
                (
                    "them",
                    Snake::new(vec![at(6, 5), at(5, 5), at(4, 5)], 100),
                ),
            ],
            vec![],
        );

        let params = SearchParams {
            compute_time_ms: 100,
            ..SearchParams::default()
        };
        let mut search = SuctSearch::seeded(params, 1);
        let chosen = search.choose_move(&board, "me");
        assert_ne!(chosen, Direction::Right);
    }
}
