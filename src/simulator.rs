// Board simulation engine
//
// Implements the full round transition for a multi-snake game:
// move -> feed -> spawn food -> eliminate. Elimination is computed from the
// post-move snapshot so that no snake's death can affect another's
// elimination check within the same round.
//
// Coordinates are top-left origin: Up decrements y, Down increments y.
// The HTTP boundary (bot.rs) is responsible for flipping the wire format's
// bottom-left origin before anything in this module sees it.

use std::fmt::Write as _;
use std::hash::{Hash, Hasher};

use fxhash::{FxHashMap, FxHasher};
use rand::seq::IndexedRandom;
use rand::Rng;

use crate::grid::Grid;

/// An integer cell coordinate. May be out of bounds; the board decides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

/// The four compass moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
    ];

    /// String form used in API responses.
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Up => "up",
            Direction::Down => "down",
            Direction::Left => "left",
            Direction::Right => "right",
        }
    }

    /// The position one step in this direction. Pure and total: the result
    /// may be out of bounds.
    pub fn apply(&self, position: Position) -> Position {
        match self {
            Direction::Up => Position {
                x: position.x,
                y: position.y - 1,
            },
            Direction::Down => Position {
                x: position.x,
                y: position.y + 1,
            },
            Direction::Left => Position {
                x: position.x - 1,
                y: position.y,
            },
            Direction::Right => Position {
                x: position.x + 1,
                y: position.y,
            },
        }
    }
}

/// One snake: body segments ordered tail-first (head at the last index)
/// plus a health counter.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Snake {
    body: Vec<Position>,
    health: i32,
}

impl Snake {
    /// Builds a snake from a tail-first body. The body must be non-empty.
    pub fn new(body: Vec<Position>, health: i32) -> Self {
        debug_assert!(!body.is_empty(), "snake body must have at least one segment");
        Snake { body, health }
    }

    /// Builds a freshly spawned snake: `length` segments stacked on one cell,
    /// the way the game engine spawns snakes at the start of a match.
    pub fn stacked(position: Position, length: usize, health: i32) -> Self {
        Snake {
            body: vec![position; length.max(1)],
            health,
        }
    }

    pub fn head(&self) -> Position {
        self.body[self.body.len() - 1]
    }

    pub fn body(&self) -> &[Position] {
        &self.body
    }

    pub fn len(&self) -> usize {
        self.body.len()
    }

    pub fn health(&self) -> i32 {
        self.health
    }

    pub fn set_health(&mut self, health: i32) {
        self.health = health;
    }

    pub fn is_alive(&self) -> bool {
        self.health > 0
    }

    /// First phase of the two-phase move: appends the new head without
    /// removing the tail. The tail is popped later unless the snake fed.
    pub fn advance(&mut self, direction: Direction) {
        let next = direction.apply(self.head());
        self.body.push(next);
    }

    /// Removes the oldest body segment. A length-1 snake keeps its last
    /// segment (body length >= 1 is an invariant).
    pub fn pop_tail(&mut self) {
        if self.body.len() > 1 {
            self.body.remove(0);
        }
    }
}

/// Boolean food occupancy plus a cached count of set cells.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FoodGrid {
    cells: Grid<bool>,
    count: u32,
}

impl FoodGrid {
    pub fn empty(width: u32, height: u32) -> Self {
        FoodGrid {
            cells: Grid::new(width, height),
            count: 0,
        }
    }

    pub fn has_food(&self, position: Position) -> bool {
        self.cells[position]
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    /// Marks a cell as holding food. No-op if it already does.
    pub fn place(&mut self, position: Position) {
        if !self.cells[position] {
            self.cells[position] = true;
            self.count += 1;
        }
    }

    /// Clears a food cell. No-op if the cell is empty.
    pub fn consume(&mut self, position: Position) {
        if self.cells[position] {
            self.cells[position] = false;
            self.count -= 1;
        }
    }
}

/// Fixed parameters for one game. Immutable for the lifetime of a board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ruleset {
    pub width: u32,
    pub height: u32,
    pub snake_count: u32,
    pub min_food: u32,
    pub food_spawn_chance: u32,
    pub starting_health: i32,
    pub spawn_food: bool,
}

impl Default for Ruleset {
    fn default() -> Self {
        Ruleset {
            width: 11,
            height: 11,
            snake_count: 2,
            min_food: 1,
            food_spawn_chance: 15,
            starting_health: 100,
            spawn_food: true,
        }
    }
}

/// Direction a snake is forced into when it has no move at all.
pub const FALLBACK_DIRECTION: Direction = Direction::Up;

/// The simulation engine: live snakes, food, and the game's ruleset.
///
/// Snakes that get eliminated are removed from the map, so every id present
/// is live. The search clones a board before every hypothetical round, so
/// sibling branches never alias state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Board {
    snakes: FxHashMap<String, Snake>,
    food: FoodGrid,
    ruleset: Ruleset,
}

// The hash feeds the search's transposition table: it covers the food cells
// and each snake's body + health, but not the snake ids (the search's turn
// order carries identity) and not the ruleset (constant across every node of
// one search). Equal boards still hash equally, so the Eq contract holds.
impl Hash for Board {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.food.hash(state);

        // Map iteration order is unspecified, so fold per-snake hashes with
        // a commutative operation.
        let mut combined: u64 = 0;
        for snake in self.snakes.values() {
            let mut hasher = FxHasher::default();
            snake.hash(&mut hasher);
            combined = combined.wrapping_add(hasher.finish());
        }
        combined.hash(state);
    }
}

impl Board {
    pub fn new(snakes: FxHashMap<String, Snake>, food: FoodGrid, ruleset: Ruleset) -> Self {
        debug_assert!(snakes.values().all(|s| s.len() >= 1));
        Board {
            snakes,
            food,
            ruleset,
        }
    }

    /// A copy of this board under a different ruleset. Used by the search to
    /// turn food spawning off inside its own transitions.
    pub fn with_ruleset(&self, ruleset: Ruleset) -> Self {
        Board {
            snakes: self.snakes.clone(),
            food: self.food.clone(),
            ruleset,
        }
    }

    pub fn ruleset(&self) -> &Ruleset {
        &self.ruleset
    }

    pub fn food(&self) -> &FoodGrid {
        &self.food
    }

    pub fn snakes(&self) -> &FxHashMap<String, Snake> {
        &self.snakes
    }

    /// Looks up a snake by id.
    ///
    /// Panics if the id is not on the board; querying an unknown id is a
    /// caller contract breach, not a recoverable condition.
    pub fn snake(&self, id: &str) -> &Snake {
        &self.snakes[id]
    }

    pub fn contains_snake(&self, id: &str) -> bool {
        self.snakes.contains_key(id)
    }

    pub fn is_in_bounds(&self, position: Position) -> bool {
        position.x >= 0
            && position.y >= 0
            && (position.x as u32) < self.ruleset.width
            && (position.y as u32) < self.ruleset.height
    }

    /// Predicts, without mutating anything, whether moving `id`'s head onto
    /// `position` is immediately survivable: in bounds and not on any live
    /// snake's current body. Ignores health and food spawning.
    ///
    /// Panics if `id` is not on the board.
    pub fn is_safe_cell(&self, id: &str, position: Position) -> bool {
        debug_assert!(self.contains_snake(id), "unknown snake id: {}", id);

        if !self.is_in_bounds(position) {
            return false;
        }

        !self
            .snakes
            .values()
            .any(|snake| snake.body().contains(&position))
    }

    /// `Some(id)` iff exactly one snake remains. Zero remaining is a draw
    /// and more than one means the game is undecided; both yield `None`.
    pub fn get_winner(&self) -> Option<&str> {
        if self.snakes.len() == 1 {
            self.snakes.keys().next().map(String::as_str)
        } else {
            None
        }
    }

    pub fn is_game_over(&self) -> bool {
        self.snakes.len() <= 1
    }

    /// Applies one full round: every snake moves (and loses 1 health), heads
    /// on food feed, food may spawn, and all doomed snakes are removed at
    /// once.
    ///
    /// Every live snake must have an entry in `moves`; a missing entry is a
    /// caller contract breach and is treated as `Up`.
    pub fn update(&mut self, moves: &FxHashMap<String, Direction>, rng: &mut impl Rng) {
        for (id, snake) in self.snakes.iter_mut() {
            let direction = moves.get(id).copied().unwrap_or(FALLBACK_DIRECTION);
            snake.advance(direction);
            snake.set_health(snake.health() - 1);
        }

        self.feed_snakes();
        self.spawn_food(rng);
        self.eliminate_snakes();
    }

    /// Feeds every snake whose in-bounds head sits on food (health reset,
    /// tail kept) and pops the tail of every other snake. Consumption is
    /// decided against the pre-move food state for all snakes, then applied,
    /// so the outcome is independent of iteration order.
    fn feed_snakes(&mut self) {
        let ruleset = self.ruleset;
        let food = &self.food;
        let mut consumed: Vec<Position> = Vec::new();

        let in_bounds = |p: Position| {
            p.x >= 0 && p.y >= 0 && (p.x as u32) < ruleset.width && (p.y as u32) < ruleset.height
        };

        for snake in self.snakes.values_mut() {
            let head = snake.head();
            if in_bounds(head) && food.has_food(head) {
                snake.set_health(ruleset.starting_health);
                consumed.push(head);
            } else {
                snake.pop_tail();
            }
        }

        // Two heads on the same food both feed; the cell is cleared once.
        for position in consumed {
            self.food.consume(position);
        }
    }

    /// Tops food up to the ruleset minimum, or runs one spawn-chance trial.
    fn spawn_food(&mut self, rng: &mut impl Rng) {
        if !self.ruleset.spawn_food {
            return;
        }

        if self.food.count() < self.ruleset.min_food {
            self.randomly_place_food(self.ruleset.min_food - self.food.count(), rng);
        } else if rng.random_range(0..100) < self.ruleset.food_spawn_chance {
            self.randomly_place_food(1, rng);
        }
    }

    /// Places up to `count` food items uniformly at random among cells that
    /// are both foodless and unoccupied by any snake body.
    fn randomly_place_food(&mut self, count: u32, rng: &mut impl Rng) {
        let mut free: Vec<Position> = Vec::new();
        for y in 0..self.ruleset.height as i32 {
            for x in 0..self.ruleset.width as i32 {
                let position = Position { x, y };
                if self.food.has_food(position) {
                    continue;
                }
                if self
                    .snakes
                    .values()
                    .any(|snake| snake.body().contains(&position))
                {
                    continue;
                }
                free.push(position);
            }
        }

        for position in free.choose_multiple(rng, count as usize) {
            self.food.place(*position);
        }
    }

    /// Computes the set of snakes that die this round from the post-move
    /// snapshot, then removes them all simultaneously. No elimination can
    /// influence another's check within the same round.
    fn eliminate_snakes(&mut self) {
        let mut doomed: Vec<String> = Vec::new();

        for (id, snake) in &self.snakes {
            let head = snake.head();
            let body = snake.body();

            let starved = snake.health() <= 0;
            let out_of_bounds = !self.is_in_bounds(head);
            let self_collision = body[..body.len() - 1].contains(&head);

            let other_collision = self.snakes.iter().any(|(other_id, other)| {
                if other_id == id {
                    return false;
                }
                let other_body = other.body();
                if other.head() == head {
                    // Head-on tie-break: equal length eliminates both.
                    snake.len() <= other.len()
                } else {
                    other_body[..other_body.len() - 1].contains(&head)
                }
            });

            if starved || out_of_bounds || self_collision || other_collision {
                doomed.push(id.clone());
            }
        }

        for id in doomed {
            self.snakes.remove(&id);
        }
    }

    /// Deterministic ASCII rendering for debugging and tests: a dimension
    /// header, one health line per snake, and a bordered grid. Heads are
    /// uppercase letters, bodies lowercase, food `*`.
    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{}x{}", self.ruleset.width, self.ruleset.height);

        let mut ids: Vec<&String> = self.snakes.keys().collect();
        ids.sort();

        for (index, id) in ids.iter().enumerate() {
            let snake = &self.snakes[id.as_str()];
            let _ = writeln!(
                out,
                "{} ({}): health={} length={}",
                (b'a' + (index % 26) as u8) as char,
                id,
                snake.health(),
                snake.len()
            );
        }

        let border: String = "#".repeat(self.ruleset.width as usize + 2);
        out.push_str(&border);
        out.push('\n');

        for y in 0..self.ruleset.height as i32 {
            out.push('#');
            for x in 0..self.ruleset.width as i32 {
                let position = Position { x, y };
                let mut marker = if self.food.has_food(position) { '*' } else { ' ' };

                for (index, id) in ids.iter().enumerate() {
                    let snake = &self.snakes[id.as_str()];
                    let letter = b'a' + (index % 26) as u8;
                    if snake.head() == position {
                        marker = letter.to_ascii_uppercase() as char;
                        break;
                    } else if snake.body().contains(&position) {
                        marker = letter as char;
                        break;
                    }
                }

                out.push(marker);
            }
            out.push_str("#\n");
        }

        out.push_str(&border);
        out.push('\n');
        out
    }
}
