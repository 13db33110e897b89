// Bot orchestration: wire format in, one move out
//
// This module owns the boundary between the Battlesnake API and the
// simulation. The wire format is bottom-left origin with head-first bodies;
// the simulator is top-left origin with tail-first bodies. The flip
// (y' = height - 1 - y) and the reversal happen here and nowhere else.

use log::{error, info, warn};
use serde_json::{json, Value};
use std::time::Instant;

use fxhash::FxHashMap;

use crate::config::Config;
use crate::debug_logger::DebugLogger;
use crate::search::{SearchParams, SuctSearch};
use crate::simulator::{self, FoodGrid, Position, Ruleset, Snake, FALLBACK_DIRECTION};
use crate::types::{Battlesnake, Board, Game};

/// Battlesnake Bot with OOP-style API
/// Takes static configuration dependencies and exposes methods corresponding to API endpoints
pub struct Bot {
    config: Config,
    debug_logger: DebugLogger,
}

impl Bot {
    /// Creates a new Bot instance with the given configuration
    pub fn new(config: Config) -> Self {
        let debug_logger = DebugLogger::new(config.debug.enabled, &config.debug.log_file_path);
        Bot {
            config,
            debug_logger,
        }
    }

    /// Returns bot metadata and appearance
    /// Corresponds to GET / endpoint
    pub fn info(&self) -> Value {
        info!("INFO");

        json!({
            "apiversion": "1",
            "author": "db3005",
            "color": "#0000FF",
            "head": "pixel",
            "tail": "pixel",
        })
    }

    /// Called when a game starts
    /// Corresponds to POST /start endpoint
    pub fn start(&self, _game: &Game, _turn: &i32, _board: &Board, _you: &Battlesnake) {
        info!("GAME START");
    }

    /// Called when a game ends
    /// Corresponds to POST /end endpoint
    pub fn end(&self, _game: &Game, _turn: &i32, _board: &Board, _you: &Battlesnake) {
        info!("GAME OVER");
    }

    /// Computes and returns the next move using SUCT tree search
    /// Corresponds to POST /move endpoint
    ///
    /// The request is translated into a simulation board, the CPU-bound
    /// search runs on a blocking task with its own transposition table and
    /// RNG, and the handler's async worker just awaits the result. A search
    /// that cannot run (dead snake, panicked task) degrades to the fixed
    /// fallback direction rather than failing the request.
    pub async fn get_move(
        &self,
        game: &Game,
        turn: &i32,
        board: &Board,
        you: &Battlesnake,
    ) -> Value {
        let start_time = Instant::now();

        info!("Turn {}: computing move", turn);

        let sim_board = self.build_board(game, board);

        if !sim_board.contains_snake(&you.id) {
            warn!(
                "Turn {}: our snake '{}' is not alive on the board, answering {}",
                turn,
                you.id,
                FALLBACK_DIRECTION.as_str()
            );
            return json!({ "move": FALLBACK_DIRECTION.as_str() });
        }

        let params = SearchParams {
            compute_time_ms: self.config.timing.effective_budget_ms(),
            exploration_constant: self.config.search.exploration_constant,
            max_iterations: self.config.search.max_iterations,
        };
        let seed = self.config.search.rng_seed;
        let player_id = you.id.clone();

        // One search invocation per request: the transposition table and the
        // RNG are owned by this task, never shared across requests.
        let chosen_move = tokio::task::spawn_blocking(move || {
            let mut search = match seed {
                Some(seed) => SuctSearch::seeded(params, seed),
                None => SuctSearch::new(params),
            };
            search.choose_move(&sim_board, &player_id)
        })
        .await
        .unwrap_or_else(|e| {
            error!("Search task failed: {}, answering fallback", e);
            FALLBACK_DIRECTION
        });

        info!(
            "Turn {}: chose {} (time: {}ms)",
            turn,
            chosen_move.as_str(),
            start_time.elapsed().as_millis()
        );

        self.debug_logger.log_move(*turn, board, chosen_move.as_str());

        json!({ "move": chosen_move.as_str() })
    }

    /// Builds a simulation board from a wire board: flips the y axis,
    /// reverses bodies to tail-first, drops dead snakes, and pulls ruleset
    /// settings out of the request with config defaults for absent fields.
    pub fn build_board(&self, game: &Game, board: &Board) -> simulator::Board {
        let height = board.height;

        let mut snakes: FxHashMap<String, Snake> = FxHashMap::default();
        for snake in &board.snakes {
            if snake.health <= 0 || snake.body.is_empty() {
                continue;
            }

            let body: Vec<Position> = snake
                .body
                .iter()
                .rev()
                .map(|coord| Position {
                    x: coord.x,
                    y: height - 1 - coord.y,
                })
                .collect();

            snakes.insert(snake.id.clone(), Snake::new(body, snake.health));
        }

        let mut food = FoodGrid::empty(board.width as u32, height as u32);
        for coord in &board.food {
            food.place(Position {
                x: coord.x,
                y: height - 1 - coord.y,
            });
        }

        let settings = game.ruleset.get("settings");
        let food_spawn_chance = settings
            .and_then(|s| s.get("foodSpawnChance"))
            .and_then(Value::as_u64)
            .map(|v| v as u32)
            .unwrap_or(self.config.game_rules.default_food_spawn_chance);
        let min_food = settings
            .and_then(|s| s.get("minimumFood"))
            .and_then(Value::as_u64)
            .map(|v| v as u32)
            .unwrap_or(self.config.game_rules.default_min_food);

        let ruleset = Ruleset {
            width: board.width as u32,
            height: height as u32,
            snake_count: snakes.len() as u32,
            min_food,
            food_spawn_chance,
            starting_health: self.config.game_rules.starting_health,
            spawn_food: true,
        };

        simulator::Board::new(snakes, food, ruleset)
    }
}
