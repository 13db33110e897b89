// Arena driver: runs full self-played games between SUCT players with
// different exploration constants and tallies the winners.
//
// Usage: arena [rounds] [budget_ms]

use std::collections::BTreeMap;
use std::env;

use fxhash::FxHashMap;
use rand::rngs::SmallRng;
use rand::SeedableRng;

use suct_battlesnake::search::{SearchParams, SuctSearch};
use suct_battlesnake::simulator::{Board, Direction, FoodGrid, Position, Ruleset, Snake};

const PLAYERS: [(&str, f32); 4] = [("a", 0.25), ("b", 0.50), ("c", 0.75), ("d", 1.00)];

fn starting_board() -> Board {
    let ruleset = Ruleset {
        snake_count: PLAYERS.len() as u32,
        ..Ruleset::default()
    };

    let corners = [
        Position { x: 1, y: 1 },
        Position { x: 1, y: 9 },
        Position { x: 9, y: 1 },
        Position { x: 9, y: 9 },
    ];

    let mut snakes: FxHashMap<String, Snake> = FxHashMap::default();
    for ((id, _), corner) in PLAYERS.iter().zip(corners) {
        snakes.insert(
            id.to_string(),
            Snake::stacked(corner, 3, ruleset.starting_health),
        );
    }

    let food = FoodGrid::empty(ruleset.width, ruleset.height);
    Board::new(snakes, food, ruleset)
}

fn main() {
    env_logger::init();

    let mut args = env::args().skip(1);
    let rounds: u32 = args
        .next()
        .and_then(|arg| arg.parse().ok())
        .unwrap_or(10);
    let budget_ms: u64 = args
        .next()
        .and_then(|arg| arg.parse().ok())
        .unwrap_or(50);

    let mut win_counts: BTreeMap<String, u32> = BTreeMap::new();
    let mut rng = SmallRng::from_os_rng();

    for round in 0..rounds {
        println!("ROUND {} START", round);
        let mut board = starting_board();

        while !board.is_game_over() {
            let mut moves: FxHashMap<String, Direction> = FxHashMap::default();
            for (id, exploration_constant) in PLAYERS {
                if !board.contains_snake(id) {
                    continue;
                }

                let params = SearchParams {
                    compute_time_ms: budget_ms,
                    exploration_constant,
                    max_iterations: None,
                };
                let mut search = SuctSearch::new(params);
                moves.insert(id.to_string(), search.choose_move(&board, id));
            }

            board.update(&moves, &mut rng);
        }

        print!("{}", board.render());
        match board.get_winner() {
            Some(winner) => {
                println!("ROUND {} WINNER: {}", round, winner);
                *win_counts.entry(winner.to_string()).or_insert(0) += 1;
            }
            None => println!("ROUND {} DRAW", round),
        }
    }

    println!();
    for (id, wins) in &win_counts {
        println!("{}: {} / {}", id, wins, rounds);
    }
}
