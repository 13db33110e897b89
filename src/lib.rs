// Library exports for the SUCT Battlesnake
// This allows the arena driver and the integration tests to use the core logic

pub mod ai;
pub mod bot;
pub mod config;
pub mod debug_logger;
pub mod grid;
pub mod search;
pub mod simulator;
pub mod types;
