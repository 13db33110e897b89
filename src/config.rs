// Configuration module for reading Snake.toml
// Tunable parameters for the server, the search, and the simulation defaults

use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Main configuration structure containing all tunable parameters
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub timing: TimingConfig,
    pub search: SearchConfig,
    pub game_rules: GameRulesConfig,
    pub debug: DebugConfig,
}

/// Timing constants for answering a move request
#[derive(Debug, Deserialize, Clone)]
pub struct TimingConfig {
    pub response_time_budget_ms: u64,
    pub network_overhead_ms: u64,
}

impl TimingConfig {
    /// Computes the wall-clock budget handed to the search: the response
    /// budget minus the slack reserved for network and serialization.
    pub fn effective_budget_ms(&self) -> u64 {
        self.response_time_budget_ms
            .saturating_sub(self.network_overhead_ms)
    }
}

/// Search engine constants
#[derive(Debug, Deserialize, Clone)]
pub struct SearchConfig {
    /// UCB1 exploration constant.
    pub exploration_constant: f32,
    /// Fixed RNG seed for reproducible decisions. Absent in production;
    /// set it to replay a decision deterministically.
    pub rng_seed: Option<u64>,
    /// Optional iteration cap. Pairs with `rng_seed`: a seeded search is
    /// only exactly reproducible when it stops on a count, not on a clock.
    pub max_iterations: Option<u64>,
}

/// Simulation defaults used when the request's ruleset settings are absent
#[derive(Debug, Deserialize, Clone)]
pub struct GameRulesConfig {
    pub starting_health: i32,
    pub default_food_spawn_chance: u32,
    pub default_min_food: u32,
}

/// Debug decision-log configuration
#[derive(Debug, Deserialize, Clone)]
pub struct DebugConfig {
    pub enabled: bool,
    pub log_file_path: String,
}

impl Config {
    /// Loads configuration from a TOML file
    ///
    /// # Arguments
    /// * `path` - Path to the Snake.toml configuration file
    ///
    /// # Returns
    /// * `Result<Config, String>` - Parsed configuration or error message
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, String> {
        let contents = fs::read_to_string(path.as_ref())
            .map_err(|e| format!("Failed to read config file: {}", e))?;

        toml::from_str(&contents).map_err(|e| format!("Failed to parse config file: {}", e))
    }

    /// Loads default configuration from Snake.toml in the project root
    pub fn load_default() -> Result<Self, String> {
        Self::from_file("Snake.toml")
    }

    /// Creates a configuration with hardcoded default values as fallback
    /// This should match the constants defined in Snake.toml
    pub fn default_hardcoded() -> Self {
        Config {
            timing: TimingConfig {
                response_time_budget_ms: 400,
                network_overhead_ms: 100,
            },
            search: SearchConfig {
                exploration_constant: 1.0,
                rng_seed: None,
                max_iterations: None,
            },
            game_rules: GameRulesConfig {
                starting_health: 100,
                default_food_spawn_chance: 15,
                default_min_food: 1,
            },
            debug: DebugConfig {
                enabled: false,
                log_file_path: "battlesnake_debug.jsonl".to_string(),
            },
        }
    }

    /// Attempts to load from file, falls back to hardcoded defaults on error
    pub fn load_or_default() -> Self {
        Self::load_default().unwrap_or_else(|e| {
            eprintln!(
                "Warning: Could not load Snake.toml ({}), using hardcoded defaults",
                e
            );
            Self::default_hardcoded()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effective_budget_calculation() {
        let config = Config::default_hardcoded();
        assert_eq!(config.timing.effective_budget_ms(), 300);
    }

    #[test]
    fn test_effective_budget_never_underflows() {
        let timing = TimingConfig {
            response_time_budget_ms: 50,
            network_overhead_ms: 100,
        };
        assert_eq!(timing.effective_budget_ms(), 0);
    }

    #[test]
    fn test_config_can_be_created() {
        let config = Config::default_hardcoded();
        assert_eq!(config.search.exploration_constant, 1.0);
        assert_eq!(config.search.rng_seed, None);
        assert_eq!(config.game_rules.starting_health, 100);
    }

    #[test]
    fn test_snake_toml_can_be_parsed() {
        // This test ensures Snake.toml is valid and can be parsed
        let result = Config::from_file("Snake.toml");
        assert!(
            result.is_ok(),
            "Failed to parse Snake.toml: {:?}",
            result.err()
        );
    }

    #[test]
    fn test_snake_toml_matches_hardcoded_defaults() {
        let from_file = Config::from_file("Snake.toml").expect("Snake.toml should be parseable");
        let hardcoded = Config::default_hardcoded();

        assert_eq!(
            from_file.timing.response_time_budget_ms,
            hardcoded.timing.response_time_budget_ms
        );
        assert_eq!(
            from_file.search.exploration_constant,
            hardcoded.search.exploration_constant
        );
        assert_eq!(
            from_file.game_rules.default_min_food,
            hardcoded.game_rules.default_min_food
        );
        assert_eq!(from_file.debug.enabled, hardcoded.debug.enabled);
    }

    #[test]
    fn test_missing_config_file_is_an_error() {
        let result = Config::from_file("does-not-exist.toml");
        assert!(result.is_err());
    }
}
