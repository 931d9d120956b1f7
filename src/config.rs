// Application configuration, loaded from environment variables and CLI flags.

use std::time::Duration;

use crate::provider::DEFAULT_BASE_URL;
use crate::selector::{CandidateOrder, SelectionSettings, DEFAULT_FETCH_BUDGET, DEFAULT_MAX_MOVES};

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Database URL (SQLite connection string).
    pub database_url: String,
    /// Port to bind the HTTP server to.
    pub port: u16,
    /// Base URL of the creature/move provider, without trailing slash.
    pub provider_base_url: String,
    /// Per-request timeout for provider calls.
    pub provider_timeout: Duration,
    /// Upper bound on one synchronization as seen by an HTTP caller.
    pub sync_timeout: Duration,
    /// Move selection knobs.
    pub selection: SelectionSettings,
    /// Identifiers resolved once at startup.
    pub prefetch: Vec<String>,
}

impl Config {
    /// Load configuration from environment variables and CLI arguments.
    ///
    /// Environment variables:
    /// - `DATABASE_URL` - SQLite connection string (default: `sqlite:pokedex.db?mode=rwc`)
    /// - `PORT` - HTTP server port (default: 3000)
    /// - `PROVIDER_BASE_URL` - provider API root (default: `https://pokeapi.co/api/v2`)
    /// - `PROVIDER_TIMEOUT_SECS` - provider request timeout (default: 10)
    /// - `SYNC_TIMEOUT_SECS` - per-request synchronization timeout (default: 30)
    /// - `MOVE_FETCH_BUDGET` - provider move lookups per synchronization (default: 8)
    /// - `MAX_MOVES` - moves linked per creature (default and ceiling: 4)
    /// - `MOVE_SHUFFLE_SEED` - fixed seed for candidate shuffling
    /// - `PREFETCH` - comma-separated identifiers to resolve at startup
    ///
    /// CLI flags:
    /// - `--port <PORT>` - Override the port
    /// - `--prefetch <IDS>` - Override `PREFETCH`
    pub fn load() -> Self {
        let args: Vec<String> = std::env::args().collect();
        Self::from_sources(&args, |key| std::env::var(key).ok())
    }

    /// Build a config from CLI args and an environment lookup.
    pub fn from_sources(args: &[String], env: impl Fn(&str) -> Option<String>) -> Self {
        let database_url =
            env("DATABASE_URL").unwrap_or_else(|| "sqlite:pokedex.db?mode=rwc".to_string());

        // Port: CLI flag --port takes precedence, then env var, then default
        let port = Self::parse_cli_value(args, "--port")
            .and_then(|v| v.parse().ok())
            .or_else(|| env("PORT").and_then(|v| v.parse().ok()))
            .unwrap_or(3000);

        let provider_base_url = env("PROVIDER_BASE_URL")
            .map(|v| v.trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        let secs = |key: &str, default: u64| {
            Duration::from_secs(env(key).and_then(|v| v.parse().ok()).unwrap_or(default))
        };
        let provider_timeout = secs("PROVIDER_TIMEOUT_SECS", 10);
        let sync_timeout = secs("SYNC_TIMEOUT_SECS", 30);

        let fetch_budget = env("MOVE_FETCH_BUDGET")
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_FETCH_BUDGET);
        let max_moves = env("MAX_MOVES")
            .and_then(|v| v.parse::<usize>().ok())
            .map_or(DEFAULT_MAX_MOVES, |n| n.min(DEFAULT_MAX_MOVES));
        let order = env("MOVE_SHUFFLE_SEED")
            .and_then(|v| v.parse().ok())
            .map(CandidateOrder::Seeded)
            .unwrap_or(CandidateOrder::Shuffled);

        let prefetch = Self::parse_cli_value(args, "--prefetch")
            .or_else(|| env("PREFETCH"))
            .map(|v| Self::split_list(&v))
            .unwrap_or_default();

        Config {
            database_url,
            port,
            provider_base_url,
            provider_timeout,
            sync_timeout,
            selection: SelectionSettings {
                max_moves,
                fetch_budget,
                order,
            },
            prefetch,
        }
    }

    /// Parse a CLI flag value like `--port 8080`.
    fn parse_cli_value(args: &[String], flag: &str) -> Option<String> {
        args.windows(2).find_map(|pair| {
            if pair[0] == flag {
                Some(pair[1].clone())
            } else {
                None
            }
        })
    }

    fn split_list(value: &str) -> Vec<String> {
        value
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }
}
