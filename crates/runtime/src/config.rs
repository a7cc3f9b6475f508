//! Runtime configuration structures and loaders.
use std::env;
use std::time::Duration;

use warren_core::GameConfig;

/// Configuration required to run the game service and its transport.
#[derive(Clone, Debug)]
pub struct RuntimeConfig {
    /// WebSocket listen port.
    pub listen_port: u16,
    /// Master RNG seed. Every per-level seed derives from this value, so a
    /// fixed seed reproduces the whole dungeon.
    pub master_seed: u64,
    /// How long a human turn may block before it is forced to a Wait.
    pub human_turn_timeout: Duration,
    /// Poll interval while an instance's queue is empty.
    pub idle_poll: Duration,
    /// Buffered responses per observer channel before sends are dropped.
    pub observer_buffer: usize,
    pub game: GameConfig,
}

impl RuntimeConfig {
    pub const DEFAULT_PORT: u16 = 8080;
    pub const DEFAULT_TURN_TIMEOUT_SECS: u64 = 30;
    pub const DEFAULT_OBSERVER_BUFFER: usize = 32;

    /// Construct configuration from process environment variables.
    ///
    /// Environment variables:
    /// - `PORT` - WebSocket listen port (default: 8080)
    /// - `SEED` - master RNG seed (default: entropy-derived; set explicitly
    ///   for reproducible runs)
    /// - `TURN_TIMEOUT_SECS` - human turn timeout (default: 30)
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(port) = read_env::<u16>("PORT") {
            config.listen_port = port;
        }
        match read_env::<u64>("SEED") {
            Some(seed) => config.master_seed = seed,
            None => {
                tracing::warn!(
                    seed = config.master_seed,
                    "SEED not set; using entropy-derived seed (runs will not be reproducible)"
                );
            }
        }
        if let Some(secs) = read_env::<u64>("TURN_TIMEOUT_SECS") {
            config.human_turn_timeout = Duration::from_secs(secs.max(1));
        }

        config
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            listen_port: Self::DEFAULT_PORT,
            master_seed: rand::random(),
            human_turn_timeout: Duration::from_secs(Self::DEFAULT_TURN_TIMEOUT_SECS),
            idle_poll: Duration::from_millis(100),
            observer_buffer: Self::DEFAULT_OBSERVER_BUFFER,
            game: GameConfig::default(),
        }
    }
}

fn read_env<T: std::str::FromStr>(key: &str) -> Option<T> {
    let raw = env::var(key).ok()?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(key, value = %raw, "ignoring unparsable environment variable");
            None
        }
    }
}
