use serde::Deserialize;

use tagarena_core::rules::GameRules;

/// Top-level server configuration, loaded from `tagarena.toml`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen_addr: String,
    /// Gameplay constants. Echoed to every client in the join ack, so a
    /// config change here is a contract change for clients too.
    pub game: GameRules,
    pub limits: LimitsConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8080".to_string(),
            game: GameRules::default(),
            limits: LimitsConfig::default(),
        }
    }
}

/// Infrastructure limits (connection caps, buffer sizes, rate limits).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    pub max_ws_connections: usize,
    /// Outbound frames buffered per player before slow-client drops kick in.
    pub player_message_buffer: usize,
    /// Per-connection inbound message cap. Move updates arrive at client
    /// frame cadence, so this sits well above typical API rates.
    pub ws_rate_limit_per_sec: f64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_ws_connections: 200,
            player_message_buffer: 256,
            ws_rate_limit_per_sec: 120.0,
        }
    }
}

impl ServerConfig {
    /// Validate configuration. Fatal problems are logged and exit the
    /// process; this never returns a broken config to the caller.
    pub fn validate(&self) {
        if self.listen_addr.parse::<std::net::SocketAddr>().is_err() {
            tracing::error!(
                addr = %self.listen_addr,
                "listen_addr is not a valid socket address"
            );
            std::process::exit(1);
        }

        if self.game.round_duration_secs == 0 {
            tracing::error!("game.round_duration_secs must be > 0");
            std::process::exit(1);
        }
        if self.game.tag_radius <= 0.0 || !self.game.tag_radius.is_finite() {
            tracing::error!("game.tag_radius must be a positive number");
            std::process::exit(1);
        }
        if self.game.tag_cooldown_ms == 0 {
            tracing::error!("game.tag_cooldown_ms must be > 0");
            std::process::exit(1);
        }

        if self.limits.max_ws_connections == 0 {
            tracing::error!("limits.max_ws_connections must be > 0");
            std::process::exit(1);
        }
        if self.limits.player_message_buffer == 0 {
            tracing::error!("limits.player_message_buffer must be > 0");
            std::process::exit(1);
        }
        if self.limits.ws_rate_limit_per_sec <= 0.0 {
            tracing::error!("limits.ws_rate_limit_per_sec must be > 0");
            std::process::exit(1);
        }
    }

    /// Load config from `tagarena.toml` if it exists, then apply env var
    /// overrides.
    pub fn load() -> Self {
        let mut config = match std::fs::read_to_string("tagarena.toml") {
            Ok(content) => match toml::from_str::<ServerConfig>(&content) {
                Ok(cfg) => {
                    tracing::info!("Loaded configuration from tagarena.toml");
                    cfg
                },
                Err(e) => {
                    tracing::warn!("Failed to parse tagarena.toml: {e}, using defaults");
                    ServerConfig::default()
                },
            },
            Err(_) => {
                tracing::info!("No tagarena.toml found, using defaults");
                ServerConfig::default()
            },
        };

        if let Ok(addr) = std::env::var("TAGARENA_LISTEN_ADDR")
            && !addr.is_empty()
        {
            config.listen_addr = addr;
        }
        if let Ok(val) = std::env::var("TAGARENA_ROUND_DURATION_SECS")
            && let Ok(n) = val.parse::<u32>()
        {
            config.game.round_duration_secs = n;
        }
        if let Ok(val) = std::env::var("TAGARENA_TAG_RADIUS")
            && let Ok(n) = val.parse::<f32>()
        {
            config.game.tag_radius = n;
        }
        if let Ok(val) = std::env::var("TAGARENA_MAX_WS_CONNECTIONS")
            && let Ok(n) = val.parse::<usize>()
        {
            config.limits.max_ws_connections = n;
        }
        if let Ok(val) = std::env::var("TAGARENA_WS_RATE_LIMIT")
            && let Ok(n) = val.parse::<f64>()
        {
            config.limits.ws_rate_limit_per_sec = n;
        }

        config
    }
}
