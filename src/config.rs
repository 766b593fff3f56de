use std::env;
use std::net::SocketAddr;

use crate::auth::signature::{DEFAULT_CLOCK_SKEW_SECS, DEFAULT_REPLAY_WINDOW_SECS};

/// Variable holding the expected bearer token for the orchestrator surface.
pub const BEARER_TOKEN_VAR: &str = "ORCHESTRATOR_BEARER_TOKEN";

/// Upper bound for the clock skew and replay windows (one day).
pub const MAX_WINDOW_SECS: u64 = 86_400;

/// Default name of the variable holding the service HMAC secret.
pub const DEFAULT_SERVICE_SECRET_ENV: &str = "RBAC_SECRET";

#[derive(Clone)]
pub struct Config {
    // Server
    pub bind_addr: SocketAddr,

    // Bearer surface
    pub bearer_token: Option<String>,

    // Signature surface
    pub service_secret_env: String,
    pub service_secret: Option<String>,
    pub clock_skew_secs: u64,
    pub replay_window_secs: u64,

    // Limits
    pub max_body_bytes: usize,

    // Background sweep (0 disables)
    pub replay_sweep_interval_secs: u64,

    // CORS
    pub allowed_origins: Vec<String>,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("bind_addr", &self.bind_addr)
            .field("bearer_token", &self.bearer_token.as_ref().map(|_| "[REDACTED]"))
            .field("service_secret_env", &self.service_secret_env)
            .field(
                "service_secret",
                &self.service_secret.as_ref().map(|_| "[REDACTED]"),
            )
            .field("clock_skew_secs", &self.clock_skew_secs)
            .field("replay_window_secs", &self.replay_window_secs)
            .field("max_body_bytes", &self.max_body_bytes)
            .field("replay_sweep_interval_secs", &self.replay_sweep_interval_secs)
            .field("allowed_origins", &self.allowed_origins)
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            bearer_token: None,
            service_secret_env: DEFAULT_SERVICE_SECRET_ENV.to_string(),
            service_secret: None,
            clock_skew_secs: DEFAULT_CLOCK_SKEW_SECS,
            replay_window_secs: DEFAULT_REPLAY_WINDOW_SECS,
            max_body_bytes: 1_048_576,
            replay_sweep_interval_secs: 60,
            allowed_origins: Vec::new(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),

    #[error("Failed to parse {0}: {1}")]
    ParseError(String, String),
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// Secrets are optional here: a missing secret leaves the matching surface
    /// answering 500 until it is configured.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Attempt to load .env file, but don't fail if it doesn't exist
        // (env vars may be set directly in production)
        let _ = dotenvy::dotenv();

        let defaults = Config::default();

        // Server
        let bind_addr_str = env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());
        let bind_addr = bind_addr_str
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::ParseError("BIND_ADDR".to_string(), e.to_string()))?;

        // Secrets
        let bearer_token = non_empty_var(BEARER_TOKEN_VAR);

        let service_secret_env = env::var("SERVICE_SECRET_ENV")
            .unwrap_or_else(|_| DEFAULT_SERVICE_SECRET_ENV.to_string());
        if service_secret_env.is_empty() || service_secret_env.contains('=') {
            return Err(ConfigError::InvalidValue(
                "SERVICE_SECRET_ENV".to_string(),
                "must be a non-empty variable name".to_string(),
            ));
        }
        let service_secret = non_empty_var(&service_secret_env);

        // Windows
        let clock_skew_secs = parse_env_or_default("CLOCK_SKEW_SECS", defaults.clock_skew_secs)?;
        let replay_window_secs =
            parse_env_or_default("REPLAY_WINDOW_SECS", defaults.replay_window_secs)?;

        for (key, value) in [
            ("CLOCK_SKEW_SECS", clock_skew_secs),
            ("REPLAY_WINDOW_SECS", replay_window_secs),
        ] {
            if value > MAX_WINDOW_SECS {
                return Err(ConfigError::InvalidValue(
                    key.to_string(),
                    format!("must be at most {} seconds", MAX_WINDOW_SECS),
                ));
            }
        }

        // A replay window shorter than the skew window lets a captured request
        // be replayed once its replay entry expires but its timestamp is still fresh.
        if replay_window_secs < clock_skew_secs {
            tracing::warn!(
                replay_window_secs,
                clock_skew_secs,
                "REPLAY_WINDOW_SECS is shorter than CLOCK_SKEW_SECS"
            );
        }

        // Limits
        let max_body_bytes = parse_env_or_default("MAX_BODY_BYTES", defaults.max_body_bytes)?;
        if max_body_bytes == 0 {
            return Err(ConfigError::InvalidValue(
                "MAX_BODY_BYTES".to_string(),
                "must be greater than zero".to_string(),
            ));
        }

        let replay_sweep_interval_secs = parse_env_or_default(
            "REPLAY_SWEEP_INTERVAL_SECS",
            defaults.replay_sweep_interval_secs,
        )?;

        // CORS
        let allowed_origins: Vec<String> = env::var("ALLOWED_ORIGINS")
            .unwrap_or_default()
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        Ok(Config {
            bind_addr,
            bearer_token,
            service_secret_env,
            service_secret,
            clock_skew_secs,
            replay_window_secs,
            max_body_bytes,
            replay_sweep_interval_secs,
            allowed_origins,
        })
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.is_empty())
}

/// Helper function to parse environment variable with a default value
fn parse_env_or_default<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(val) => val
            .parse::<T>()
            .map_err(|e| ConfigError::ParseError(key.to_string(), format!("{}: {}", e, val))),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Use a mutex to ensure tests run serially since they modify global env vars.
    // unwrap_or_else handles poison from prior panics.
    static TEST_MUTEX: Mutex<()> = Mutex::new(());

    fn lock_test() -> std::sync::MutexGuard<'static, ()> {
        TEST_MUTEX.lock().unwrap_or_else(|e| e.into_inner())
    }

    // Set to empty rather than removed so a local .env cannot refill them
    // (dotenvy doesn't override existing vars).
    fn clear_test_env() {
        env::set_var("BIND_ADDR", "0.0.0.0:8080");
        env::set_var(BEARER_TOKEN_VAR, "");
        env::remove_var("SERVICE_SECRET_ENV");
        env::set_var("RBAC_SECRET", "");
        env::remove_var("TEST_ALT_SECRET");
        env::remove_var("CLOCK_SKEW_SECS");
        env::remove_var("REPLAY_WINDOW_SECS");
        env::remove_var("MAX_BODY_BYTES");
        env::remove_var("REPLAY_SWEEP_INTERVAL_SECS");
        env::remove_var("ALLOWED_ORIGINS");
    }

    #[test]
    fn test_parse_env_or_default() {
        let _guard = lock_test();

        env::set_var("TEST_U64", "12345");
        let result: Result<u64, ConfigError> = parse_env_or_default("TEST_U64", 100);
        assert_eq!(result.unwrap(), 12345);

        env::remove_var("TEST_U64");
        let result: Result<u64, ConfigError> = parse_env_or_default("TEST_U64", 100);
        assert_eq!(result.unwrap(), 100);
    }

    #[test]
    fn test_config_defaults() {
        let _guard = lock_test();
        clear_test_env();

        let config = Config::from_env().unwrap();

        assert_eq!(config.bind_addr.to_string(), "0.0.0.0:8080");
        assert_eq!(config.bearer_token, None);
        assert_eq!(config.service_secret_env, "RBAC_SECRET");
        assert_eq!(config.service_secret, None);
        assert_eq!(config.clock_skew_secs, 300);
        assert_eq!(config.replay_window_secs, 300);
        assert_eq!(config.max_body_bytes, 1_048_576);
        assert_eq!(config.replay_sweep_interval_secs, 60);
        assert!(config.allowed_origins.is_empty());

        clear_test_env();
    }

    #[test]
    fn test_secrets_loaded() {
        let _guard = lock_test();
        clear_test_env();

        env::set_var(BEARER_TOKEN_VAR, "token-123");
        env::set_var("RBAC_SECRET", "super-secret");

        let config = Config::from_env().unwrap();
        assert_eq!(config.bearer_token.as_deref(), Some("token-123"));
        assert_eq!(config.service_secret.as_deref(), Some("super-secret"));

        clear_test_env();
    }

    #[test]
    fn test_service_secret_env_redirects_lookup() {
        let _guard = lock_test();
        clear_test_env();

        env::set_var("SERVICE_SECRET_ENV", "TEST_ALT_SECRET");
        env::set_var("TEST_ALT_SECRET", "alt-secret");
        env::set_var("RBAC_SECRET", "ignored");

        let config = Config::from_env().unwrap();
        assert_eq!(config.service_secret_env, "TEST_ALT_SECRET");
        assert_eq!(config.service_secret.as_deref(), Some("alt-secret"));

        clear_test_env();
    }

    #[test]
    fn test_invalid_service_secret_env() {
        let _guard = lock_test();
        clear_test_env();

        env::set_var("SERVICE_SECRET_ENV", "");

        let result = Config::from_env();
        assert!(matches!(
            result.unwrap_err(),
            ConfigError::InvalidValue(ref s, _) if s == "SERVICE_SECRET_ENV"
        ));

        clear_test_env();
    }

    #[test]
    fn test_invalid_socket_addr() {
        let _guard = lock_test();
        clear_test_env();

        env::set_var("BIND_ADDR", "invalid_address");

        let result = Config::from_env();
        assert!(matches!(result.unwrap_err(), ConfigError::ParseError(_, _)));

        clear_test_env();
    }

    #[test]
    fn test_invalid_window() {
        let _guard = lock_test();
        clear_test_env();

        env::set_var("CLOCK_SKEW_SECS", "-5");

        let result = Config::from_env();
        assert!(matches!(
            result.unwrap_err(),
            ConfigError::ParseError(ref s, _) if s == "CLOCK_SKEW_SECS"
        ));

        clear_test_env();
    }

    #[test]
    fn test_window_above_ceiling_rejected() {
        let _guard = lock_test();
        clear_test_env();

        env::set_var("REPLAY_WINDOW_SECS", u64::MAX.to_string());
        let result = Config::from_env();
        assert!(matches!(
            result.unwrap_err(),
            ConfigError::InvalidValue(ref s, _) if s == "REPLAY_WINDOW_SECS"
        ));

        clear_test_env();
        env::set_var("CLOCK_SKEW_SECS", (MAX_WINDOW_SECS + 1).to_string());
        let result = Config::from_env();
        assert!(matches!(
            result.unwrap_err(),
            ConfigError::InvalidValue(ref s, _) if s == "CLOCK_SKEW_SECS"
        ));

        clear_test_env();
        env::set_var("CLOCK_SKEW_SECS", MAX_WINDOW_SECS.to_string());
        env::set_var("REPLAY_WINDOW_SECS", MAX_WINDOW_SECS.to_string());
        let config = Config::from_env().unwrap();
        assert_eq!(config.replay_window_secs, MAX_WINDOW_SECS);

        clear_test_env();
    }

    #[test]
    fn test_custom_windows() {
        let _guard = lock_test();
        clear_test_env();

        env::set_var("CLOCK_SKEW_SECS", "60");
        env::set_var("REPLAY_WINDOW_SECS", "120");
        env::set_var("REPLAY_SWEEP_INTERVAL_SECS", "0");

        let config = Config::from_env().unwrap();
        assert_eq!(config.clock_skew_secs, 60);
        assert_eq!(config.replay_window_secs, 120);
        assert_eq!(config.replay_sweep_interval_secs, 0);

        clear_test_env();
    }

    #[test]
    fn test_zero_body_limit_rejected() {
        let _guard = lock_test();
        clear_test_env();

        env::set_var("MAX_BODY_BYTES", "0");

        let result = Config::from_env();
        assert!(matches!(
            result.unwrap_err(),
            ConfigError::InvalidValue(ref s, _) if s == "MAX_BODY_BYTES"
        ));

        clear_test_env();
    }

    #[test]
    fn test_allowed_origins_parsing() {
        let _guard = lock_test();
        clear_test_env();

        env::set_var(
            "ALLOWED_ORIGINS",
            "https://a.example.com, https://b.example.com ,",
        );

        let config = Config::from_env().unwrap();
        assert_eq!(
            config.allowed_origins,
            vec!["https://a.example.com", "https://b.example.com"]
        );

        clear_test_env();
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let config = Config {
            bearer_token: Some("token-123".to_string()),
            service_secret: Some("super-secret".to_string()),
            ..Config::default()
        };

        let debug = format!("{:?}", config);
        assert!(debug.contains("RBAC_SECRET"));
        assert!(!debug.contains("token-123"));
        assert!(!debug.contains("super-secret"));
    }
}
