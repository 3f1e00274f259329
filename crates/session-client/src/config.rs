//! Client configuration.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Default API base URL.
pub const DEFAULT_API_URL: &str = "http://127.0.0.1:8790";

/// Configuration for the session client.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Base URL of the plans API.
    pub api_url: String,

    /// Where the session is persisted between runs.
    pub session_file: PathBuf,

    /// Wait before the route guard validates a stored token.
    pub validation_delay: Duration,

    /// Validation calls allowed per mount.
    pub max_validation_attempts: u8,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            session_file: PathBuf::from(".session.json"),
            validation_delay: Duration::from_millis(100),
            max_validation_attempts: 3,
        }
    }
}

impl SessionConfig {
    /// Create configuration from environment variables.
    ///
    /// Optional environment variables:
    /// - `PLANS_API_URL` - API base URL (default: http://127.0.0.1:8790)
    /// - `SESSION_FILE` - persisted session path (default: .session.json)
    /// - `GUARD_VALIDATION_DELAY_MS` - delay before validation (default: 100)
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            api_url: env::var("PLANS_API_URL").unwrap_or(defaults.api_url),
            session_file: env::var("SESSION_FILE")
                .map(PathBuf::from)
                .unwrap_or(defaults.session_file),
            validation_delay: env::var("GUARD_VALIDATION_DELAY_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_millis)
                .unwrap_or(defaults.validation_delay),
            max_validation_attempts: defaults.max_validation_attempts,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn test_from_env() {
        let _guard = ENV_LOCK.lock().unwrap();

        env::set_var("PLANS_API_URL", "https://plans.example.com");
        env::set_var("GUARD_VALIDATION_DELAY_MS", "250");
        env::remove_var("SESSION_FILE");

        let config = SessionConfig::from_env();
        assert_eq!(config.api_url, "https://plans.example.com");
        assert_eq!(config.validation_delay, Duration::from_millis(250));
        assert_eq!(config.session_file, PathBuf::from(".session.json"));
        assert_eq!(config.max_validation_attempts, 3);

        env::set_var("GUARD_VALIDATION_DELAY_MS", "soon");
        assert_eq!(
            SessionConfig::from_env().validation_delay,
            Duration::from_millis(100)
        );

        env::remove_var("PLANS_API_URL");
        env::remove_var("GUARD_VALIDATION_DELAY_MS");
    }
}
