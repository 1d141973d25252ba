use std::path::PathBuf;
use std::str::FromStr;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{var} has invalid value '{value}'")]
    Invalid { var: &'static str, value: String },
}

/// Client configuration loaded from environment variables.
///
/// All fields have defaults suitable for a local development server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Base URL of the platform API (default: `http://localhost:3000`).
    pub api_url: String,
    /// Directory holding persisted store slots (default: `.genpanel`).
    pub state_dir: PathBuf,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Route the panel believes it is on (default: `/`).
    pub route: String,
    /// Treat the viewport as compact (default: `false`).
    pub compact_viewport: bool,
    /// Emit logs as JSON lines (default: `false`).
    pub log_json: bool,
}

impl ClientConfig {
    /// Load configuration from the process environment.
    ///
    /// | Env Var                | Default                 |
    /// |------------------------|-------------------------|
    /// | `GENPANEL_API_URL`     | `http://localhost:3000` |
    /// | `GENPANEL_STATE_DIR`   | `.genpanel`             |
    /// | `REQUEST_TIMEOUT_SECS` | `30`                    |
    /// | `GENPANEL_ROUTE`       | `/`                     |
    /// | `GENPANEL_COMPACT`     | `false`                 |
    /// | `LOG_FORMAT`           | `text` (`json` for JSON)|
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let string = |var: &str, default: &str| lookup(var).unwrap_or_else(|| default.to_string());

        Ok(Self {
            api_url: string("GENPANEL_API_URL", "http://localhost:3000"),
            state_dir: PathBuf::from(string("GENPANEL_STATE_DIR", ".genpanel")),
            request_timeout_secs: parse(&lookup, "REQUEST_TIMEOUT_SECS", 30)?,
            route: string("GENPANEL_ROUTE", "/"),
            compact_viewport: parse(&lookup, "GENPANEL_COMPACT", false)?,
            log_json: string("LOG_FORMAT", "text").eq_ignore_ascii_case("json"),
        })
    }
}

fn parse<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(var) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { var, value }),
    }
}
