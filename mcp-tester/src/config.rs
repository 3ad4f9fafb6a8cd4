//! Application configuration management.
//!
//! Configuration is loaded from a YAML file with environment variable overrides. The configuration
//! file path defaults to `config.yaml` but can be specified via `-f` flag or `MCP_TESTER_CONFIG`
//! environment variable. The file is optional: every field has a default.
//!
//! ## Loading Priority
//!
//! Configuration sources are merged in the following order (later sources override earlier ones):
//!
//! 1. **YAML config file** - Base configuration (default: `config.yaml`)
//! 2. **Environment variables** - Variables prefixed with `MCP_TESTER_` override YAML values
//! 3. **PORT** - Special case: overrides `port` if set, for platforms that assign the port
//!
//! For nested config values, use double underscores in environment variables. For example,
//! `MCP_TESTER_PROBE__FALLBACK_TIMEOUT=5s` sets the `probe.fallback_timeout` field.
//!
//! ## Environment Variable Examples
//!
//! ```bash
//! # Override server port
//! MCP_TESTER_PORT=8080
//!
//! # Restrict browser access to a single origin
//! MCP_TESTER_CORS__ALLOWED_ORIGINS='["https://tester.example.com"]'
//!
//! # Bound every probe request
//! MCP_TESTER_PROBE__REQUEST_TIMEOUT=30s
//! ```

use clap::Parser;
use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};
use serde::{Deserialize, Serialize};
use std::{path::PathBuf, time::Duration};
use url::Url;

use crate::errors::Error;
use crate::probes::ProbeSettings;

/// Simple CLI args - just for specifying config file
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to configuration file
    #[arg(short = 'f', long, env = "MCP_TESTER_CONFIG", default_value = "config.yaml")]
    pub config: String,

    /// Validate configuration and exit without starting the server.
    #[arg(long)]
    pub validate: bool,
}

/// Main application configuration.
///
/// All fields have defaults defined in the `Default` implementation.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// HTTP server host to bind to (e.g., "0.0.0.0" for all interfaces)
    pub host: String,
    /// HTTP server port to bind to
    pub port: u16,
    /// Directory of static assets served at unmatched paths; disabled when unset
    pub static_dir: Option<PathBuf>,
    /// Export spans over OTLP (configured via the standard `OTEL_*` variables)
    pub enable_otel_export: bool,
    pub cors: CorsConfig,
    pub probe: ProbeConfig,
}

/// CORS (Cross-Origin Resource Sharing) configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct CorsConfig {
    /// Allowed origins for CORS requests
    pub allowed_origins: Vec<CorsOrigin>,
    /// Cache preflight requests for this many seconds
    pub max_age: Option<u64>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec![CorsOrigin::Wildcard],
            max_age: Some(3600),
        }
    }
}

/// CORS origin specification.
///
/// Can be either a wildcard (`*`) to allow all origins, or a specific URL.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum CorsOrigin {
    /// Allow all origins (`*`)
    #[serde(deserialize_with = "parse_wildcard")]
    Wildcard,
    /// Specific origin URL (e.g., `https://app.example.com`)
    #[serde(deserialize_with = "parse_url")]
    Url(Url),
}

fn parse_wildcard<'de, D>(deserializer: D) -> Result<(), D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: String = Deserialize::deserialize(deserializer)?;
    if s == "*" {
        Ok(())
    } else {
        Err(serde::de::Error::custom("Expected '*'"))
    }
}

fn parse_url<'de, D>(deserializer: D) -> Result<Url, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: String = Deserialize::deserialize(deserializer)?;
    Url::parse(&s).map_err(serde::de::Error::custom)
}

/// Outbound probe settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProbeConfig {
    /// Timeout of the connectivity GET issued when HEAD is unusable
    #[serde(with = "humantime_serde")]
    pub fallback_timeout: Duration,
    /// Timeout for all other probe requests (unbounded when unset)
    #[serde(with = "humantime_serde")]
    pub request_timeout: Option<Duration>,
    /// User-Agent header sent with every probe request
    pub user_agent: String,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            fallback_timeout: Duration::from_secs(10),
            request_timeout: None,
            user_agent: format!("mcp-tester/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl ProbeConfig {
    pub fn settings(&self) -> ProbeSettings {
        ProbeSettings {
            fallback_timeout: self.fallback_timeout,
            request_timeout: self.request_timeout,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            static_dir: None,
            enable_otel_export: false,
            cors: CorsConfig::default(),
            probe: ProbeConfig::default(),
        }
    }
}

impl Config {
    #[allow(clippy::result_large_err)]
    pub fn load(args: &Args) -> Result<Self, figment::Error> {
        let config: Self = Self::figment(args).extract()?;
        config.validate().map_err(|e| figment::Error::from(e.to_string()))?;
        Ok(config)
    }

    /// Validate the configuration for consistency
    pub fn validate(&self) -> Result<(), Error> {
        if self.cors.allowed_origins.is_empty() {
            return Err(Error::InvalidConfig {
                message: "cors.allowed_origins must list at least one origin (use '*' to allow all)".to_string(),
            });
        }

        if self.probe.fallback_timeout.is_zero() {
            return Err(Error::InvalidConfig {
                message: "probe.fallback_timeout must be greater than zero".to_string(),
            });
        }

        if self.probe.request_timeout.is_some_and(|timeout| timeout.is_zero()) {
            return Err(Error::InvalidConfig {
                message: "probe.request_timeout must be greater than zero when set".to_string(),
            });
        }

        Ok(())
    }

    pub fn figment(args: &Args) -> Figment {
        Figment::new()
            // Load base config file
            .merge(Yaml::file(&args.config))
            // MCP_TESTER_CONFIG names the file itself, not a field
            .merge(Env::prefixed("MCP_TESTER_").split("__").ignore(&["config"]))
            // Platform-assigned port
            .merge(Env::raw().only(&["PORT"]))
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    fn args(config: &str) -> Args {
        Args {
            config: config.to_string(),
            validate: false,
        }
    }

    #[test]
    fn test_defaults_without_config_file() {
        Jail::expect_with(|_jail| {
            let config = Config::load(&args("missing.yaml"))?;

            assert_eq!(config.bind_address(), "0.0.0.0:3000");
            assert_eq!(config.static_dir, None);
            assert!(!config.enable_otel_export);
            assert_eq!(config.cors.allowed_origins, vec![CorsOrigin::Wildcard]);
            assert_eq!(config.cors.max_age, Some(3600));
            assert_eq!(config.probe.fallback_timeout, Duration::from_secs(10));
            assert_eq!(config.probe.request_timeout, None);
            assert!(config.probe.user_agent.starts_with("mcp-tester/"));

            Ok(())
        });
    }

    #[test]
    fn test_yaml_values() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "test.yaml",
                r#"
host: 127.0.0.1
port: 8080
static_dir: /srv/mcp-tester/public
cors:
  allowed_origins:
    - "https://tester.example.com"
    - "*"
  max_age: 60
probe:
  fallback_timeout: 2s
  request_timeout: 1m
  user_agent: custom-agent
"#,
            )?;

            let config = Config::load(&args("test.yaml"))?;

            assert_eq!(config.bind_address(), "127.0.0.1:8080");
            assert_eq!(config.static_dir, Some(PathBuf::from("/srv/mcp-tester/public")));
            assert_eq!(
                config.cors.allowed_origins,
                vec![
                    CorsOrigin::Url(Url::parse("https://tester.example.com").unwrap()),
                    CorsOrigin::Wildcard
                ]
            );
            assert_eq!(config.cors.max_age, Some(60));
            assert_eq!(
                config.probe.settings(),
                ProbeSettings {
                    fallback_timeout: Duration::from_secs(2),
                    request_timeout: Some(Duration::from_secs(60)),
                }
            );
            assert_eq!(config.probe.user_agent, "custom-agent");

            Ok(())
        });
    }

    #[test]
    fn test_env_override() {
        Jail::expect_with(|jail| {
            jail.create_file("test.yaml", "host: 10.0.0.1\nport: 4000\n")?;

            jail.set_env("MCP_TESTER_HOST", "127.0.0.1");
            jail.set_env("MCP_TESTER_PROBE__FALLBACK_TIMEOUT", "5s");
            jail.set_env("MCP_TESTER_CONFIG", "test.yaml");

            let config = Config::load(&args("test.yaml"))?;

            assert_eq!(config.host, "127.0.0.1");
            // YAML values should be preserved
            assert_eq!(config.port, 4000);
            assert_eq!(config.probe.fallback_timeout, Duration::from_secs(5));

            Ok(())
        });
    }

    #[test]
    fn test_raw_port_wins() {
        Jail::expect_with(|jail| {
            jail.set_env("MCP_TESTER_PORT", "4000");
            jail.set_env("PORT", "5000");

            let config = Config::load(&args("missing.yaml"))?;
            assert_eq!(config.port, 5000);

            Ok(())
        });
    }

    #[test]
    fn test_unknown_fields_rejected() {
        Jail::expect_with(|jail| {
            jail.create_file("test.yaml", "probe:\n  retries: 3\n")?;

            assert!(Config::load(&args("test.yaml")).is_err());

            Ok(())
        });
    }

    #[test]
    fn test_invalid_cors_origin_rejected() {
        Jail::expect_with(|jail| {
            jail.create_file("test.yaml", "cors:\n  allowed_origins: [\"not a url\"]\n")?;

            assert!(Config::load(&args("test.yaml")).is_err());

            Ok(())
        });
    }

    #[test]
    fn test_validation() {
        let mut config = Config::default();
        assert!(config.validate().is_ok());

        config.cors.allowed_origins.clear();
        assert!(matches!(config.validate(), Err(Error::InvalidConfig { .. })));

        let mut config = Config::default();
        config.probe.fallback_timeout = Duration::ZERO;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.probe.request_timeout = Some(Duration::ZERO);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_errors_surface_from_load() {
        Jail::expect_with(|jail| {
            jail.create_file("test.yaml", "probe:\n  fallback_timeout: 0s\n")?;

            let err = Config::load(&args("test.yaml")).unwrap_err();
            assert!(err.to_string().contains("fallback_timeout"));

            Ok(())
        });
    }
}
