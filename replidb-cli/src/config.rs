//! Application configuration
//!
//! Loaded from YAML. Without `--config` the file is
//! `configs/config.<APP_ENV>.yaml` (APP_ENV defaults to `dev`).
//! `.env` files are applied first, and `HTTP_PORT` overrides `http.port`.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use replidb_core::Topology;
use replidb_server::OrchestratorConfig;
use serde::Deserialize;
use tracing::debug;

const DEFAULT_HTTP_PORT: u16 = 8080;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub http: HttpConfig,
    pub database: Topology,
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_HTTP_PORT,
        }
    }
}

/// Load `.env` from the current directory if present.
///
/// dotenvy never overwrites variables that are already set.
pub fn load_dotenv() {
    match dotenvy::dotenv() {
        Ok(path) => debug!("Loaded .env from {}", path.display()),
        Err(e) if e.not_found() => {}
        Err(e) => debug!("Failed to load .env: {}", e),
    }
}

/// Pick the config file: explicit path, else one derived from APP_ENV.
pub fn resolve_path(explicit: Option<PathBuf>, app_env: Option<String>) -> PathBuf {
    explicit.unwrap_or_else(|| {
        let env = app_env
            .filter(|env| !env.is_empty())
            .unwrap_or_else(|| "dev".to_string());
        PathBuf::from(format!("configs/config.{}.yaml", env))
    })
}

impl AppConfig {
    /// Read, parse, then apply environment overrides.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config = Self::parse(&raw)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        config.with_port_override(std::env::var("HTTP_PORT").ok())
    }

    fn parse(raw: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(raw)?;
        config.database.validate()?;
        Ok(config)
    }

    fn with_port_override(mut self, port: Option<String>) -> Result<Self> {
        if let Some(port) = port {
            self.http.port = port
                .parse()
                .with_context(|| format!("HTTP_PORT is not a valid port: {}", port))?;
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = r#"
http:
  port: 9090
database:
  master: "db-primary:3306"
  slaves:
    - "db-replica-1:3306"
    - "db-replica-2:3306"
  username: app
  password: secret
  database: appdb
  max_conns: 20
  max_idle: 5
orchestrator:
  url: "http://orc:3000/api/clusters"
"#;

    #[test]
    fn explicit_path_wins() {
        let path = resolve_path(Some(PathBuf::from("/etc/replidb.yaml")), Some("prod".into()));
        assert_eq!(path, PathBuf::from("/etc/replidb.yaml"));
    }

    #[test]
    fn app_env_selects_file() {
        assert_eq!(
            resolve_path(None, Some("prod".into())),
            PathBuf::from("configs/config.prod.yaml")
        );
        assert_eq!(
            resolve_path(None, None),
            PathBuf::from("configs/config.dev.yaml")
        );
        assert_eq!(
            resolve_path(None, Some(String::new())),
            PathBuf::from("configs/config.dev.yaml")
        );
    }

    #[test]
    fn parses_legacy_yaml() {
        let config = AppConfig::parse(SAMPLE).unwrap();
        assert_eq!(config.http.port, 9090);
        assert_eq!(config.database.primary, "db-primary:3306");
        assert_eq!(config.database.replicas.len(), 2);
        assert_eq!(config.database.max_open, 20);
        assert_eq!(config.orchestrator.url, "http://orc:3000/api/clusters");
        assert_eq!(config.orchestrator.timeout_secs, 5);
    }

    #[test]
    fn missing_sections_use_defaults() {
        let raw = r#"
database:
  primary: "db:3306"
  username: app
  password: ""
  database: appdb
  max_open: 4
  max_idle: 1
"#;
        let config = AppConfig::parse(raw).unwrap();
        assert_eq!(config.http.port, DEFAULT_HTTP_PORT);
        assert!(config.database.replicas.is_empty());
        assert_eq!(config.orchestrator.url, "http://orchestrator:3000/api/clusters");
    }

    #[test]
    fn port_override_applies() {
        let config = AppConfig::parse(SAMPLE)
            .unwrap()
            .with_port_override(Some("7000".into()))
            .unwrap();
        assert_eq!(config.http.port, 7000);

        let err = AppConfig::parse(SAMPLE)
            .unwrap()
            .with_port_override(Some("not-a-port".into()))
            .unwrap_err();
        assert!(err.to_string().contains("HTTP_PORT"));
    }

    #[test]
    fn load_errors_name_the_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "database: [not, a, mapping]").unwrap();

        let err = AppConfig::load(file.path()).unwrap_err();
        assert!(err.to_string().contains(&file.path().display().to_string()));

        let err = AppConfig::load(Path::new("/nonexistent/config.yaml")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/config.yaml"));
    }
}
