//! HTTP server wiring for Aula.
//!
//! Loads [`ServerConfig`], builds the [`Allocator`] it describes, and mounts
//! the JSON API behind a request-tracing layer.

use std::{
  path::{Path, PathBuf},
  sync::Arc,
  time::Duration,
};

use aula_core::{
  Allocator,
  legacy::{DEFAULT_LEGACY_TAGS, ProgramMatcher},
  store::SlotStore,
};
use axum::Router;
use serde::Deserialize;
use tower_http::trace::TraceLayer;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and `AULA_*`
/// environment variables.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:                String,
  #[serde(default = "default_port")]
  pub port:                u16,
  #[serde(default = "default_store_path")]
  pub store_path:          PathBuf,
  /// Group program tags that count as "no program". Empty tags always do.
  #[serde(default = "default_legacy_tags")]
  pub legacy_program_tags: Vec<String>,
  /// Upper bound for each store read, in milliseconds. Unbounded if unset.
  #[serde(default)]
  pub read_timeout_ms:     Option<u64>,
}

fn default_host() -> String { "127.0.0.1".to_string() }

fn default_port() -> u16 { 8080 }

fn default_store_path() -> PathBuf { PathBuf::from("aula.db") }

fn default_legacy_tags() -> Vec<String> {
  DEFAULT_LEGACY_TAGS.iter().map(|t| (*t).to_string()).collect()
}

impl ServerConfig {
  /// Read `path` (optional) overlaid with `AULA_*` environment variables.
  pub fn load(path: &Path) -> Result<Self, config::ConfigError> {
    config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(
        config::Environment::with_prefix("AULA")
          .try_parsing(true)
          .list_separator(",")
          .with_list_parse_key("legacy_program_tags"),
      )
      .build()?
      .try_deserialize()
  }

  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }

  pub fn read_timeout(&self) -> Option<Duration> {
    self.read_timeout_ms.map(Duration::from_millis)
  }

  pub fn matcher(&self) -> ProgramMatcher {
    ProgramMatcher::new(&self.legacy_program_tags)
  }

  /// Wrap `store` in an allocator configured from this file.
  pub fn allocator<S: SlotStore>(&self, store: Arc<S>) -> Allocator<S> {
    let allocator = Allocator::new(store).with_matcher(self.matcher());
    match self.read_timeout() {
      Some(limit) => allocator.with_read_timeout(limit),
      None => allocator,
    }
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// The full application: the JSON API with per-request tracing.
pub fn app<S>(allocator: Allocator<S>) -> Router
where
  S: SlotStore + 'static,
{
  aula_api::api_router(allocator).layer(TraceLayer::new_for_http())
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

#[cfg(test)]
mod tests {
  use aula_store_sqlite::SqliteStore;
  use axum::{
    body::Body,
    http::{Request, StatusCode},
  };
  use config::{Config, File, FileFormat};
  use tower::ServiceExt as _;

  use super::*;

  fn parse(toml: &str) -> ServerConfig {
    Config::builder()
      .add_source(File::from_str(toml, FileFormat::Toml))
      .build()
      .unwrap()
      .try_deserialize()
      .unwrap()
  }

  #[test]
  fn empty_file_uses_defaults() {
    let cfg = parse("");
    assert_eq!(cfg.address(), "127.0.0.1:8080");
    assert_eq!(cfg.store_path, PathBuf::from("aula.db"));
    assert_eq!(cfg.read_timeout(), None);
    assert!(cfg.matcher().is_untagged("Sin-Programa"));
  }

  #[test]
  fn explicit_values_override_defaults() {
    let cfg = parse(
      r#"
        host = "0.0.0.0"
        port = 9000
        store_path = "/var/lib/aula/aula.db"
        legacy_program_tags = ["generico"]
        read_timeout_ms = 250
      "#,
    );
    assert_eq!(cfg.address(), "0.0.0.0:9000");
    assert_eq!(cfg.read_timeout(), Some(Duration::from_millis(250)));

    let matcher = cfg.matcher();
    assert!(matcher.is_untagged("GENERICO"));
    assert!(matcher.is_untagged(""));
    assert!(!matcher.is_untagged("legacy"));
  }

  #[test]
  fn tilde_expands_to_home() {
    let Ok(home) = std::env::var("HOME") else {
      return;
    };
    assert_eq!(
      expand_tilde(Path::new("~/aula.db")),
      PathBuf::from(home).join("aula.db")
    );
    assert_eq!(expand_tilde(Path::new("/tmp/a.db")), PathBuf::from("/tmp/a.db"));
  }

  #[tokio::test]
  async fn app_serves_the_api() {
    let cfg = parse("read_timeout_ms = 1000");
    let store = Arc::new(SqliteStore::open_in_memory().await.unwrap());
    let req = Request::builder()
      .uri("/programs/P1/availability")
      .body(Body::empty())
      .unwrap();

    let resp = app(cfg.allocator(store)).oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
      .await
      .unwrap();
    let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body, serde_json::json!([]));
  }
}
