//! Instrumentation configuration.
//!
//! [`MetricsConfig`] carries the values the transport bindings need at
//! construction time: the `host` label value and the excluded-path list
//! for HTTP instrumentation. Host applications typically embed it in
//! their own TOML configuration:
//!
//! ```toml
//! [metrics]
//! host = "billing-api"
//! excluded_paths = ["isalive", "ready"]
//! ```

use serde::Deserialize;

/// Configuration shared by the transport bindings.
///
/// Supports both file-driven deserialization and the builder:
///
/// ```rust
/// # use bifrost::MetricsConfig;
/// let config = MetricsConfig::new()
///     .host("billing-api")
///     .exclude_path("healthz");
/// assert!(config.is_excluded("/api/Healthz/check"));
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    /// Value of the `host` label on every metric.
    /// Default: [`host_from_env()`].
    #[serde(default = "host_from_env")]
    pub host: String,
    /// Request paths to skip entirely, matched as case-insensitive
    /// substrings. A matching request produces no metric updates at
    /// all. Default: `["isalive"]`.
    #[serde(default = "default_excluded_paths")]
    pub excluded_paths: Vec<String>,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            host: host_from_env(),
            excluded_paths: default_excluded_paths(),
        }
    }
}

impl MetricsConfig {
    /// Create a new config with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the `host` label value.
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Add one excluded-path fragment (case-insensitive substring).
    pub fn exclude_path(mut self, fragment: impl Into<String>) -> Self {
        self.excluded_paths.push(fragment.into());
        self
    }

    /// Replace the excluded-path list. Passing an empty list removes
    /// the default `isalive` exclusion and instruments every path.
    pub fn excluded_paths(mut self, fragments: Vec<String>) -> Self {
        self.excluded_paths = fragments;
        self
    }

    /// Whether `path` matches any excluded fragment.
    pub fn is_excluded(&self, path: &str) -> bool {
        let path = path.to_lowercase();
        self.excluded_paths
            .iter()
            .any(|fragment| path.contains(&fragment.to_lowercase()))
    }
}

fn default_excluded_paths() -> Vec<String> {
    vec!["isalive".to_string()]
}

/// Resolve the `host` label value from the environment.
///
/// Uses the `HOST` environment variable when set and non-empty,
/// otherwise the current executable's file stem, otherwise "unknown".
/// Deployments that run several replicas of the same binary set `HOST`
/// to keep their series apart.
pub fn host_from_env() -> String {
    if let Ok(host) = std::env::var("HOST") {
        if !host.is_empty() {
            return host;
        }
    }
    std::env::current_exe()
        .ok()
        .and_then(|path| {
            path.file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
        })
        .unwrap_or_else(|| "unknown".to_string())
}
