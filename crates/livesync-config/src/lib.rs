//! Configuration management for livesync.
//!
//! Parses `livesync.toml` configuration files with serde and provides
//! auto-discovery of the config file in parent directories. Without a config
//! file the built-in defaults are used.
//!
//! CLI settings (which the binary fills from flags or environment variables)
//! are applied during load via [`CliSettings`].
//!
//! ## Environment Variable Expansion
//!
//! String configuration values support environment variable expansion:
//!
//! - `${VAR}` - expands to the value of VAR, errors if unset
//! - `${VAR:-default}` - expands to VAR if set, otherwise uses default
//!
//! Expanded fields:
//! - `server.host`
//! - `watch.root`
//! - `seed.snippet`
//! - `seed.public_url`

mod expand;

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// CLI settings that override configuration file values.
///
/// All fields are optional. Only non-None values override the loaded config.
#[derive(Debug, Default)]
pub struct CliSettings {
    /// Override watch root directory.
    pub root: Option<PathBuf>,
    /// Override bind host.
    pub host: Option<String>,
    /// Override bind port.
    pub port: Option<u16>,
    /// Override the advertised connection URL.
    pub public_url: Option<String>,
    /// Override the extension allow-list.
    pub extensions: Option<Vec<String>>,
    /// Override whether the companion snippet is seeded.
    pub seed_enabled: Option<bool>,
}

/// Configuration filename to search for.
const CONFIG_FILENAME: &str = "livesync.toml";

/// Default watch root when nothing else is configured.
const DEFAULT_ROOT: &str = "/var/www/html";

/// Default bind port. Not derived from any environment variable.
const DEFAULT_PORT: u16 = 12345;

/// Default companion snippet file name.
const DEFAULT_SNIPPET: &str = "watcher-connector.php";

/// Application configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Server configuration.
    pub server: ServerConfig,
    /// Watch configuration (paths are raw strings from TOML).
    watch: WatchConfigRaw,
    /// Seeding configuration (paths are raw strings from TOML).
    seed: SeedConfigRaw,

    /// Resolved watch configuration (set after loading).
    #[serde(skip)]
    pub watch_resolved: WatchConfig,
    /// Resolved seeding configuration (set after loading).
    #[serde(skip)]
    pub seed_resolved: SeedConfig,
    /// Path to the config file (set after loading).
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            watch: WatchConfigRaw::default(),
            seed: SeedConfigRaw::default(),
            watch_resolved: WatchConfig::default(),
            seed_resolved: SeedConfig::default(),
            config_path: None,
        }
    }
}

/// Server configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind the WebSocket listener to.
    pub host: String,
    /// Port to bind the WebSocket listener to.
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_owned(),
            port: DEFAULT_PORT,
        }
    }
}

/// Raw watch configuration as parsed from TOML.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct WatchConfigRaw {
    root: Option<String>,
    extensions: Option<Vec<String>>,
}

/// Resolved watch configuration.
#[derive(Debug)]
pub struct WatchConfig {
    /// Directory tree to observe.
    pub root: PathBuf,
    /// File extensions that trigger a broadcast, without leading dots.
    pub extensions: Vec<String>,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from(DEFAULT_ROOT),
            extensions: vec!["css".to_owned(), "js".to_owned()],
        }
    }
}

/// Raw seeding configuration as parsed from TOML.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct SeedConfigRaw {
    enabled: Option<bool>,
    snippet: Option<String>,
    plugin_dir: Option<String>,
    public_url: Option<String>,
}

/// Resolved companion snippet seeding configuration.
#[derive(Debug)]
pub struct SeedConfig {
    /// Whether the snippet is copied at startup.
    pub enabled: bool,
    /// Source snippet file.
    pub snippet: PathBuf,
    /// Destination directory, relative to the watch root.
    pub plugin_dir: PathBuf,
    /// Connection URL advertised to the snippet. Derived from the server
    /// address when unset.
    pub public_url: Option<String>,
}

impl Default for SeedConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            snippet: default_snippet_path(),
            plugin_dir: PathBuf::from("wp-content/mu-plugins"),
            public_url: None,
        }
    }
}

/// Snippet shipped next to the executable.
fn default_snippet_path() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .unwrap_or_default()
        .join(DEFAULT_SNIPPET)
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File not found.
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error.
    #[error("Configuration error: {0}")]
    Validation(String),
    /// Environment variable error during expansion.
    #[error("Environment variable error in {field}: {message}")]
    EnvVar {
        /// Config field path (e.g., "`watch.root`").
        field: String,
        /// Error message (e.g., "${`WATCH_ROOT`} not set").
        message: String,
    },
}

/// Require a string field to be non-empty.
fn require_non_empty(value: &str, field: &str) -> Result<(), ConfigError> {
    if value.is_empty() {
        return Err(ConfigError::Validation(format!("{field} cannot be empty")));
    }
    Ok(())
}

/// Require a URL field to use ws:// or wss:// scheme.
fn require_ws_url(url: &str, field: &str) -> Result<(), ConfigError> {
    if !url.starts_with("ws://") && !url.starts_with("wss://") {
        return Err(ConfigError::Validation(format!(
            "{field} must start with ws:// or wss://"
        )));
    }
    Ok(())
}

/// Normalize an allow-list entry: trim, drop a leading dot, lowercase.
fn normalize_extension(ext: &str) -> String {
    ext.trim().trim_start_matches('.').to_ascii_lowercase()
}

impl Config {
    /// Load configuration from file with optional CLI settings.
    ///
    /// If `config_path` is provided, loads from that file.
    /// Otherwise, searches for `livesync.toml` in current directory and parents,
    /// falling back to the built-in defaults.
    ///
    /// CLI settings are applied after loading and path resolution, allowing CLI
    /// arguments to take precedence over config file values.
    ///
    /// # Errors
    ///
    /// Returns error if explicit `config_path` doesn't exist, parsing fails,
    /// or the resulting configuration is invalid.
    pub fn load(
        config_path: Option<&Path>,
        cli_settings: Option<&CliSettings>,
    ) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = config_path {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            Self::load_from_file(path)?
        } else if let Some(discovered) = Self::discover_config() {
            Self::load_from_file(&discovered)?
        } else {
            Self::default()
        };

        if let Some(settings) = cli_settings {
            config.apply_cli_settings(settings);
            config.validate()?;
        }

        Ok(config)
    }

    /// Connection URL substituted into the companion snippet.
    ///
    /// Uses `seed.public_url` when configured. Otherwise builds
    /// `ws://host:port` from the bind address, replacing unspecified
    /// addresses with `localhost`. The bind port and the advertised URL are
    /// independent settings.
    #[must_use]
    pub fn connection_url(&self) -> String {
        if let Some(url) = &self.seed_resolved.public_url {
            return url.clone();
        }
        let host = match self.server.host.as_str() {
            "0.0.0.0" | "::" | "[::]" | "" => "localhost",
            host => host,
        };
        format!("ws://{host}:{}", self.server.port)
    }

    /// Apply CLI settings to the configuration.
    fn apply_cli_settings(&mut self, settings: &CliSettings) {
        if let Some(root) = &settings.root {
            self.watch_resolved.root.clone_from(root);
        }
        if let Some(host) = &settings.host {
            self.server.host.clone_from(host);
        }
        if let Some(port) = settings.port {
            self.server.port = port;
        }
        if let Some(url) = &settings.public_url {
            self.seed_resolved.public_url = (!url.is_empty()).then(|| url.clone());
        }
        if let Some(extensions) = &settings.extensions {
            self.watch_resolved.extensions =
                extensions.iter().map(|e| normalize_extension(e)).collect();
        }
        if let Some(enabled) = settings.seed_enabled {
            self.seed_resolved.enabled = enabled;
        }
    }

    /// Search for config file in current directory and parents.
    fn discover_config() -> Option<PathBuf> {
        let mut current = std::env::current_dir().ok()?;
        loop {
            let candidate = current.join(CONFIG_FILENAME);
            if candidate.exists() {
                return Some(candidate);
            }
            if !current.pop() {
                return None;
            }
        }
    }

    /// Load configuration from a specific file.
    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content)?;

        // Expand environment variables before path resolution
        config.expand_env_vars()?;

        let config_dir = path.parent().unwrap_or(Path::new("."));
        config.resolve_paths(config_dir);
        config.config_path = Some(path.to_path_buf());

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values.
    ///
    /// Called automatically after loading from file and after CLI settings
    /// are applied.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if any validation fails.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_server()?;
        self.validate_watch()?;
        self.validate_seed()?;
        Ok(())
    }

    fn validate_server(&self) -> Result<(), ConfigError> {
        require_non_empty(&self.server.host, "server.host")?;

        // Port 0 would bind a random port that no client could guess
        if self.server.port == 0 {
            return Err(ConfigError::Validation(
                "server.port cannot be 0".to_owned(),
            ));
        }

        Ok(())
    }

    fn validate_watch(&self) -> Result<(), ConfigError> {
        if self.watch_resolved.root.as_os_str().is_empty() {
            return Err(ConfigError::Validation(
                "watch.root cannot be empty".to_owned(),
            ));
        }
        if self.watch_resolved.extensions.is_empty()
            || self.watch_resolved.extensions.iter().any(String::is_empty)
        {
            return Err(ConfigError::Validation(
                "watch.extensions must list at least one non-empty extension".to_owned(),
            ));
        }
        Ok(())
    }

    fn validate_seed(&self) -> Result<(), ConfigError> {
        if let Some(url) = &self.seed_resolved.public_url {
            require_non_empty(url, "seed.public_url")?;
            require_ws_url(url, "seed.public_url")?;
        }
        Ok(())
    }

    /// Expand environment variable references in configuration strings.
    fn expand_env_vars(&mut self) -> Result<(), ConfigError> {
        self.server.host = expand::expand_env(&self.server.host, "server.host")?;

        if let Some(ref root) = self.watch.root {
            self.watch.root = Some(expand::expand_env(root, "watch.root")?);
        }
        if let Some(ref snippet) = self.seed.snippet {
            self.seed.snippet = Some(expand::expand_env(snippet, "seed.snippet")?);
        }
        if let Some(ref url) = self.seed.public_url {
            let expanded = expand::expand_env(url, "seed.public_url")?;
            // An empty expansion (e.g. `${WATCHER_URL:-}`) means "derive it"
            self.seed.public_url = (!expanded.is_empty()).then_some(expanded);
        }

        Ok(())
    }

    /// Resolve relative paths against the config file directory.
    fn resolve_paths(&mut self, config_dir: &Path) {
        let defaults = WatchConfig::default();
        self.watch_resolved = WatchConfig {
            root: self
                .watch
                .root
                .as_deref()
                .map_or(defaults.root, |root| config_dir.join(root)),
            extensions: self.watch.extensions.as_ref().map_or(defaults.extensions, |exts| {
                exts.iter().map(|e| normalize_extension(e)).collect()
            }),
        };

        let defaults = SeedConfig::default();
        self.seed_resolved = SeedConfig {
            enabled: self.seed.enabled.unwrap_or(defaults.enabled),
            snippet: self
                .seed
                .snippet
                .as_deref()
                .map_or(defaults.snippet, |snippet| config_dir.join(snippet)),
            plugin_dir: self
                .seed
                .plugin_dir
                .as_deref()
                .map_or(defaults.plugin_dir, PathBuf::from),
            public_url: self.seed.public_url.clone(),
        };
    }
}
