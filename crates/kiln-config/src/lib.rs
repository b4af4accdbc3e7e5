//! Configuration management for kiln.
//!
//! Parses `kiln.toml` with serde and discovers it in the current directory or
//! any parent. Every section is optional; the defaults describe the classic
//! `app/` + `dist/` front-end layout:
//!
//! ```text
//! app/scss/style.scss        -> app/css/style.min.css
//! <jquery> + app/js/main.js  -> app/js/main.min.js
//! app/images/**              -> dist/images/**
//! app/**/*.html + outputs    -> dist/**
//! ```
//!
//! Relative paths resolve against the directory containing the config file.
//! CLI settings can be applied during load via [`CliSettings`].
//!
//! ## Environment Variable Expansion
//!
//! `server.host` supports `${VAR}` and `${VAR:-default}`.

mod expand;

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// CLI settings that override configuration file values.
///
/// Only non-None values override the loaded config.
#[derive(Debug, Default)]
pub struct CliSettings {
    /// Override server host.
    pub host: Option<String>,
    /// Override server port.
    pub port: Option<u16>,
    /// Override live reload enabled flag.
    pub live_reload_enabled: Option<bool>,
}

/// Configuration filename to search for.
const CONFIG_FILENAME: &str = "kiln.toml";

/// Application configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Dev server configuration.
    pub server: ServerConfig,
    /// Input and output locations (relative strings from TOML).
    paths: PathsConfigRaw,
    /// Stylesheet compilation settings.
    pub styles: StylesConfig,
    /// Image optimization settings.
    pub images: ImagesConfig,
    /// Watch rules and debounce.
    pub watch: WatchConfig,
    /// Live reload configuration.
    pub live_reload: LiveReloadConfig,

    /// Resolved paths (set after loading).
    #[serde(skip)]
    pub paths_resolved: PathsConfig,
    /// Project root that relative paths and watch globs are anchored to.
    #[serde(skip)]
    pub root: PathBuf,
    /// Path to the config file (set after loading).
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self::default_with_base(Path::new("."))
    }
}

/// Dev server configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Server host address.
    pub host: String,
    /// Server port.
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_owned(),
            port: 3000,
        }
    }
}

/// Raw path configuration as parsed from TOML.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct PathsConfigRaw {
    app_dir: Option<String>,
    dist_dir: Option<String>,
    style_entry: Option<String>,
    style_output: Option<String>,
    scripts: Option<Vec<String>>,
    script_output: Option<String>,
    images_dir: Option<String>,
    images_output: Option<String>,
}

/// Resolved input and output paths.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PathsConfig {
    /// Working tree served by the dev server and packaged into `dist_dir`.
    pub app_dir: PathBuf,
    /// Distribution directory, removed by `init` before a full build.
    pub dist_dir: PathBuf,
    /// Stylesheet entry file.
    pub style_entry: PathBuf,
    /// Compiled stylesheet.
    pub style_output: PathBuf,
    /// Script inputs in concatenation order.
    pub scripts: Vec<PathBuf>,
    /// Bundled script.
    pub script_output: PathBuf,
    /// Image sources.
    pub images_dir: PathBuf,
    /// Optimized image destination.
    pub images_output: PathBuf,
}

/// Stylesheet compilation settings.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct StylesConfig {
    /// Browserslist queries used for vendor prefixing.
    pub browsers: Vec<String>,
}

impl Default for StylesConfig {
    fn default() -> Self {
        Self {
            browsers: ["last 10 versions", "Safari >= 6", "iOS >= 6", "Android >= 4"]
                .map(str::to_owned)
                .to_vec(),
        }
    }
}

/// Image optimization settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ImagesConfig {
    /// Re-encode GIF frames interlaced.
    pub gif_interlaced: bool,
    /// JPEG quality (1-100).
    pub jpeg_quality: u8,
    /// Request progressive JPEG output.
    pub jpeg_progressive: bool,
    /// PNG optimization level (0-6).
    pub png_optimization_level: u8,
    /// Drop the root `viewBox` when it matches `width`/`height`.
    pub svg_remove_view_box: bool,
    /// Rewrite SVG ids (not supported; ids are always kept).
    pub svg_cleanup_ids: bool,
}

impl Default for ImagesConfig {
    fn default() -> Self {
        Self {
            gif_interlaced: true,
            jpeg_quality: 75,
            jpeg_progressive: true,
            png_optimization_level: 5,
            svg_remove_view_box: true,
            svg_cleanup_ids: false,
        }
    }
}

/// Watch rules. Globs are relative to the project root; a leading `!` excludes.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    /// Trailing debounce applied to filesystem events.
    pub debounce_ms: u64,
    /// Globs that trigger the stylesheet build.
    pub styles: Vec<String>,
    /// Globs that trigger the script bundle.
    pub scripts: Vec<String>,
    /// Globs whose modification triggers a page reload.
    pub pages: Vec<String>,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 200,
            styles: vec!["app/scss/**/*.scss".to_owned()],
            scripts: vec!["app/js/**/*.js".to_owned(), "!app/js/main.min.js".to_owned()],
            pages: vec!["app/**/*.html".to_owned()],
        }
    }
}

/// Live reload configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LiveReloadConfig {
    /// Whether the reload script is injected and the WebSocket endpoint exposed.
    pub enabled: bool,
}

impl Default for LiveReloadConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
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
        /// Config field path (e.g., "`server.host`").
        field: String,
        /// Error message (e.g., "${`KILN_HOST`} not set").
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

impl Config {
    /// Load configuration from file with optional CLI settings.
    ///
    /// If `config_path` is provided, loads from that file. Otherwise searches for
    /// `kiln.toml` in the current directory and its parents, falling back to
    /// defaults rooted at the current directory.
    ///
    /// # Errors
    ///
    /// Returns error if explicit `config_path` doesn't exist, parsing fails, or
    /// the resulting configuration is invalid.
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
            Self::default_with_cwd()
        };

        if let Some(settings) = cli_settings {
            config.apply_cli_settings(settings);
        }

        config.validate()?;
        Ok(config)
    }

    /// Create default config rooted at `base`.
    #[must_use]
    pub fn default_with_base(base: &Path) -> Self {
        let mut config = Self {
            server: ServerConfig::default(),
            paths: PathsConfigRaw::default(),
            styles: StylesConfig::default(),
            images: ImagesConfig::default(),
            watch: WatchConfig::default(),
            live_reload: LiveReloadConfig::default(),
            paths_resolved: PathsConfig::default(),
            root: PathBuf::new(),
            config_path: None,
        };
        config.resolve_paths(base);
        config
    }

    /// Apply CLI settings to the configuration.
    fn apply_cli_settings(&mut self, settings: &CliSettings) {
        if let Some(host) = &settings.host {
            self.server.host.clone_from(host);
        }
        if let Some(port) = settings.port {
            self.server.port = port;
        }
        if let Some(live_reload_enabled) = settings.live_reload_enabled {
            self.live_reload.enabled = live_reload_enabled;
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

    /// Create default config with paths relative to current working directory.
    fn default_with_cwd() -> Self {
        let cwd = std::env::current_dir().unwrap_or_default();
        Self::default_with_base(&cwd)
    }

    /// Load configuration from a specific file.
    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content)?;

        config.expand_env_vars()?;

        let config_dir = path.parent().unwrap_or(Path::new("."));
        config.resolve_paths(config_dir);
        config.config_path = Some(path.to_path_buf());

        Ok(config)
    }

    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if any validation fails.
    pub fn validate(&self) -> Result<(), ConfigError> {
        require_non_empty(&self.server.host, "server.host")?;
        if self.server.port == 0 {
            return Err(ConfigError::Validation(
                "server.port cannot be 0".to_owned(),
            ));
        }

        if self.paths_resolved.scripts.is_empty() {
            return Err(ConfigError::Validation(
                "paths.scripts must list at least one file".to_owned(),
            ));
        }

        if self.styles.browsers.is_empty() {
            return Err(ConfigError::Validation(
                "styles.browsers must list at least one query".to_owned(),
            ));
        }

        self.validate_images()
    }

    fn validate_images(&self) -> Result<(), ConfigError> {
        const MAX_PNG_LEVEL: u8 = 6;

        if !(1..=100).contains(&self.images.jpeg_quality) {
            return Err(ConfigError::Validation(
                "images.jpeg_quality must be between 1 and 100".to_owned(),
            ));
        }
        if self.images.png_optimization_level > MAX_PNG_LEVEL {
            return Err(ConfigError::Validation(format!(
                "images.png_optimization_level cannot exceed {MAX_PNG_LEVEL}"
            )));
        }
        Ok(())
    }

    fn expand_env_vars(&mut self) -> Result<(), ConfigError> {
        self.server.host = expand::expand_env(&self.server.host, "server.host")?;
        Ok(())
    }

    /// Resolve relative paths against `base`.
    fn resolve_paths(&mut self, base: &Path) {
        let raw = &self.paths;
        let resolve = |path: Option<&str>, default: &str| base.join(path.unwrap_or(default));

        let scripts = match &raw.scripts {
            Some(scripts) => scripts.iter().map(|s| base.join(s)).collect(),
            None => vec![
                base.join("node_modules/jquery/dist/jquery.js"),
                base.join("app/js/main.js"),
            ],
        };

        self.paths_resolved = PathsConfig {
            app_dir: resolve(raw.app_dir.as_deref(), "app"),
            dist_dir: resolve(raw.dist_dir.as_deref(), "dist"),
            style_entry: resolve(raw.style_entry.as_deref(), "app/scss/style.scss"),
            style_output: resolve(raw.style_output.as_deref(), "app/css/style.min.css"),
            scripts,
            script_output: resolve(raw.script_output.as_deref(), "app/js/main.min.js"),
            images_dir: resolve(raw.images_dir.as_deref(), "app/images"),
            images_output: resolve(raw.images_output.as_deref(), "dist/images"),
        };
        self.root = base.to_path_buf();
    }
}
