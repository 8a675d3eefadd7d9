use config::{Config as ConfigBuilder, ConfigError, File};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, warn};

use crate::errors::{unify_path, SearchError, SearchResult};
use crate::filters::{is_valid_extension_token, normalize_extension_token};

/// Default cap on a single line, beyond which the file is skipped
pub const DEFAULT_MAX_LINE_BYTES: usize = 16 * 1024 * 1024;

/// How raw file bytes are turned into text before matching
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EncodingMode {
    /// One byte per character (ISO-8859-1). No line is ever rejected.
    #[default]
    Latin1,
    /// UTF-8, invalid sequences replaced with U+FFFD
    #[serde(alias = "utf-8", alias = "lossy")]
    Utf8,
}

impl FromStr for EncodingMode {
    type Err = SearchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "latin1" | "latin-1" | "iso-8859-1" => Ok(Self::Latin1),
            "utf8" | "utf-8" | "lossy" => Ok(Self::Utf8),
            other => Err(SearchError::config_error(format!(
                "Unknown encoding '{}', expected latin1 or utf8",
                other
            ))),
        }
    }
}

impl fmt::Display for EncodingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Latin1 => f.write_str("latin1"),
            Self::Utf8 => f.write_str("utf8"),
        }
    }
}

/// Raw scan configuration, as read from a config file, CLI flags or a request line.
///
/// # Configuration Locations
///
/// Values are layered in order of precedence (later wins):
/// 1. Global `$HOME/.config/logscout/config.yaml`
/// 2. Local `.logscout.yaml` in the current directory
/// 3. A custom file passed to [`ScanConfig::load_from`]
///
/// # Configuration Format
///
/// ```yaml
/// thread_count: 8
/// search_text: "connection reset"
/// input_dir: "/var/log/app"
/// output_path: "/tmp/resets.txt"
/// extensions: ["log", "out"]
/// encoding_mode: latin1
/// max_line_bytes: 16777216
/// follow_links: false
/// timeout: "5m"
/// log_level: "info"
/// ```
///
/// A `ScanConfig` is never handed to the engine directly. [`ScanConfig::validate`] checks it
/// and produces a [`ScanRequest`], which is the only thing [`crate::search::scan`] accepts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Number of worker threads
    pub thread_count: NonZeroUsize,

    /// Text to look for, matched case-insensitively as a plain substring
    pub search_text: String,

    /// Root of the log tree
    pub input_dir: PathBuf,

    /// File that matches are appended to
    pub output_path: PathBuf,

    /// Extension tokens without the dot (e.g. ["log", "txt"])
    pub extensions: Vec<String>,

    /// How file bytes are decoded
    pub encoding_mode: EncodingMode,

    /// Longest line accepted before the file is skipped
    pub max_line_bytes: usize,

    /// Descend into symlinked directories and search symlinked files
    pub follow_links: bool,

    /// Optional deadline for the whole run, in humantime format ("30s", "5m")
    pub timeout: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
}

fn default_thread_count() -> NonZeroUsize {
    NonZeroUsize::new(num_cpus::get()).unwrap_or(NonZeroUsize::MIN)
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            thread_count: default_thread_count(),
            search_text: String::new(),
            input_dir: PathBuf::from("."),
            output_path: PathBuf::from("logscout-results.txt"),
            extensions: vec!["log".to_string()],
            encoding_mode: EncodingMode::default(),
            max_line_bytes: DEFAULT_MAX_LINE_BYTES,
            follow_links: false,
            timeout: None,
            log_level: "warn".to_string(),
        }
    }
}

impl ScanConfig {
    /// Loads configuration from the default locations
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(None)
    }

    /// Loads configuration from the default locations plus an optional custom file.
    /// The custom file, when given, must exist.
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = ConfigBuilder::builder();

        let defaults = [
            dirs::config_dir().map(|p| p.join("logscout/config.yaml")),
            Some(PathBuf::from(".logscout.yaml")),
        ];
        for path in defaults.iter().flatten() {
            if path.exists() {
                debug!("Loading configuration from {}", path.display());
                builder = builder.add_source(File::from(path.as_path()));
            }
        }

        if let Some(path) = config_path {
            builder = builder.add_source(File::from(path).required(true));
        }

        builder.build()?.try_deserialize()
    }

    /// Renders the configuration as YAML, in the same shape [`ScanConfig::load_from`] reads
    pub fn to_yaml(&self) -> SearchResult<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Checks every field and produces the immutable request the engine runs on.
    ///
    /// Invalid extension tokens are reported and dropped; the request is rejected only when
    /// none is left.
    pub fn validate(&self) -> SearchResult<ScanRequest> {
        let search_text = self.search_text.clone();
        if search_text.trim().is_empty() {
            return Err(SearchError::invalid_pattern("search text is empty"));
        }
        if search_text.chars().count() < 2 {
            return Err(SearchError::invalid_pattern(format!(
                "'{}' must be longer than one character",
                search_text
            )));
        }

        if !self.input_dir.exists() {
            return Err(SearchError::file_not_found(&self.input_dir));
        }
        if !self.input_dir.is_dir() {
            return Err(SearchError::config_error(format!(
                "Input path is not a directory: {}",
                self.input_dir.display()
            )));
        }
        let root = unify_path(&self.input_dir);

        let output_path = resolve_output_path(&self.output_path)?;
        let extensions = validate_extensions(&self.extensions)?;

        if self.max_line_bytes == 0 {
            return Err(SearchError::config_error("max_line_bytes must be positive"));
        }

        let timeout = self
            .timeout
            .as_deref()
            .map(humantime::parse_duration)
            .transpose()
            .map_err(|e| SearchError::config_error(format!("Invalid timeout: {}", e)))?;

        Ok(ScanRequest {
            thread_count: self.thread_count,
            search_text,
            root,
            output_path,
            extensions,
            encoding_mode: self.encoding_mode,
            max_line_bytes: self.max_line_bytes,
            follow_links: self.follow_links,
            timeout,
        })
    }
}

fn resolve_output_path(raw: &Path) -> SearchResult<PathBuf> {
    if raw.as_os_str().is_empty() {
        return Err(SearchError::config_error("Output path is empty"));
    }
    let file_name = raw.file_name().ok_or_else(|| {
        SearchError::config_error(format!("Output path has no file name: {}", raw.display()))
    })?;
    let parent = match raw.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };

    if !parent.is_dir() {
        return Err(SearchError::config_error(format!(
            "Directory for the output file does not exist: {}",
            parent.display()
        )));
    }
    // Permission bits do not say whether this user may create files, so try it
    if let Err(e) = tempfile::NamedTempFile::new_in(&parent) {
        return Err(SearchError::config_error(format!(
            "Directory for the output file is not writable: {} ({})",
            parent.display(),
            e
        )));
    }

    let resolved = unify_path(&parent).join(file_name);
    if resolved.exists() && !resolved.is_file() {
        return Err(SearchError::config_error(format!(
            "Output path is not a regular file: {}",
            resolved.display()
        )));
    }
    if resolved.exists() {
        if let Err(e) = fs::OpenOptions::new().append(true).open(&resolved) {
            return Err(SearchError::config_error(format!(
                "Output file is not writable: {} ({})",
                resolved.display(),
                e
            )));
        }
    }
    Ok(resolved)
}

fn validate_extensions(raw: &[String]) -> SearchResult<Vec<String>> {
    let mut extensions: Vec<String> = Vec::with_capacity(raw.len());
    for token in raw.iter().flat_map(|entry| entry.split_whitespace()) {
        let normalized = normalize_extension_token(token);
        if !is_valid_extension_token(&normalized) {
            warn!("Ignoring malformed extension token '{}'", token);
            continue;
        }
        if !extensions.contains(&normalized) {
            extensions.push(normalized);
        }
    }

    if extensions.is_empty() {
        return Err(SearchError::invalid_extension(
            "no well-formed extension was given",
        ));
    }
    Ok(extensions)
}

/// A validated, immutable scan request. Only [`ScanConfig::validate`] creates one.
#[derive(Debug, Clone)]
pub struct ScanRequest {
    thread_count: NonZeroUsize,
    search_text: String,
    root: PathBuf,
    output_path: PathBuf,
    extensions: Vec<String>,
    encoding_mode: EncodingMode,
    max_line_bytes: usize,
    follow_links: bool,
    timeout: Option<Duration>,
}

impl ScanRequest {
    pub fn thread_count(&self) -> NonZeroUsize {
        self.thread_count
    }

    pub fn search_text(&self) -> &str {
        &self.search_text
    }

    /// Canonical root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Canonical output file path
    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    /// Lowercase extension tokens, deduplicated
    pub fn extensions(&self) -> &[String] {
        &self.extensions
    }

    pub fn encoding_mode(&self) -> EncodingMode {
        self.encoding_mode
    }

    pub fn max_line_bytes(&self) -> usize {
        self.max_line_bytes
    }

    pub fn follow_links(&self) -> bool {
        self.follow_links
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File as StdFile;
    use std::io::Write;
    use tempfile::tempdir;

    fn valid_config(dir: &Path) -> ScanConfig {
        ScanConfig {
            thread_count: NonZeroUsize::new(2).unwrap(),
            search_text: "error".to_string(),
            input_dir: dir.to_path_buf(),
            output_path: dir.join("out.txt"),
            extensions: vec!["log".to_string()],
            ..ScanConfig::default()
        }
    }

    #[test]
    fn test_load_config_file() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.yaml");
        let config_content = r#"
            thread_count: 4
            search_text: "timeout"
            input_dir: "logs"
            output_path: "out/result.txt"
            extensions: ["log", "txt"]
            encoding_mode: utf8
            max_line_bytes: 4096
            follow_links: true
            timeout: "30s"
            log_level: "debug"
        "#;

        let mut file = StdFile::create(&config_path).unwrap();
        file.write_all(config_content.as_bytes()).unwrap();

        let config = ScanConfig::load_from(Some(&config_path)).unwrap();
        assert_eq!(config.thread_count, NonZeroUsize::new(4).unwrap());
        assert_eq!(config.search_text, "timeout");
        assert_eq!(config.input_dir, PathBuf::from("logs"));
        assert_eq!(config.output_path, PathBuf::from("out/result.txt"));
        assert_eq!(config.extensions, vec!["log".to_string(), "txt".to_string()]);
        assert_eq!(config.encoding_mode, EncodingMode::Utf8);
        assert_eq!(config.max_line_bytes, 4096);
        assert!(config.follow_links);
        assert_eq!(config.timeout.as_deref(), Some("30s"));
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    fn test_default_values() {
        let config_content = r#"
            search_text: "oops"
        "#;

        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.yaml");
        let mut file = StdFile::create(&config_path).unwrap();
        file.write_all(config_content.as_bytes()).unwrap();

        let config = ScanConfig::load_from(Some(&config_path)).unwrap();
        assert_eq!(config.search_text, "oops");
        assert_eq!(config.input_dir, PathBuf::from("."));
        assert_eq!(config.extensions, vec!["log".to_string()]);
        assert_eq!(config.encoding_mode, EncodingMode::Latin1);
        assert_eq!(config.max_line_bytes, DEFAULT_MAX_LINE_BYTES);
        assert!(!config.follow_links);
        assert_eq!(config.timeout, None);
        assert_eq!(
            config.thread_count,
            NonZeroUsize::new(num_cpus::get()).unwrap()
        );
        assert_eq!(config.log_level, "warn");
    }

    #[test]
    fn test_invalid_config() {
        let config_content = r#"
            thread_count: "many"
            input_dir: []
        "#;

        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.yaml");
        let mut file = StdFile::create(&config_path).unwrap();
        file.write_all(config_content.as_bytes()).unwrap();

        let result = ScanConfig::load_from(Some(&config_path));
        assert!(result.is_err(), "Expected error loading invalid config");
    }

    #[test]
    fn test_load_nonexistent_file() {
        let result = ScanConfig::load_from(Some(Path::new("nonexistent.yaml")));
        assert!(result.is_err());
    }

    #[test]
    fn test_yaml_round_trip_through_loader() {
        let dir = tempdir().unwrap();
        let config = valid_config(dir.path());
        let config_path = dir.path().join("saved.yaml");
        std::fs::write(&config_path, config.to_yaml().unwrap()).unwrap();

        let loaded = ScanConfig::load_from(Some(&config_path)).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_validate_accepts_good_config() {
        let dir = tempdir().unwrap();
        let request = valid_config(dir.path()).validate().unwrap();
        assert_eq!(request.thread_count().get(), 2);
        assert_eq!(request.search_text(), "error");
        assert_eq!(request.root(), unify_path(dir.path()));
        assert_eq!(request.output_path(), unify_path(dir.path()).join("out.txt"));
        assert_eq!(request.extensions(), ["log".to_string()]);
        assert_eq!(request.timeout(), None);
    }

    #[test]
    fn test_validate_rejects_single_character_search_text() {
        let dir = tempdir().unwrap();
        let mut config = valid_config(dir.path());
        config.search_text = "e".to_string();
        assert!(matches!(
            config.validate(),
            Err(SearchError::InvalidPattern(_))
        ));
    }

    #[test]
    fn test_validate_rejects_blank_search_text() {
        let dir = tempdir().unwrap();
        let mut config = valid_config(dir.path());
        config.search_text = "   ".to_string();
        assert!(matches!(
            config.validate(),
            Err(SearchError::InvalidPattern(_))
        ));
    }

    #[test]
    fn test_validate_rejects_missing_input_dir() {
        let dir = tempdir().unwrap();
        let mut config = valid_config(dir.path());
        config.input_dir = dir.path().join("missing");
        assert!(matches!(
            config.validate(),
            Err(SearchError::FileNotFound(_))
        ));
    }

    #[test]
    fn test_validate_rejects_missing_output_parent() {
        let dir = tempdir().unwrap();
        let mut config = valid_config(dir.path());
        config.output_path = dir.path().join("nope").join("out.txt");
        assert!(matches!(
            config.validate(),
            Err(SearchError::ConfigError(_))
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_validate_rejects_unwritable_output_dir() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let locked = dir.path().join("locked");
        std::fs::create_dir(&locked).unwrap();
        std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o555)).unwrap();

        // Superusers ignore the mode bits; there is nothing to reject then
        let writable = StdFile::create(locked.join("check")).is_ok();
        let mut config = valid_config(dir.path());
        config.output_path = locked.join("out.txt");
        let result = config.validate();
        std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o755)).unwrap();

        if !writable {
            assert!(matches!(result, Err(SearchError::ConfigError(msg)) if msg.contains("not writable")));
        }
    }

    #[test]
    fn test_validate_leaves_no_temp_file_behind() {
        let dir = tempdir().unwrap();
        valid_config(dir.path()).validate().unwrap();
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[cfg(unix)]
    #[test]
    fn test_validate_rejects_read_only_output_file() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let out = dir.path().join("out.txt");
        std::fs::write(&out, "").unwrap();
        std::fs::set_permissions(&out, std::fs::Permissions::from_mode(0o444)).unwrap();

        let writable = std::fs::OpenOptions::new().append(true).open(&out).is_ok();
        let result = valid_config(dir.path()).validate();
        std::fs::set_permissions(&out, std::fs::Permissions::from_mode(0o644)).unwrap();

        if !writable {
            assert!(matches!(result, Err(SearchError::ConfigError(_))));
        }
    }

    #[test]
    fn test_validate_rejects_directory_as_output() {
        let dir = tempdir().unwrap();
        std::fs::create_dir(dir.path().join("out.txt")).unwrap();
        let config = valid_config(dir.path());
        assert!(matches!(
            config.validate(),
            Err(SearchError::ConfigError(_))
        ));
    }

    #[test]
    fn test_validate_filters_extensions() {
        let dir = tempdir().unwrap();
        let mut config = valid_config(dir.path());
        config.extensions = vec![
            "LOG".to_string(),
            "t-x-t".to_string(),
            ".err out".to_string(),
            "log".to_string(),
        ];
        let request = config.validate().unwrap();
        assert_eq!(
            request.extensions(),
            ["log".to_string(), "err".to_string(), "out".to_string()]
        );

        config.extensions = vec!["123".to_string(), "a_b".to_string()];
        assert!(matches!(
            config.validate(),
            Err(SearchError::InvalidExtension(_))
        ));
    }

    #[test]
    fn test_validate_parses_timeout() {
        let dir = tempdir().unwrap();
        let mut config = valid_config(dir.path());
        config.timeout = Some("1m 30s".to_string());
        let request = config.validate().unwrap();
        assert_eq!(request.timeout(), Some(Duration::from_secs(90)));

        config.timeout = Some("soon".to_string());
        assert!(matches!(
            config.validate(),
            Err(SearchError::ConfigError(_))
        ));
    }

    #[test]
    fn test_encoding_mode_from_str() {
        assert_eq!("latin1".parse::<EncodingMode>().unwrap(), EncodingMode::Latin1);
        assert_eq!("UTF-8".parse::<EncodingMode>().unwrap(), EncodingMode::Utf8);
        assert!("ebcdic".parse::<EncodingMode>().is_err());
    }
}
