//! Configuration types for the document parsing service.
//!
//! All process-wide behaviour is controlled through [`ServiceConfig`], built
//! via its [`ServiceConfigBuilder`]. Per-request knobs live in
//! [`ParseOptions`], which the HTTP layer fills from the request and falls
//! back to [`ServiceConfig::default_options`] for anything omitted.

use crate::error::DocParseError;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Default directory under which every job workspace is created.
pub const DEFAULT_WORKSPACE_ROOT: &str = "./temp_output";

/// Environment variable the extraction engine reads to pick its model source.
pub const MODEL_SOURCE_ENV: &str = "MINERU_MODEL_SOURCE";

/// Configuration for the whole service.
///
/// # Example
/// ```rust
/// use edgequake_docparse::ServiceConfig;
/// use std::time::Duration;
///
/// let config = ServiceConfig::builder()
///     .workspace_root("/var/lib/docparse")
///     .ttl(Duration::from_secs(7200))
///     .build()
///     .unwrap();
/// assert_eq!(config.retention.ttl.as_secs(), 7200);
/// ```
#[derive(Clone)]
pub struct ServiceConfig {
    /// Root directory holding one sub-directory per job. Default: `./temp_output`.
    pub workspace_root: PathBuf,

    /// Workspace retention. Default: 1 h TTL, swept every hour.
    pub retention: RetentionPolicy,

    /// Office → PDF converter invocation.
    pub converter: ConverterSettings,

    /// PDF → Markdown extraction engine invocation.
    pub extractor: ExtractorSettings,

    /// Options applied when a request leaves a field unset.
    pub default_options: ParseOptions,

    /// Optional observer for per-job stage events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            workspace_root: PathBuf::from(DEFAULT_WORKSPACE_ROOT),
            retention: RetentionPolicy::default(),
            converter: ConverterSettings::default(),
            extractor: ExtractorSettings::default(),
            default_options: ParseOptions::default(),
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ServiceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceConfig")
            .field("workspace_root", &self.workspace_root)
            .field("retention", &self.retention)
            .field("converter", &self.converter)
            .field("extractor", &self.extractor)
            .field("default_options", &self.default_options)
            .field(
                "progress_callback",
                &self
                    .progress_callback
                    .as_ref()
                    .map(|_| "<dyn JobProgressCallback>"),
            )
            .finish()
    }
}

impl ServiceConfig {
    /// Create a new builder for `ServiceConfig`.
    pub fn builder() -> ServiceConfigBuilder {
        ServiceConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ServiceConfig`].
pub struct ServiceConfigBuilder {
    config: ServiceConfig,
}

impl ServiceConfigBuilder {
    pub fn workspace_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.config.workspace_root = root.into();
        self
    }

    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.config.retention.ttl = ttl;
        self
    }

    pub fn sweep_interval(mut self, interval: Duration) -> Self {
        self.config.retention.sweep_interval = interval;
        self
    }

    pub fn converter_command(mut self, command: CommandSpec) -> Self {
        self.config.converter.command = command;
        self
    }

    pub fn converter_timeout(mut self, timeout: Duration) -> Self {
        self.config.converter.timeout = timeout;
        self
    }

    pub fn extractor_command(mut self, command: CommandSpec) -> Self {
        self.config.extractor.command = command;
        self
    }

    pub fn extractor_timeout(mut self, timeout: Duration) -> Self {
        self.config.extractor.timeout = timeout;
        self
    }

    pub fn model_source(mut self, source: impl Into<String>) -> Self {
        self.config.extractor.model_source = Some(source.into());
        self
    }

    pub fn default_options(mut self, options: ParseOptions) -> Self {
        self.config.default_options = options;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ServiceConfig, DocParseError> {
        let c = &self.config;
        if c.workspace_root.as_os_str().is_empty() {
            return Err(DocParseError::InvalidConfig(
                "workspace root must not be empty".into(),
            ));
        }
        if c.retention.ttl.is_zero() {
            return Err(DocParseError::InvalidConfig("TTL must be > 0".into()));
        }
        if c.retention.sweep_interval.is_zero() {
            return Err(DocParseError::InvalidConfig(
                "sweep interval must be > 0".into(),
            ));
        }
        if c.converter.timeout.is_zero() || c.extractor.timeout.is_zero() {
            return Err(DocParseError::InvalidConfig(
                "stage timeouts must be > 0".into(),
            ));
        }
        if c.converter.command.program.is_empty() || c.extractor.command.program.is_empty() {
            return Err(DocParseError::InvalidConfig(
                "converter and extractor programs must be named".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Retention ────────────────────────────────────────────────────────────

/// How long workspaces live and how often the sweeper looks for expired ones.
///
/// The TTL must stay comfortably above the worst-case job duration: the
/// sweeper judges age purely by directory modification time and will remove
/// a workspace that a slow job is still using.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionPolicy {
    pub ttl: Duration,
    pub sweep_interval: Duration,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(3600),
            sweep_interval: Duration::from_secs(3600),
        }
    }
}

// ── External commands ────────────────────────────────────────────────────

/// An executable plus a fixed argument prefix.
///
/// Stage arguments are appended after `leading_args`, so a launcher such as
/// `python -m mineru` is `CommandSpec::new("python").with_args(["-m", "mineru"])`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandSpec {
    pub program: String,
    #[serde(default)]
    pub leading_args: Vec<String>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            leading_args: Vec::new(),
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.leading_args.extend(args.into_iter().map(Into::into));
        self
    }
}

/// Office → PDF converter settings.
#[derive(Debug, Clone)]
pub struct ConverterSettings {
    /// Default: `libreoffice`.
    pub command: CommandSpec,
    /// Default: 120 s.
    pub timeout: Duration,
}

impl Default for ConverterSettings {
    fn default() -> Self {
        Self {
            command: CommandSpec::new("libreoffice"),
            timeout: Duration::from_secs(120),
        }
    }
}

/// Extraction engine settings.
#[derive(Debug, Clone)]
pub struct ExtractorSettings {
    /// Default: `mineru`.
    pub command: CommandSpec,

    /// Value exported as [`MODEL_SOURCE_ENV`] into the child's environment.
    /// Default: `modelscope`. `None` leaves the child's inherited value alone.
    pub model_source: Option<String>,

    /// Value passed as `--source`. Default: `local`.
    pub source: Option<String>,

    /// Default: 30 min. Large scanned documents take a long time on CPU.
    pub timeout: Duration,
}

impl Default for ExtractorSettings {
    fn default() -> Self {
        Self {
            command: CommandSpec::new("mineru"),
            model_source: Some("modelscope".to_string()),
            source: Some("local".to_string()),
            timeout: Duration::from_secs(1800),
        }
    }
}

// ── Per-request options ──────────────────────────────────────────────────

/// Selectors forwarded to the extraction engine plus the requested output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseOptions {
    /// Language hint. Default: `ch`.
    pub lang: String,
    /// Engine backend. Default: `pipeline`.
    pub backend: String,
    /// Parse method. Default: `auto`.
    pub method: String,
    /// Default: Markdown.
    pub output_format: OutputFormat,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            lang: "ch".to_string(),
            backend: "pipeline".to_string(),
            method: "auto".to_string(),
            output_format: OutputFormat::Markdown,
        }
    }
}

impl ParseOptions {
    /// Fill every `None` from `self`, returning the merged options.
    pub fn overlay(
        &self,
        lang: Option<String>,
        backend: Option<String>,
        method: Option<String>,
        output_format: Option<OutputFormat>,
    ) -> ParseOptions {
        ParseOptions {
            lang: lang.unwrap_or_else(|| self.lang.clone()),
            backend: backend.unwrap_or_else(|| self.backend.clone()),
            method: method.unwrap_or_else(|| self.method.clone()),
            output_format: output_format.unwrap_or(self.output_format),
        }
    }
}

/// Shape of the returned document.
///
/// Only the literal `html` selects hypertext; every other wire value
/// (including unknown ones) returns the raw Markdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum OutputFormat {
    #[default]
    Markdown,
    Html,
}

impl OutputFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Markdown => "md",
            OutputFormat::Html => "html",
        }
    }
}

impl From<&str> for OutputFormat {
    fn from(s: &str) -> Self {
        if s.trim().eq_ignore_ascii_case("html") {
            OutputFormat::Html
        } else {
            OutputFormat::Markdown
        }
    }
}

impl From<String> for OutputFormat {
    fn from(s: String) -> Self {
        OutputFormat::from(s.as_str())
    }
}

impl From<OutputFormat> for String {
    fn from(f: OutputFormat) -> Self {
        f.as_str().to_string()
    }
}
