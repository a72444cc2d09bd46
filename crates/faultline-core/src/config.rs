//! Configuration for the Faultline reporter.
//!
//! Holds the collector endpoint, credentials, timeouts, proxy settings and
//! the filter/ignore lists consulted for every report. Scalars that are left
//! unset fall back to defaults when read; list-valued settings start as a
//! fresh copy of their defaults and are mutated in place afterwards.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use regex::Regex;
use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::backtrace::{BacktraceFilter, BacktraceFilters};
use crate::error::NoticeError;

/// Collector host used when none is configured.
pub const DEFAULT_HOST: &str = "collector.faultline.dev";

/// Path notices are posted to on the collector.
pub const NOTICES_PATH: &str = "/notices/";

/// Seconds allowed for establishing the connection.
pub const DEFAULT_OPEN_TIMEOUT_SECS: u64 = 2;

/// Seconds allowed for reading the response.
pub const DEFAULT_READ_TIMEOUT_SECS: u64 = 5;

/// Fault types suppressed unless the ignore list is replaced.
pub const IGNORE_DEFAULT: &[&str] = &[
    "RecordNotFound",
    "RoutingError",
    "InvalidAuthenticityToken",
    "TamperedWithCookie",
    "UnknownAction",
];

/// Parameter name fragments redacted unless the list is changed.
pub const PARAMS_FILTERS_DEFAULT: &[&str] = &["password"];

/// Environment names in which the interceptor stays silent.
const PRIVATE_ENVIRONMENTS: &[&str] = &["development", "test"];

// ---------------------------------------------------------------------------
// Supporting types
// ---------------------------------------------------------------------------

/// Outbound HTTP proxy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyConfig {
    pub host: String,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub pass: Option<String>,
}

impl ProxyConfig {
    /// Proxy URL in `http://host[:port]` form.
    pub fn url(&self) -> String {
        match self.port {
            Some(port) => format!("http://{}:{}", self.host, port),
            None => format!("http://{}", self.host),
        }
    }
}

/// Encoding used for the notice body on the wire.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WireFormat {
    #[default]
    Yaml,
    Json,
}

impl WireFormat {
    pub fn content_type(&self) -> &'static str {
        match self {
            WireFormat::Yaml => "application/x-yaml",
            WireFormat::Json => "application/json",
        }
    }

    /// Value of the `Accept` header sent with each notice.
    pub fn accept(&self) -> &'static str {
        "text/xml, application/xml"
    }
}

/// A user agent to ignore: either an exact string or a regular expression.
///
/// In configuration files a value wrapped in slashes (`/bot/`) is read as a
/// regular expression. Use inline flags for options, e.g. `/(?i)bot/`.
#[derive(Clone)]
pub enum UserAgentPattern {
    Exact(String),
    Regex(Regex),
}

impl UserAgentPattern {
    /// Compiles a regular-expression pattern.
    pub fn regex(pattern: &str) -> Result<Self, NoticeError> {
        Regex::new(pattern)
            .map(UserAgentPattern::Regex)
            .map_err(|e| NoticeError::InvalidPattern {
                pattern: pattern.to_string(),
                reason: e.to_string(),
            })
    }

    /// Parses the configuration-file form: `/re/` for a regex, else exact.
    ///
    /// `//` has no pattern between the slashes and is taken literally; an
    /// empty regex would match every user agent.
    pub fn parse(raw: &str) -> Result<Self, NoticeError> {
        match raw
            .strip_prefix('/')
            .and_then(|rest| rest.strip_suffix('/'))
        {
            Some(inner) if !inner.is_empty() => Self::regex(inner),
            _ => Ok(UserAgentPattern::Exact(raw.to_string())),
        }
    }

    pub fn matches(&self, user_agent: &str) -> bool {
        match self {
            UserAgentPattern::Exact(s) => s == user_agent,
            UserAgentPattern::Regex(re) => re.is_match(user_agent),
        }
    }
}

impl fmt::Display for UserAgentPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserAgentPattern::Exact(s) => f.write_str(s),
            UserAgentPattern::Regex(re) => write!(f, "/{}/", re.as_str()),
        }
    }
}

impl fmt::Debug for UserAgentPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UserAgentPattern({self})")
    }
}

impl From<&str> for UserAgentPattern {
    fn from(s: &str) -> Self {
        UserAgentPattern::Exact(s.to_string())
    }
}

impl From<Regex> for UserAgentPattern {
    fn from(re: Regex) -> Self {
        UserAgentPattern::Regex(re)
    }
}

impl Serialize for UserAgentPattern {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for UserAgentPattern {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        UserAgentPattern::parse(&raw).map_err(D::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Reporter configuration.
///
/// Construct once at startup (via [`ConfigBuilder`], [`Configuration::load`]
/// or `Default`) and hand it to the notifier. Accessors compute defaults on
/// every read, so later mutations are always observed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Configuration {
    host: Option<String>,
    port: Option<u16>,
    secure: bool,
    api_key: Option<String>,
    /// Connection open timeout in seconds.
    open_timeout: Option<u64>,
    /// Response read timeout in seconds.
    read_timeout: Option<u64>,
    proxy: Option<ProxyConfig>,
    verbose: bool,
    /// Deployment environment name, e.g. `production` or `test`.
    environment_name: String,
    /// Host project directory rewritten out of backtraces.
    project_root: Option<PathBuf>,
    wire_format: WireFormat,
    params_filters: Vec<String>,
    environment_filters: Vec<String>,
    ignore: Vec<String>,
    ignore_user_agent: Vec<UserAgentPattern>,
    #[serde(skip)]
    backtrace_filters: BacktraceFilters,
}

impl Default for Configuration {
    fn default() -> Self {
        let project_root = std::env::current_dir().ok();
        let backtrace_filters = BacktraceFilters::with_defaults(project_root.as_deref());
        Self {
            host: None,
            port: None,
            secure: false,
            api_key: None,
            open_timeout: None,
            read_timeout: None,
            proxy: None,
            verbose: false,
            environment_name: std::env::var("FAULTLINE_ENV")
                .unwrap_or_else(|_| "production".to_string()),
            project_root,
            wire_format: WireFormat::default(),
            params_filters: PARAMS_FILTERS_DEFAULT.iter().map(|s| s.to_string()).collect(),
            environment_filters: Vec::new(),
            ignore: IGNORE_DEFAULT.iter().map(|s| s.to_string()).collect(),
            ignore_user_agent: Vec::new(),
            backtrace_filters,
        }
    }
}

impl Configuration {
    /// Load configuration from a YAML file at `path`.
    ///
    /// Absent fields keep their defaults. The default backtrace filter chain
    /// is installed using the loaded project root.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Configuration = serde_yaml::from_str(&content)?;
        config.add_default_filters();
        Ok(config)
    }

    /// Try to load from `path`; fall back to [`Configuration::default`] on any error.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "Using default configuration");
                Self::default()
            }
        }
    }

    /// Platform-appropriate default path for the configuration file.
    ///
    /// Typically `$XDG_CONFIG_HOME/faultline/config.yaml` on Linux.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("faultline")
            .join("config.yaml")
    }

    // --- endpoint ---

    pub fn host(&self) -> &str {
        self.host.as_deref().unwrap_or(DEFAULT_HOST)
    }

    pub fn set_host(&mut self, host: impl Into<String>) {
        self.host = Some(host.into());
    }

    /// Configured port, or 443/80 depending on [`secure`](Self::secure).
    pub fn port(&self) -> u16 {
        self.port.unwrap_or(if self.secure { 443 } else { 80 })
    }

    pub fn set_port(&mut self, port: u16) {
        self.port = Some(port);
    }

    pub fn secure(&self) -> bool {
        self.secure
    }

    pub fn set_secure(&mut self, secure: bool) {
        self.secure = secure;
    }

    pub fn protocol(&self) -> &'static str {
        if self.secure {
            "https"
        } else {
            "http"
        }
    }

    /// Full collector URL notices are posted to.
    pub fn url(&self) -> String {
        format!(
            "{}://{}:{}{}",
            self.protocol(),
            self.host(),
            self.port(),
            NOTICES_PATH
        )
    }

    // --- credentials ---

    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref()
    }

    pub fn set_api_key(&mut self, api_key: impl Into<String>) {
        self.api_key = Some(api_key.into());
    }

    // --- timeouts ---

    pub fn open_timeout(&self) -> Duration {
        Duration::from_secs(self.open_timeout.unwrap_or(DEFAULT_OPEN_TIMEOUT_SECS))
    }

    pub fn set_open_timeout(&mut self, seconds: u64) {
        self.open_timeout = Some(seconds);
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout.unwrap_or(DEFAULT_READ_TIMEOUT_SECS))
    }

    pub fn set_read_timeout(&mut self, seconds: u64) {
        self.read_timeout = Some(seconds);
    }

    // --- proxy ---

    pub fn proxy(&self) -> Option<&ProxyConfig> {
        self.proxy.as_ref()
    }

    pub fn set_proxy(&mut self, proxy: Option<ProxyConfig>) {
        self.proxy = proxy;
    }

    // --- logging / environment ---

    pub fn verbose(&self) -> bool {
        self.verbose
    }

    pub fn set_verbose(&mut self, verbose: bool) {
        self.verbose = verbose;
    }

    pub fn environment_name(&self) -> &str {
        &self.environment_name
    }

    pub fn set_environment_name(&mut self, name: impl Into<String>) {
        self.environment_name = name.into();
    }

    /// False for development and test environments.
    pub fn is_public_environment(&self) -> bool {
        !PRIVATE_ENVIRONMENTS.contains(&self.environment_name.as_str())
    }

    pub fn project_root(&self) -> Option<&Path> {
        self.project_root.as_deref()
    }

    /// Sets the project root. Takes effect for backtraces the next time the
    /// default filters are installed.
    pub fn set_project_root(&mut self, root: impl Into<PathBuf>) {
        self.project_root = Some(root.into());
    }

    pub fn wire_format(&self) -> WireFormat {
        self.wire_format
    }

    pub fn set_wire_format(&mut self, format: WireFormat) {
        self.wire_format = format;
    }

    // --- filter lists ---

    pub fn params_filters(&self) -> &[String] {
        &self.params_filters
    }

    pub fn params_filters_mut(&mut self) -> &mut Vec<String> {
        &mut self.params_filters
    }

    pub fn environment_filters(&self) -> &[String] {
        &self.environment_filters
    }

    pub fn environment_filters_mut(&mut self) -> &mut Vec<String> {
        &mut self.environment_filters
    }

    // --- ignore lists ---

    pub fn ignore(&self) -> &[String] {
        &self.ignore
    }

    pub fn ignore_mut(&mut self) -> &mut Vec<String> {
        &mut self.ignore
    }

    /// Replaces the ignored fault types with exactly `names`.
    pub fn ignore_only<I, S>(&mut self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ignore = names.into_iter().map(Into::into).collect();
    }

    pub fn ignore_user_agent(&self) -> &[UserAgentPattern] {
        &self.ignore_user_agent
    }

    pub fn ignore_user_agent_mut(&mut self) -> &mut Vec<UserAgentPattern> {
        &mut self.ignore_user_agent
    }

    /// Replaces the ignored user agents with exactly `patterns`.
    pub fn ignore_user_agent_only<I, P>(&mut self, patterns: I)
    where
        I: IntoIterator<Item = P>,
        P: Into<UserAgentPattern>,
    {
        self.ignore_user_agent = patterns.into_iter().map(Into::into).collect();
    }

    // --- backtrace filters ---

    pub fn backtrace_filters(&self) -> &BacktraceFilters {
        &self.backtrace_filters
    }

    pub fn backtrace_filters_mut(&mut self) -> &mut BacktraceFilters {
        &mut self.backtrace_filters
    }

    /// Appends a line filter to the backtrace chain.
    pub fn filter_backtrace<F>(&mut self, filter: F)
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        self.backtrace_filters.push(filter);
    }

    /// Clears the backtrace chain and reinstalls the default filters.
    pub fn add_default_filters(&mut self) {
        let mut chain = BacktraceFilters::new();
        chain.install_defaults(
            self.project_root.as_deref(),
            &crate::backtrace::dependency_roots(),
        );
        self.backtrace_filters = chain;
    }
}

// ---------------------------------------------------------------------------
// ConfigBuilder
// ---------------------------------------------------------------------------

/// Builder for constructing a [`Configuration`] programmatically.
///
/// Starts from [`Configuration::default`] and allows selective overrides.
///
/// # Example
///
/// ```rust,no_run
/// use faultline_core::config::ConfigBuilder;
///
/// let config = ConfigBuilder::new()
///     .api_key("1234567890abcdef")
///     .secure(true)
///     .params_filter("credit_card")
///     .build();
/// assert_eq!(config.port(), 443);
/// ```
#[derive(Clone)]
pub struct ConfigBuilder {
    config: Configuration,
    extra_filters: Vec<BacktraceFilter>,
}

impl ConfigBuilder {
    /// Create a new builder initialised with [`Configuration::default`] values.
    pub fn new() -> Self {
        Self {
            config: Configuration::default(),
            extra_filters: Vec::new(),
        }
    }

    // --- endpoint ---

    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.set_host(host);
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.config.set_port(port);
        self
    }

    pub fn secure(mut self, secure: bool) -> Self {
        self.config.set_secure(secure);
        self
    }

    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.config.set_api_key(api_key);
        self
    }

    // --- timeouts ---

    pub fn open_timeout(mut self, seconds: u64) -> Self {
        self.config.set_open_timeout(seconds);
        self
    }

    pub fn read_timeout(mut self, seconds: u64) -> Self {
        self.config.set_read_timeout(seconds);
        self
    }

    // --- proxy ---

    pub fn proxy(mut self, proxy: ProxyConfig) -> Self {
        self.config.set_proxy(Some(proxy));
        self
    }

    // --- environment ---

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.config.set_verbose(verbose);
        self
    }

    pub fn environment_name(mut self, name: impl Into<String>) -> Self {
        self.config.set_environment_name(name);
        self
    }

    pub fn project_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.config.set_project_root(root);
        self
    }

    pub fn wire_format(mut self, format: WireFormat) -> Self {
        self.config.set_wire_format(format);
        self
    }

    // --- lists ---

    pub fn params_filter(mut self, pattern: impl Into<String>) -> Self {
        self.config.params_filters.push(pattern.into());
        self
    }

    pub fn environment_filter(mut self, pattern: impl Into<String>) -> Self {
        self.config.environment_filters.push(pattern.into());
        self
    }

    pub fn ignore(mut self, name: impl Into<String>) -> Self {
        self.config.ignore.push(name.into());
        self
    }

    pub fn ignore_only<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.ignore_only(names);
        self
    }

    pub fn ignore_user_agent(mut self, pattern: impl Into<UserAgentPattern>) -> Self {
        self.config.ignore_user_agent.push(pattern.into());
        self
    }

    /// Registers a backtrace filter to run after the default chain.
    pub fn filter_backtrace<F>(mut self, filter: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        self.extra_filters.push(std::sync::Arc::new(filter));
        self
    }

    // --- build ---

    /// Consume the builder and return the finished [`Configuration`].
    pub fn build(self) -> Configuration {
        let mut config = self.config;
        config.add_default_filters();
        for filter in self.extra_filters {
            config.backtrace_filters.push_shared(filter);
        }
        config
    }
}

impl fmt::Debug for ConfigBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigBuilder")
            .field("config", &self.config)
            .field("extra_filters", &self.extra_filters.len())
            .finish()
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
