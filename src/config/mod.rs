use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use figment::providers::{Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::error::{Result, ShimError};

/// Environment variable naming an external TOML document merged over
/// caller-supplied settings.
pub const ENV_CONFIG: &str = "SHIM_CONFIG";
/// Environment override for the backend module kind.
pub const ENV_MODULE: &str = "SHIM_MODULE";
/// Environment override for the site base URL.
pub const ENV_URL: &str = "SHIM_URL";
/// Environment override for the WebDriver browser name.
pub const ENV_WD_BROWSER: &str = "SHIM_WD_BROWSER";
/// Environment override for the WebDriver window size.
pub const ENV_WD_SIZE: &str = "SHIM_WD_SIZE";

const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// The two backend kinds the harness can drive. Closed on purpose: every
/// capability decision in the shim matches exhaustively on this enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BackendKind {
    #[serde(rename = "DirectHttpBrowser")]
    DirectHttp,
    #[serde(rename = "RemoteDriverBrowser")]
    RemoteDriver,
}

impl BackendKind {
    pub const ALL: [BackendKind; 2] = [BackendKind::DirectHttp, BackendKind::RemoteDriver];

    /// Canonical module name as it appears in configuration.
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::DirectHttp => "DirectHttpBrowser",
            BackendKind::RemoteDriver => "RemoteDriverBrowser",
        }
    }

    fn parse(value: Option<&str>) -> Result<Self> {
        let valid = Self::ALL.map(|kind| kind.as_str()).join(", ");
        match value {
            Some(v) if v == BackendKind::DirectHttp.as_str() => Ok(BackendKind::DirectHttp),
            Some(v) if v == BackendKind::RemoteDriver.as_str() => Ok(BackendKind::RemoteDriver),
            Some(v) => Err(ShimError::Configuration(format!(
                "unknown backend module '{v}'; valid modules are: {valid}"
            ))),
            None => Err(ShimError::Configuration(format!(
                "no backend module configured; valid modules are: {valid}"
            ))),
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of the process environment, injected rather than read ambiently
/// so configuration resolution stays a pure function of its inputs. Variables
/// set to an empty string count as unset.
#[derive(Debug, Clone, Default)]
pub struct EnvVars(BTreeMap<String, String>);

impl EnvVars {
    pub fn from_process() -> Self {
        Self(std::env::vars().collect())
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .get(key)
            .map(String::as_str)
            .filter(|value| !value.is_empty())
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for EnvVars {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// Caller-supplied settings. Every field is optional; unset fields fall back
/// to built-in defaults, the `SHIM_CONFIG` document or environment overrides.
/// `None` fields are skipped during serialization so a sparse layer never
/// erases values from the layers below it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub module: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    #[serde(default)]
    pub http: HttpSettings,

    #[serde(default)]
    pub webdriver: WebDriverSettings,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HttpSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,

    /// Directory that `attach_file` resolves relative paths against.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WebDriverSettings {
    /// WebDriver endpoint, e.g. a local geckodriver or a Selenium hub.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_url: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub browser: Option<String>,

    /// Either `maximize` or a `WIDTHxHEIGHT` literal.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub window_size: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub headless: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub screenshots_dir: Option<PathBuf>,

    /// Directory that `attach_file` resolves relative paths against.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
}

fn builtin_defaults() -> Settings {
    Settings {
        module: Some(BackendKind::DirectHttp.as_str().to_string()),
        ..Settings::default()
    }
}

fn default_server_url() -> String {
    "http://localhost:4444".to_string()
}

fn default_browser() -> String {
    "firefox".to_string()
}

/// Fully resolved configuration. The shared site `url` is injected into both
/// backend option structs so each backend can be constructed from its own
/// options alone.
#[derive(Debug, Clone)]
pub struct ShimConfig {
    pub module: BackendKind,
    pub url: String,
    pub http: HttpOptions,
    pub webdriver: WebDriverOptions,
}

#[derive(Debug, Clone)]
pub struct HttpOptions {
    pub url: String,
    pub timeout: Duration,
    pub data_dir: PathBuf,
}

#[derive(Debug, Clone)]
pub struct WebDriverOptions {
    pub url: String,
    pub server_url: String,
    pub browser: String,
    pub window_size: Option<String>,
    pub headless: bool,
    pub screenshots_dir: PathBuf,
    pub data_dir: PathBuf,
}

impl ShimConfig {
    /// Resolve the effective configuration: built-in defaults, then
    /// caller-supplied settings, then the TOML document named by
    /// `SHIM_CONFIG`, then single-key environment overrides. A non-empty
    /// environment value always wins.
    pub fn resolve(supplied: Settings, env: &EnvVars) -> Result<Self> {
        let mut figment = Figment::new()
            .merge(Serialized::defaults(builtin_defaults()))
            .merge(Serialized::defaults(supplied));

        if let Some(path) = env.get(ENV_CONFIG) {
            if !Path::new(path).is_file() {
                return Err(ShimError::Configuration(format!(
                    "{ENV_CONFIG} points at '{path}' which does not exist"
                )));
            }
            figment = figment.merge(Toml::file(path));
        }

        let mut settings: Settings = figment
            .extract()
            .map_err(|e| ShimError::Configuration(e.to_string()))?;

        if let Some(module) = env.get(ENV_MODULE) {
            settings.module = Some(module.to_string());
        }
        if let Some(url) = env.get(ENV_URL) {
            settings.url = Some(url.to_string());
        }

        let module = BackendKind::parse(settings.module.as_deref())?;

        let url = settings
            .url
            .filter(|u| !u.is_empty())
            .ok_or_else(|| {
                ShimError::Configuration("required setting 'url' is missing".to_string())
            })?;

        let mut webdriver = WebDriverOptions {
            url: url.clone(),
            server_url: settings
                .webdriver
                .server_url
                .unwrap_or_else(default_server_url),
            browser: settings.webdriver.browser.unwrap_or_else(default_browser),
            window_size: settings.webdriver.window_size,
            headless: settings.webdriver.headless.unwrap_or(false),
            screenshots_dir: settings
                .webdriver
                .screenshots_dir
                .unwrap_or_else(|| PathBuf::from("screenshots")),
            data_dir: settings
                .webdriver
                .data_dir
                .unwrap_or_else(|| PathBuf::from("tests/data")),
        };

        // Browser and window size can be forced from the environment, but
        // only when the resolved module actually is the WebDriver one.
        if module == BackendKind::RemoteDriver {
            if let Some(browser) = env.get(ENV_WD_BROWSER) {
                webdriver.browser = browser.to_string();
            }
            if let Some(size) = env.get(ENV_WD_SIZE) {
                webdriver.window_size = Some(size.to_string());
            }
        }

        let http = HttpOptions {
            url: url.clone(),
            timeout: Duration::from_secs(
                settings
                    .http
                    .timeout_secs
                    .unwrap_or(DEFAULT_HTTP_TIMEOUT_SECS),
            ),
            data_dir: settings
                .http
                .data_dir
                .unwrap_or_else(|| PathBuf::from("tests/data")),
        };

        Ok(Self {
            module,
            url,
            http,
            webdriver,
        })
    }
}
