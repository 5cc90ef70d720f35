//! The browser shim: one actor surface over two automation backends.
//!
//! `BrowserActor` owns exactly one backend, selected by configuration, and
//! re-exposes the union of both backends' operations behind the capability
//! table in [`capability`]. Instructions run through [`runner::CommandRunner`],
//! which absorbs transient stale-element failures.

pub mod actor;
pub mod backend;
pub mod capability;
pub mod http;
pub mod runner;
pub mod webdriver;

pub use actor::BrowserActor;
pub use backend::{
    Browser, ElementPredicate, HttpEngineCall, SessionCookie, SessionData, WebDriverCall,
};
pub use capability::{Capability, Operation};
pub use runner::{CommandRunner, DEFAULT_CALL_TRIES, DEFAULT_RETRY_INTERVAL};

use regex::Regex;
use reqwest::Url;

use crate::error::{Result, ShimError};

/// Scope annotation for assertion messages, empty when unscoped.
pub(crate) fn scope_suffix(selector: Option<&str>) -> String {
    selector.map(|s| format!(" in '{s}'")).unwrap_or_default()
}

/// Path plus query of a URL, the shape URL assertions compare against.
pub(crate) fn relative_uri(url: &Url) -> String {
    match url.query() {
        Some(query) => format!("{}?{query}", url.path()),
        None => url.path().to_string(),
    }
}

pub(crate) fn compile_pattern(pattern: &str) -> Result<Regex> {
    Regex::new(pattern)
        .map_err(|e| ShimError::Configuration(format!("invalid pattern '{pattern}': {e}")))
}

/// Whole URI when no pattern is given, otherwise the first capture group
/// (or the whole match) of the pattern applied to it.
pub(crate) fn grab_from_uri(uri: &str, pattern: Option<&str>) -> Result<String> {
    match pattern {
        None => Ok(uri.to_string()),
        Some(p) => {
            let re = compile_pattern(p)?;
            let caps = re.captures(uri).ok_or_else(|| {
                ShimError::assertion(format!("'{p}' does not match current uri '{uri}'"))
            })?;
            let m = caps.get(1).or_else(|| caps.get(0));
            Ok(m.map(|m| m.as_str().to_string()).unwrap_or_default())
        }
    }
}

/// Replaces the leftmost host label of `base` with `subdomain`, or prepends
/// it when the host has no label to replace.
pub(crate) fn rewrite_subdomain(base: &Url, subdomain: &str) -> Result<Url> {
    let mut rebased = base.clone();
    let host = rebased.host_str().unwrap_or_default().to_string();
    let parts: Vec<&str> = host.split('.').collect();
    let rewritten = if parts.len() > 2 {
        format!("{subdomain}.{}", parts[1..].join("."))
    } else {
        format!("{subdomain}.{host}")
    };
    rebased
        .set_host(Some(&rewritten))
        .map_err(|e| ShimError::Configuration(format!("invalid subdomain '{subdomain}': {e}")))?;
    Ok(rebased)
}
