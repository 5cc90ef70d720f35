//! Page objects for the travel search site.
//!
//! Each page wraps a borrowed [`BrowserActor`](crate::shim::BrowserActor) and
//! exposes the handful of flows scenarios compose. Locators live here as
//! constants so a markup change touches one file.

pub mod base;
pub mod results;
pub mod search;

pub use results::ResultsPage;
pub use search::SearchPage;
