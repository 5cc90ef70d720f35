//! Tripcheck drives acceptance scenarios against the travel search site
//! through a single browser-shaped surface. The shim behind that surface is
//! either a direct HTTP client parsing server-rendered pages or a remote
//! WebDriver session, selected at startup from configuration.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod pages;
pub mod scenarios;
pub mod shim;
