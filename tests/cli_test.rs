//! CLI argument parsing and configuration failure tests.

use assert_cmd::Command;
use predicates::prelude::*;

/// Get the tripcheck binary command, stripped of any shim configuration
/// leaking in from the environment.
fn tripcheck() -> Command {
    let mut cmd = Command::cargo_bin("tripcheck").unwrap();
    cmd.env_remove("SHIM_CONFIG")
        .env_remove("SHIM_MODULE")
        .env_remove("SHIM_URL");
    cmd
}

mod help {
    use super::*;

    #[test]
    fn shows_help() {
        tripcheck()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("tripcheck"))
            .stdout(predicate::str::contains("run"))
            .stdout(predicate::str::contains("list"));
    }

    #[test]
    fn shows_version() {
        tripcheck()
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
    }

    #[test]
    fn help_shows_global_backend_options() {
        tripcheck()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("--module"))
            .stdout(predicate::str::contains("--url"));
    }

    #[test]
    fn run_help_shows_filter_option() {
        tripcheck()
            .args(["run", "--help"])
            .assert()
            .success()
            .stdout(predicate::str::contains("--filter"));
    }
}

mod list_command {
    use super::*;

    #[test]
    fn lists_every_registered_scenario() {
        tripcheck()
            .arg("list")
            .assert()
            .success()
            .stdout(predicate::str::contains("Available scenarios:"))
            .stdout(predicate::str::contains("price-sorting-single-page"))
            .stdout(predicate::str::contains("price-sorting-multiple-pages"));
    }

    /// Listing never needs a resolved backend configuration.
    #[test]
    fn list_works_without_any_configuration() {
        tripcheck().arg("list").assert().success();
    }
}

mod run_command {
    use super::*;

    /// An unmatched filter ends the run before any backend is built, so no
    /// site url is required.
    #[test]
    fn unmatched_filter_is_a_no_op() {
        tripcheck()
            .args(["run", "--filter", "nonexistent"])
            .assert()
            .success()
            .stdout(predicate::str::contains("No scenarios match"));
    }

    /// The configuration error names every valid backend kind.
    #[test]
    fn rejects_an_unknown_backend_module() {
        tripcheck()
            .arg("run")
            .env("SHIM_MODULE", "NoSuchBrowser")
            .assert()
            .failure()
            .stderr(predicate::str::contains("valid modules are"))
            .stderr(predicate::str::contains("DirectHttpBrowser"))
            .stderr(predicate::str::contains("RemoteDriverBrowser"));
    }

    #[test]
    fn module_flag_rejects_unknown_values_too() {
        tripcheck()
            .args(["--module", "Playwright", "run"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("valid modules are"));
    }

    #[test]
    fn requires_a_site_url() {
        tripcheck()
            .arg("run")
            .env("SHIM_MODULE", "DirectHttpBrowser")
            .assert()
            .failure()
            .stderr(predicate::str::contains("required setting 'url' is missing"));
    }

    #[test]
    fn a_dangling_config_document_is_reported() {
        tripcheck()
            .arg("run")
            .env("SHIM_CONFIG", "/nonexistent/shim.toml")
            .assert()
            .failure()
            .stderr(predicate::str::contains("/nonexistent/shim.toml"));
    }
}
