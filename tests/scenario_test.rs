//! The sorting scenarios end to end against a fixture site, in process and
//! through the binary.

mod common;

use common::{FixtureSite, StubResponse};
use tripcheck::config::{EnvVars, Settings};
use tripcheck::scenarios::{self, Scenario};
use tripcheck::shim::BrowserActor;

const HOME_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head><title>Travel Search</title></head>
<body>
<h1>Where do you want to go?</h1>
<form id="search-form" action="/search" method="get">
  <input id="from_filter" name="from" value="" />
  <input id="to_filter" name="to" value="" />
  <button id="search-form__submit-btn" type="submit">Search</button>
</form>
</body>
</html>"#;

const BROKEN_HOME_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head><title>Travel Search</title></head>
<body>
<div class="error-banner">HTTP 504 - upstream search timed out</div>
<form id="search-form" action="/search" method="get">
  <input id="from_filter" name="from" value="" />
  <input id="to_filter" name="to" value="" />
  <button id="search-form__submit-btn" type="submit">Search</button>
</form>
</body>
</html>"#;

/// Results page with one train result per `(units, cents)` fare. The results
/// container holds nothing but result rows so positional probing lines up.
fn results_page(sort_href: &str, fares: &[(&str, &str)], next_href: Option<&str>) -> String {
    let rows: String = fares
        .iter()
        .map(|(units, cents)| {
            format!(
                "<div class=\"result\"><span class=\"currency-beforecomma\">{units}</span>,<span class=\"currency-decimals\">{cents}</span> EUR</div>"
            )
        })
        .collect();
    let pagination = next_href
        .map(|href| {
            format!("<ul class=\"pagination\"><li><a rel=\"next\" href=\"{href}\">Next</a></li></ul>")
        })
        .unwrap_or_default();
    format!(
        r#"<!DOCTYPE html>
<html>
<head><title>Results</title></head>
<body>
<a id="sortby-price" href="{sort_href}">Price</a>
<div id="results-train">{rows}</div>
{pagination}
</body>
</html>"#
    )
}

async fn actor_for(site: &FixtureSite) -> BrowserActor {
    let supplied = Settings {
        module: Some("DirectHttpBrowser".to_string()),
        url: Some(site.url()),
        ..Settings::default()
    };
    BrowserActor::new(supplied, &EnvVars::default())
        .await
        .expect("construct actor")
}

fn scenario(name: &str) -> Scenario {
    scenarios::all()
        .into_iter()
        .find(|s| s.name == name)
        .unwrap_or_else(|| panic!("unknown scenario '{name}'"))
}

fn prague_routes(fares: &[(&str, &str)]) -> Vec<(&'static str, StubResponse)> {
    vec![
        (
            "to=Prague",
            StubResponse::html(results_page("?to=Prague&sort=price", fares, None)),
        ),
        ("/", StubResponse::html(HOME_PAGE)),
    ]
}

#[tokio::test]
async fn ascending_fares_on_a_single_page_pass() {
    let site = FixtureSite::serve(prague_routes(&[
        ("9", "99"),
        ("19", "50"),
        ("19", "50"),
        ("120", "00"),
    ]))
    .await;
    let actor = actor_for(&site).await;

    scenario("price-sorting-single-page")
        .run(&actor)
        .await
        .expect("ascending fares hold");
}

/// Equal neighbours are fine; only a drop fails, and the check carries the
/// last fare of one page into the first fare of the next.
#[tokio::test]
async fn ascending_fares_across_pages_pass() {
    let site = FixtureSite::serve(vec![
        (
            "/search/2",
            StubResponse::html(results_page(
                "?to=Munich&sort=price",
                &[("21", "00"), ("35", "10")],
                None,
            )),
        ),
        (
            "to=Munich",
            StubResponse::html(results_page(
                "?to=Munich&sort=price",
                &[("10", "00"), ("20", "50")],
                Some("/search/2"),
            )),
        ),
        ("/", StubResponse::html(HOME_PAGE)),
    ])
    .await;
    let actor = actor_for(&site).await;

    scenario("price-sorting-multiple-pages")
        .run(&actor)
        .await
        .expect("fares keep ascending across pages");
}

#[tokio::test]
async fn a_fare_drop_fails_the_scenario() {
    let site = FixtureSite::serve(prague_routes(&[("30", "00"), ("9", "99")])).await;
    let actor = actor_for(&site).await;

    let err = scenario("price-sorting-single-page")
        .run(&actor)
        .await
        .expect_err("fares dropped");

    let message = err.to_string();
    assert!(message.contains("is below"), "unexpected failure: {message}");
}

#[tokio::test]
async fn an_error_banner_on_the_home_page_fails_the_scenario() {
    let site = FixtureSite::serve(vec![("/", StubResponse::html(BROKEN_HOME_PAGE))]).await;
    let actor = actor_for(&site).await;

    let err = scenario("price-sorting-single-page")
        .run(&actor)
        .await
        .expect_err("error banner visible");

    assert!(err.to_string().contains("did not expect to see 'HTTP 504'"));
}

mod binary {
    use super::*;
    use assert_cmd::Command;
    use predicates::prelude::*;

    /// `tripcheck run` against the fixture site through the real binary.
    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn run_command_reports_a_passing_scenario() {
        let site = FixtureSite::serve(prague_routes(&[
            ("9", "99"),
            ("19", "50"),
            ("120", "00"),
        ]))
        .await;
        let url = site.url();

        let assert = tokio::task::spawn_blocking(move || {
            Command::cargo_bin("tripcheck")
                .expect("binary exists")
                .args(["run", "--filter", "single-page"])
                .env_remove("SHIM_CONFIG")
                .env("SHIM_MODULE", "DirectHttpBrowser")
                .env("SHIM_URL", url)
                .assert()
        })
        .await
        .expect("run binary");

        assert
            .success()
            .stdout(predicate::str::contains("price-sorting-single-page"))
            .stdout(predicate::str::contains("1 passed, 0 failed"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn run_command_fails_when_a_scenario_fails() {
        let site = FixtureSite::serve(prague_routes(&[("30", "00"), ("9", "99")])).await;
        let url = site.url();

        let assert = tokio::task::spawn_blocking(move || {
            Command::cargo_bin("tripcheck")
                .expect("binary exists")
                .args(["run", "--filter", "single-page"])
                .env_remove("SHIM_CONFIG")
                .env("SHIM_MODULE", "DirectHttpBrowser")
                .env("SHIM_URL", url)
                .assert()
        })
        .await
        .expect("run binary");

        assert
            .failure()
            .stdout(predicate::str::contains("0 passed, 1 failed"));
    }
}
