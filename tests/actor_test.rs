//! Actor dispatch: arguments and results pass through to the backend
//! unchanged, and the derived operations pick the right primitive per kind.

mod common;

use common::{actor_over, entries, RecordingBrowser};
use tripcheck::config::BackendKind;
use tripcheck::error::ShimError;
use tripcheck::shim::SessionData;

#[tokio::test]
async fn arguments_reach_the_backend_verbatim() {
    let browser = RecordingBrowser::new(BackendKind::RemoteDriver)
        .text_at("#price", "19,50 EUR");
    let log = browser.log();
    let actor = actor_over(browser);

    actor.am_on_url("http://site.test/search").await.expect("am_on_url");
    actor
        .click("Next", Some(".pagination"))
        .await
        .expect("scoped click");
    let price = actor.grab_text_from("#price").await.expect("grab_text_from");
    assert_eq!(price, "19,50 EUR");

    assert_eq!(
        entries(&log),
        vec![
            "am_on_url(http://site.test/search)",
            "click(Next, .pagination)",
            "grab_text_from(#price)",
        ]
    );
}

#[tokio::test]
async fn backend_errors_pass_through_unwrapped() {
    let browser = RecordingBrowser::new(BackendKind::DirectHttp);
    let actor = actor_over(browser);

    let err = actor
        .grab_text_from("#nowhere")
        .await
        .expect_err("selector has no scripted text");

    match err {
        ShimError::ElementNotFound(selector) => assert_eq!(selector, "#nowhere"),
        other => panic!("expected ElementNotFound, got {other:?}"),
    }
}

/// Zero seconds is a valid pause and must still reach the backend.
#[tokio::test]
async fn wait_zero_is_forwarded() {
    let browser = RecordingBrowser::new(BackendKind::DirectHttp);
    let log = browser.log();
    let actor = actor_over(browser);

    actor.wait(0).await.expect("wait(0) succeeds");

    assert_eq!(entries(&log), vec!["wait(0)"]);
}

mod element_exists {
    use super::*;

    /// On the HTTP emulation the probe is the visibility assertion, demoted
    /// to a boolean.
    #[tokio::test]
    async fn direct_http_answers_via_see_element() {
        let browser = RecordingBrowser::new(BackendKind::DirectHttp);
        let log = browser.log();
        let actor = actor_over(browser);

        let found = actor.element_exists(".result").await.expect("probe");

        assert!(found);
        assert_eq!(entries(&log), vec!["see_element(.result)"]);
    }

    #[tokio::test]
    async fn direct_http_reports_a_missing_element_as_false() {
        let browser = RecordingBrowser::new(BackendKind::DirectHttp).missing(".result");
        let actor = actor_over(browser);

        let found = actor.element_exists(".result").await.expect("probe");

        assert!(!found);
    }

    /// Only the assertion outcome is demoted. A selector the engine cannot
    /// parse is a real error and must propagate.
    #[tokio::test]
    async fn direct_http_propagates_selector_errors() {
        let browser = RecordingBrowser::new(BackendKind::DirectHttp).poisoned("div[[");
        let actor = actor_over(browser);

        let err = actor
            .element_exists("div[[")
            .await
            .expect_err("unparseable selector");

        assert!(matches!(err, ShimError::Selector(_)));
    }

    /// The remote driver counts DOM matches instead.
    #[tokio::test]
    async fn remote_driver_answers_via_count_elements() {
        let browser = RecordingBrowser::new(BackendKind::RemoteDriver).counting(".result", 3);
        let log = browser.log();
        let actor = actor_over(browser);

        let found = actor.element_exists(".result").await.expect("probe");

        assert!(found);
        assert_eq!(entries(&log), vec!["count_elements(.result)"]);
    }

    #[tokio::test]
    async fn remote_driver_reports_zero_matches_as_false() {
        let browser = RecordingBrowser::new(BackendKind::RemoteDriver).counting(".result", 0);
        let actor = actor_over(browser);

        let found = actor.element_exists(".result").await.expect("probe");

        assert!(!found);
    }
}

mod session {
    use super::*;

    /// Cookies survive a backup, a wipe, and a restore.
    #[tokio::test]
    async fn backup_and_restore_round_trip() {
        let browser = RecordingBrowser::new(BackendKind::DirectHttp);
        let actor = actor_over(browser);

        actor.set_cookie("sid", "k9").await.expect("set_cookie");
        let snapshot = actor.backup_session_data().await.expect("backup");
        actor.reset_cookie("sid").await.expect("reset_cookie");
        assert_eq!(actor.grab_cookie("sid").await.expect("grab"), None);

        actor.load_session_data(&snapshot).await.expect("restore");
        assert_eq!(
            actor.grab_cookie("sid").await.expect("grab"),
            Some("k9".to_string())
        );
    }

    #[tokio::test]
    async fn initialize_session_starts_clean() {
        let browser = RecordingBrowser::new(BackendKind::RemoteDriver);
        let actor = actor_over(browser);

        actor.set_cookie("sid", "k9").await.expect("set_cookie");
        actor.initialize_session().await.expect("initialize_session");

        let err = actor.see_cookie("sid").await.expect_err("cookie was wiped");
        assert!(matches!(err, ShimError::AssertionFailed(_)));
    }

    #[tokio::test]
    async fn session_data_is_plain_data() {
        let data = SessionData::default();
        assert!(data.cookies.is_empty());
        assert_eq!(data.url, None);
    }
}

mod lifecycle {
    use super::*;

    /// Hooks are forwarded with their test name and bypass the retry loop.
    #[tokio::test]
    async fn hooks_reach_the_backend_in_order() {
        let browser = RecordingBrowser::new(BackendKind::DirectHttp);
        let log = browser.log();
        let actor = actor_over(browser);

        actor.initialize().await.expect("initialize");
        actor.before_suite().await.expect("before_suite");
        actor.before_test("sorting").await.expect("before_test");
        actor.before_step("click sort").await.expect("before_step");
        actor.after_step("click sort").await.expect("after_step");
        actor.on_failure("sorting").await.expect("on_failure");
        actor.after_test("sorting").await.expect("after_test");
        actor.after_suite().await.expect("after_suite");
        actor.cleanup().await.expect("cleanup");

        assert_eq!(
            entries(&log),
            vec![
                "initialize",
                "before_suite",
                "before_test(sorting)",
                "before_step(click sort)",
                "after_step(click sort)",
                "on_failure(sorting)",
                "after_test(sorting)",
                "after_suite",
                "cleanup",
            ]
        );
    }
}
