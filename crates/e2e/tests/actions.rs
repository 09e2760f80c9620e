mod common;

use std::time::{Duration, Instant};

use common::StaticPage;
use conduit_e2e::actions::{PageActions, AUTH_TOKEN_KEY};
use conduit_e2e::config::Timeouts;
use conduit_e2e::{E2eError, LocatorSet};
use test_case::test_case;

fn actions(page: &StaticPage) -> PageActions<'_, StaticPage> {
    PageActions::new(page, Timeouts::instant(), "screenshots")
}

fn set(selectors: &[&str]) -> LocatorSet {
    LocatorSet::new(selectors.iter().copied()).unwrap()
}

#[test_case(&[".a", ".b", ".c"], &[".a", ".b", ".c"], 0 ; "all visible, first wins")]
#[test_case(&[".a", ".b", ".c"], &[".b", ".c"], 1 ; "skips missing head")]
#[test_case(&[".a", ".b", ".c"], &[".c"], 2 ; "falls through to last")]
#[tokio::test]
async fn click_uses_earliest_visible_candidate(candidates: &[&str], visible: &[&str], expected: usize) {
    let page = StaticPage::with_visible(visible);
    let hit = actions(&page)
        .click(&set(candidates), Duration::from_millis(200))
        .await
        .unwrap();

    assert_eq!(hit.index, expected);
    assert_eq!(hit.locator.as_str(), candidates[expected]);

    let clicks: Vec<String> = page.log().into_iter().filter(|l| l.starts_with("click:")).collect();
    assert_eq!(clicks, vec![format!("click:{}", candidates[expected])]);
}

#[tokio::test]
async fn click_raises_when_set_is_exhausted() {
    let page = StaticPage::with_visible(&[]);
    let err = actions(&page)
        .click(&set(&[".logout-button", "a[href*=\"logout\"]"]), Duration::from_millis(100))
        .await
        .unwrap_err();

    match err {
        E2eError::ElementNotFound { locators } => {
            assert_eq!(locators, ".logout-button, a[href*=\"logout\"]");
        }
        other => panic!("unexpected error: {}", other),
    }
}

#[tokio::test]
async fn click_moves_on_when_visible_element_rejects_click() {
    let mut page = StaticPage::with_visible(&[".a", ".b"]);
    page.broken_clicks.insert(".a".to_string());

    let hit = actions(&page)
        .click(&set(&[".a", ".b"]), Duration::from_millis(100))
        .await
        .unwrap();
    assert_eq!(hit.index, 1);
}

#[tokio::test]
async fn click_respects_overall_timeout() {
    let mut page = StaticPage::with_visible(&[]);
    page.sleep_on_miss = true;

    let started = Instant::now();
    let result = actions(&page)
        .click(&set(&[".a", ".b", ".c", ".d"]), Duration::from_millis(300))
        .await;

    assert!(result.is_err());
    assert!(
        started.elapsed() < Duration::from_millis(900),
        "click took {:?}",
        started.elapsed()
    );
}

#[tokio::test]
async fn wait_for_gives_each_candidate_its_own_timeout() {
    let mut page = StaticPage::with_visible(&[".late"]);
    page.sleep_on_miss = true;

    let started = Instant::now();
    let hit = actions(&page)
        .wait_for(&set(&[".x", ".y", ".late"]), Duration::from_millis(60))
        .await
        .unwrap();

    assert_eq!(hit.index, 2);
    assert!(started.elapsed() >= Duration::from_millis(120));
}

#[tokio::test]
async fn wait_for_reports_absence_without_error() {
    let page = StaticPage::with_visible(&["nav"]);
    let actions = actions(&page);

    assert!(actions.wait_for(&set(&[".user-pic", ".avatar"]), Duration::from_millis(10)).await.is_none());
    assert_eq!(
        actions.wait_for(&set(&[".navbar", "nav"]), Duration::from_millis(10)).await.map(|h| h.index),
        Some(1)
    );
}

#[tokio::test]
async fn fill_clears_then_types_into_first_match() {
    let page = StaticPage::with_visible(&["input[name*=\"username\"]", "input[type=\"text\"]"]);
    let hit = actions(&page)
        .fill(
            &set(&["input[placeholder*=\"Username\"]", "input[name*=\"username\"]", "input[type=\"text\"]"]),
            "clever_fox_472",
            true,
        )
        .await
        .unwrap();

    assert_eq!(hit.index, 1);
    let log = page.log();
    let writes: Vec<&String> = log
        .iter()
        .filter(|l| l.starts_with("clear:") || l.starts_with("type:"))
        .collect();
    assert_eq!(
        writes,
        vec![
            "clear:input[name*=\"username\"]",
            "type:input[name*=\"username\"]:clever_fox_472",
        ]
    );
}

#[tokio::test]
async fn fill_without_clear_only_types() {
    let page = StaticPage::with_visible(&["textarea"]);
    actions(&page).fill(&set(&["textarea"]), "body", false).await.unwrap();
    assert!(!page.log().iter().any(|l| l.starts_with("clear:")));
}

#[tokio::test]
async fn fill_returns_none_for_missing_optional_field() {
    let page = StaticPage::with_visible(&[]);
    assert!(actions(&page).fill(&set(&["input[placeholder*=\"tags\"]"]), "automation", true).await.is_none());
    assert!(!page.log().iter().any(|l| l.starts_with("type:")));
}

#[tokio::test]
async fn navigate_picks_wait_mode() {
    let page = StaticPage::default();
    let actions = actions(&page);

    actions.navigate("http://localhost:4100/", true).await.unwrap();
    actions.navigate("http://localhost:4100/logout", false).await.unwrap();

    assert_eq!(
        page.log(),
        vec![
            "goto:http://localhost:4100/:networkidle",
            "goto:http://localhost:4100/logout:commit",
        ]
    );
}

#[tokio::test]
async fn auth_token_round_trips() {
    let page = StaticPage::default();
    let actions = actions(&page);

    assert_eq!(actions.auth_token().await.unwrap(), None);

    actions.set_auth_token("header.payload.sig").await.unwrap();
    assert_eq!(actions.auth_token().await.unwrap().as_deref(), Some("header.payload.sig"));
    assert_eq!(
        page.storage.lock().unwrap().get(AUTH_TOKEN_KEY).map(String::as_str),
        Some("header.payload.sig")
    );
}

#[tokio::test]
async fn empty_stored_token_counts_as_missing() {
    let page = StaticPage::default();
    page.storage.lock().unwrap().insert(AUTH_TOKEN_KEY.into(), String::new());
    assert_eq!(actions(&page).auth_token().await.unwrap(), None);
}

#[tokio::test]
async fn screenshot_path_is_deterministic() {
    let page = StaticPage::default();
    let path = actions(&page).take_screenshot("1-main-page", true).await.unwrap();
    assert_eq!(path, std::path::Path::new("screenshots/1-main-page.png"));
}

#[tokio::test]
async fn collect_uses_first_candidate_with_matches() {
    let mut page = StaticPage::default();
    page.texts.insert(
        ".sidebar .tag-default".into(),
        vec!["welcome".into(), "automation".into()],
    );

    let actions = actions(&page);
    let collected = actions
        .collect(&set(&[".tag-list .tag-pill", ".sidebar .tag-default"]))
        .await
        .unwrap();
    assert_eq!(collected.hit.index, 1);
    assert_eq!(collected.texts, vec!["welcome", "automation"]);

    actions.click_nth(&collected.hit, 1).await.unwrap();
    assert_eq!(page.log(), vec!["click_nth:.sidebar .tag-default#1"]);
}

#[tokio::test]
async fn click_text_matches_case_insensitively() {
    let mut page = StaticPage::default();
    page.texts.insert(
        "a".into(),
        vec!["Home".into(), "Sign in".into(), "Sign up".into()],
    );

    let actions = actions(&page);
    let hit = actions.click_text(&set(&["a"]), "SIGN UP").await.unwrap();
    assert_eq!(hit.map(|h| h.index), Some(0));
    assert_eq!(page.log(), vec!["click_nth:a#2"]);

    assert!(actions.click_text(&set(&["a"]), "settings").await.unwrap().is_none());
}
