//! Generated test data for one journey

use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use rand::Rng;

const ADJECTIVES: [&str; 5] = ["happy", "clever", "brave", "quick", "wise"];
const NOUNS: [&str; 5] = ["fox", "bear", "wolf", "eagle", "lion"];

pub const POST_DESCRIPTION: &str = "Это тестовый пост созданный автоматически";
pub const POST_BODY: &str = "Содержимое тестового поста. Этот пост создан с помощью E2E тестов.";

/// Lower-cased word every generated title starts with.
pub const TITLE_MARKER: &str = "тестовый";

/// `<adjective>_<noun>_<0..999>`, e.g. `clever_fox_472`.
pub fn random_username<R: Rng + ?Sized>(rng: &mut R) -> String {
    let adj = ADJECTIVES.choose(rng).copied().unwrap_or("happy");
    let noun = NOUNS.choose(rng).copied().unwrap_or("fox");
    format!("{}_{}_{}", adj, noun, rng.gen_range(0..1000))
}

/// `user<unix-millis><0..999>@testmail.com`.
pub fn random_email<R: Rng + ?Sized>(rng: &mut R, now: DateTime<Utc>) -> String {
    format!(
        "user{}{}@testmail.com",
        now.timestamp_millis(),
        rng.gen_range(0..1000)
    )
}

pub fn post_title(now: DateTime<Utc>) -> String {
    format!("Тестовый пост {}", now.timestamp_millis())
}

/// Whether a feed entry's text looks like the article we published.
///
/// Matches on the fixed title marker or on the first 20 characters of the
/// title, both case-insensitively.
pub fn mentions_post(text: &str, title: &str) -> bool {
    let text = text.to_lowercase();
    let prefix: String = title.chars().take(20).collect::<String>().to_lowercase();
    text.contains(TITLE_MARKER) || (!prefix.is_empty() && text.contains(&prefix))
}
