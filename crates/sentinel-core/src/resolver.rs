//! Short-reply interpretation against a previously shown candidate list.

use std::sync::LazyLock;

use regex::Regex;

static SINGLE_DIGIT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d)\b").expect("valid single digit regex"));

const ORDINALS: [(&str, usize); 5] = [
    ("first", 1),
    ("second", 2),
    ("third", 3),
    ("fourth", 4),
    ("fifth", 5),
];

const CANCEL_PHRASES: [&str; 4] = ["cancel", "stop", "nevermind", "never mind"];

/// 1-based option index named by `message`, if any.
///
/// An ordinal word anywhere in the message wins over a digit. Only a
/// standalone single digit counts ("2", "option 2"), so "12" or "2nd" do not.
pub fn parse_selection_index(message: &str) -> Option<usize> {
    let msg = message.trim().to_lowercase();

    if let Some((_, idx)) = ORDINALS.iter().find(|(word, _)| msg.contains(word)) {
        return Some(*idx);
    }

    SINGLE_DIGIT
        .captures(&msg)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// True if the whole message is a cancel phrase.
pub fn is_cancel(message: &str) -> bool {
    let msg = message.trim().to_lowercase();
    CANCEL_PHRASES.contains(&msg.as_str())
}
