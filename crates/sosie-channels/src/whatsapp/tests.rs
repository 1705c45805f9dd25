use super::channel::within_edit_window;
use super::events::id_candidates;
use super::send::split_message;
use chrono::{Duration, Utc};

#[test]
fn test_split_message_short_text_untouched() {
    let chunks = split_message("salut ça va", 4096);
    assert_eq!(chunks, vec!["salut ça va".to_string()]);
}

#[test]
fn test_split_message_breaks_on_lines() {
    let text = "line one\nline two\nline three";
    let chunks = split_message(text, 10);
    assert!(chunks.len() >= 3);
    assert_eq!(chunks[0], "line one\n");
    assert!(chunks.iter().all(|c| c.chars().count() <= 10));
}

#[test]
fn test_split_message_hard_splits_oversized_line() {
    let text = "x".repeat(25);
    let chunks = split_message(&text, 10);
    assert_eq!(chunks.len(), 3);
    assert_eq!(chunks[0].chars().count(), 10);
    assert_eq!(chunks[2].chars().count(), 5);
}

#[test]
fn test_split_message_multibyte_boundaries() {
    let text = "héhéhéhéhé"; // 10 chars, 15 bytes
    let chunks = split_message(text, 4);
    assert!(chunks.iter().all(|c| c.chars().count() <= 4));
    assert_eq!(chunks.concat(), text);
}

#[test]
fn test_id_candidates_carry_both_forms() {
    let candidates = id_candidates("33612345678@s.whatsapp.net", "3EB0ABC123");
    assert_eq!(candidates.len(), 2);
    assert_eq!(candidates[0], "3EB0ABC123");
    assert!(candidates[1].contains("33612345678"));
    assert!(candidates[1].contains("3EB0ABC123"));
}

#[test]
fn test_edit_window_accepts_recent_messages() {
    let now = Utc::now();
    assert!(within_edit_window(now - Duration::minutes(5), now));
    assert!(within_edit_window(now, now));
}

#[test]
fn test_edit_window_rejects_old_messages() {
    let now = Utc::now();
    assert!(!within_edit_window(now - Duration::minutes(16), now));
}

#[test]
fn test_edit_window_rejects_future_timestamps() {
    let now = Utc::now();
    assert!(!within_edit_window(now + Duration::minutes(1), now));
}
