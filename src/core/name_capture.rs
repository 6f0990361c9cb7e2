//! "my name is …" heuristic.
//!
//! This is a literal string trigger, not entity extraction: the phrase may
//! appear anywhere in the utterance and everything after its first
//! occurrence is taken as the name.

const TRIGGER: &str = "my name is";

/// Returns the trimmed text following the first case-insensitive
/// occurrence of "my name is", or `None` when the phrase is absent.
pub fn capture_name(utterance: &str) -> Option<&str> {
    let bytes = utterance.as_bytes();
    let trigger = TRIGGER.as_bytes();
    // The trigger is ASCII, so any match starts on a char boundary.
    let start = bytes
        .windows(trigger.len())
        .position(|window| window.eq_ignore_ascii_case(trigger))?;
    Some(utterance[start + trigger.len()..].trim())
}
