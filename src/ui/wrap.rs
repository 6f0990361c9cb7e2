//! Word wrapping for transcript bubbles.
//!
//! Lines are wrapped before rendering so the renderer knows the exact visual
//! height of the transcript and can right-align user bubbles.

use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// Wraps `text` to at most `width` columns. Explicit newlines are kept,
/// words longer than a line are split. Indentation and runs of spaces inside
/// a line survive; the whitespace at a wrap point is dropped.
pub fn wrap_text(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut lines = Vec::new();

    for paragraph in text.split('\n') {
        let paragraph = paragraph.replace('\t', "    ");
        let mut current = String::new();
        let mut current_width = 0;
        let mut wrapped = false;

        for (gap, word) in words_with_gaps(&paragraph) {
            let word_width = UnicodeWidthStr::width(word);
            let gap = if current.is_empty() && wrapped { "" } else { gap };
            let gap_width = UnicodeWidthStr::width(gap);

            if current_width + gap_width + word_width <= width {
                current.push_str(gap);
                current.push_str(word);
                current_width += gap_width + word_width;
                continue;
            }

            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
                current_width = 0;
            }
            wrapped = true;

            if word_width <= width {
                current.push_str(word);
                current_width = word_width;
            } else {
                for ch in word.chars() {
                    let ch_width = UnicodeWidthChar::width(ch).unwrap_or(0);
                    if current_width + ch_width > width && !current.is_empty() {
                        lines.push(std::mem::take(&mut current));
                        current_width = 0;
                    }
                    current.push(ch);
                    current_width += ch_width;
                }
            }
        }

        lines.push(current);
    }

    lines
}

/// Splits a line into `(preceding whitespace, word)` pairs. Trailing
/// whitespace is dropped.
fn words_with_gaps(line: &str) -> Vec<(&str, &str)> {
    let mut pairs = Vec::new();
    let mut rest = line;

    while !rest.is_empty() {
        let word_start = rest.find(|c: char| !c.is_whitespace()).unwrap_or(rest.len());
        if word_start == rest.len() {
            break;
        }
        let (gap, tail) = rest.split_at(word_start);
        let word_end = tail.find(char::is_whitespace).unwrap_or(tail.len());
        let (word, remainder) = tail.split_at(word_end);
        pairs.push((gap, word));
        rest = remainder;
    }

    pairs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_is_one_line() {
        assert_eq!(wrap_text("Elementary.", 20), vec!["Elementary."]);
    }

    #[test]
    fn wraps_on_word_boundaries() {
        assert_eq!(
            wrap_text("the game is afoot my dear", 11),
            vec!["the game is", "afoot my", "dear"]
        );
    }

    #[test]
    fn keeps_explicit_newlines_and_blank_lines() {
        assert_eq!(wrap_text("one\n\ntwo", 10), vec!["one", "", "two"]);
    }

    #[test]
    fn splits_words_longer_than_the_width() {
        assert_eq!(wrap_text("abcdefghij", 4), vec!["abcd", "efgh", "ij"]);
    }

    #[test]
    fn counts_wide_characters_by_display_width() {
        // Each ideograph is two columns wide.
        assert_eq!(wrap_text("漢字漢字", 4), vec!["漢字", "漢字"]);
    }

    #[test]
    fn keeps_indentation_and_inner_spacing() {
        assert_eq!(
            wrap_text("fn main() {\n    let x  = 1;\n}", 40),
            vec!["fn main() {", "    let x  = 1;", "}"]
        );
        assert_eq!(wrap_text("\tverse", 20), vec!["    verse"]);
    }

    #[test]
    fn indentation_applies_to_the_first_line_only() {
        assert_eq!(
            wrap_text("  one two three", 9),
            vec!["  one two", "three"]
        );
    }

    #[test]
    fn zero_width_is_treated_as_one_column() {
        assert_eq!(wrap_text("ab", 0), vec!["a", "b"]);
    }
}
