//! Sentence extraction from raw model output.
//!
//! Generation backends are told to emit one short sentence plus an `END`
//! control line, but the contract is best-effort at best: output routinely
//! carries extra sentences, digits, emoji, smart quotes, or nothing usable
//! at all. This module carves out a single clean sentence and shapes it to
//! the panel, degrading to a shorter or empty payload instead of failing.

use crate::constraints::PanelConstraints;
use crate::wrap::wrap;

/// Reduce raw, untrusted model output to at most `max_lines` display lines.
///
/// Steps, each preserving the previous step's invariant:
/// 1. drop trailing blank lines and a trailing `END` control line;
/// 2. flatten remaining lines into one string, normalizing curly
///    apostrophes;
/// 3. cut at the first full stop, inclusive (no full stop: keep everything,
///    the token budget still applies);
/// 4. re-scan token by token, keeping letters, internal apostrophes, commas
///    and periods attached to the preceding token, dropping everything else,
///    stopping after `max_tokens` word tokens;
/// 5. force a terminal full stop;
/// 6. wrap at the clamped panel width and cap the line count.
///
/// Never fails. Worst case the result is empty.
pub fn sanitize(raw: &str, constraints: &PanelConstraints) -> Vec<String> {
    let flat = flatten(raw);
    let sentence = first_sentence(&flat);
    let trimmed = take_tokens(sentence, constraints.max_tokens);
    let sentence = ensure_terminal_stop(trimmed);

    let mut lines = wrap(&sentence, constraints.wrap_width());
    // Surplus lines are dropped, not rebalanced.
    lines.truncate(constraints.max_lines);
    lines
}

/// Strip the trailing `END` control line and trailing blanks, then join the
/// surviving non-blank lines with single spaces. Curly apostrophes become
/// straight ones so they can survive the token scan.
fn flatten(raw: &str) -> String {
    let mut lines: Vec<&str> = raw.lines().collect();
    while lines.last().is_some_and(|l| l.trim().is_empty()) {
        lines.pop();
    }
    if lines.last().is_some_and(|l| l.trim() == "END") {
        lines.pop();
    }

    let joined = lines
        .iter()
        .map(|l| l.trim())
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    joined.replace(['\u{2018}', '\u{2019}'], "'")
}

/// Everything up to and including the first full stop; the whole string when
/// there is none.
fn first_sentence(text: &str) -> &str {
    match text.find('.') {
        Some(idx) => &text[..=idx],
        None => text,
    }
}

/// Scan left to right keeping at most `max_tokens` word tokens.
///
/// A word token is a run of ASCII letters with optional internal
/// apostrophes (`don't` is one token). Commas and periods attach to the
/// preceding token; whitespace runs collapse to one space; any other
/// character is dropped.
fn take_tokens(text: &str, max_tokens: usize) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::new();
    let mut word_count = 0usize;
    let mut last_was_space = false;
    let mut i = 0usize;

    while i < chars.len() {
        if let Some(end) = match_token(&chars, i) {
            if word_count >= max_tokens {
                break;
            }
            if !out.is_empty() && !matches!(out.chars().last(), Some(' ' | ',' | '.')) {
                out.push(' ');
            }
            out.extend(&chars[i..end]);
            word_count += 1;
            last_was_space = false;
            i = end;
            continue;
        }

        let ch = chars[i];
        if ch.is_whitespace() {
            if !out.is_empty() && !last_was_space {
                out.push(' ');
                last_was_space = true;
            }
        } else if ch == ',' || ch == '.' {
            if !out.is_empty() {
                if out.ends_with(' ') {
                    out.pop();
                }
                out.push(ch);
                out.push(' ');
                last_was_space = true;
            }
        }
        // Digits, symbols, emoji: dropped.
        i += 1;
    }

    out.trim().to_string()
}

/// Match a word token starting at `start`; returns the exclusive end index.
fn match_token(chars: &[char], start: usize) -> Option<usize> {
    let mut i = start;
    if !chars.get(i).is_some_and(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    while chars.get(i).is_some_and(|c| c.is_ascii_alphabetic()) {
        i += 1;
    }
    // Internal apostrophes only: an apostrophe must be followed by letters.
    while chars.get(i) == Some(&'\'')
        && chars.get(i + 1).is_some_and(|c| c.is_ascii_alphabetic())
    {
        i += 1;
        while chars.get(i).is_some_and(|c| c.is_ascii_alphabetic()) {
            i += 1;
        }
    }
    Some(i)
}

/// Every non-empty output is a complete sentence ending in exactly one
/// full stop.
fn ensure_terminal_stop(mut text: String) -> String {
    if !text.is_empty() && !text.ends_with('.') {
        while text.ends_with([',', ' ']) {
            text.pop();
        }
        text.push('.');
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    fn defaults() -> PanelConstraints {
        PanelConstraints::default()
    }

    #[test]
    fn strips_end_control_line_and_wraps() {
        let raw = "Mountains hold their silence.\nEND";
        let lines = sanitize(raw, &defaults());
        assert_eq!(lines, vec!["Mountains hold", "their silence."]);
        for line in &lines {
            assert!(line.chars().count() < 20);
        }
    }

    #[test]
    fn strips_trailing_blank_lines_before_end_marker() {
        let raw = "Rivers remember the rain.\n\nEND\n\n\n";
        let lines = sanitize(raw, &defaults());
        assert_eq!(lines.join(" "), "Rivers remember the rain.");
    }

    #[test]
    fn truncates_at_first_full_stop() {
        let raw = "Stones wait. Nobody asked them to.";
        let lines = sanitize(raw, &defaults());
        assert_eq!(lines.join(" "), "Stones wait.");
    }

    #[test]
    fn no_full_stop_keeps_everything_and_appends_one() {
        let raw = "wind moves through empty streets tonight";
        let lines = sanitize(raw, &defaults());
        assert_eq!(
            lines.join(" "),
            "wind moves through empty streets tonight."
        );
    }

    #[test]
    fn token_budget_applies_without_full_stop() {
        let words: Vec<String> = (0..40).map(|i| format!("word{}", letter(i))).collect();
        let raw = words.join(" ");
        let lines = sanitize(
            &raw,
            &PanelConstraints {
                max_tokens: 28,
                max_lines: 100,
                columns: 19,
            },
        );
        let joined = lines.join(" ");
        let kept: Vec<&str> = joined.trim_end_matches('.').split(' ').collect();
        assert_eq!(kept.len(), 28);
        assert!(joined.ends_with('.'));
    }

    fn letter(i: usize) -> char {
        (b'a' + (i % 26) as u8) as char
    }

    #[test]
    fn drops_digits_symbols_and_emoji() {
        let raw = "Hope 42 weighs ~nothing at all!! \u{1F600}.";
        let joined = sanitize(raw, &defaults()).join(" ");
        assert_eq!(joined, "Hope weighs nothing at all.");
    }

    #[test]
    fn output_charset_is_restricted() {
        let raw = "He said: \"it's 9pm, isn't it?\" -- then left; quietly.";
        let joined = sanitize(raw, &defaults()).join(" ");
        assert!(
            joined
                .chars()
                .all(|c| c.is_ascii_alphabetic() || matches!(c, '\'' | ',' | '.' | ' ')),
            "unexpected character in {joined:?}"
        );
        assert!(joined.ends_with('.'));
    }

    #[test]
    fn comma_attaches_to_preceding_token() {
        let raw = "Slowly , surely it ends.";
        let joined = sanitize(raw, &defaults()).join(" ");
        assert_eq!(joined, "Slowly, surely it ends.");
    }

    #[test]
    fn curly_apostrophes_are_normalized() {
        let raw = "Don\u{2019}t look back.";
        let joined = sanitize(raw, &defaults()).join(" ");
        assert_eq!(joined, "Don't look back.");
    }

    #[test]
    fn trailing_comma_replaced_by_full_stop() {
        let raw = "Nothing stays the same,";
        let joined = sanitize(raw, &defaults()).join(" ");
        assert_eq!(joined, "Nothing stays the same.");
    }

    #[test]
    fn empty_input_yields_empty_payload() {
        assert!(sanitize("", &defaults()).is_empty());
        assert!(sanitize("\n\n\n", &defaults()).is_empty());
    }

    #[test]
    fn input_with_no_letters_yields_empty_payload() {
        assert!(sanitize("1234 !!! ??? 99", &defaults()).is_empty());
    }

    #[test]
    fn single_unbreakable_forty_char_token_survives_on_its_own_line() {
        let token = "a".repeat(40);
        let lines = sanitize(&token, &defaults());
        // The wrapper never hyphenates; the token overflows on its own line
        // and the appended full stop rides along.
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0], format!("{token}."));
    }

    #[test]
    fn line_count_is_capped() {
        let raw = "one two three four five six seven eight nine ten \
                   eleven twelve thirteen fourteen fifteen sixteen";
        let constraints = PanelConstraints {
            columns: 5,
            max_lines: 3,
            max_tokens: 28,
        };
        let lines = sanitize(raw, &constraints);
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn every_line_is_under_twenty_chars_even_for_wide_panels() {
        let raw = "a considerably longer sentence that keeps going and going until wrapped.";
        let constraints = PanelConstraints {
            columns: 64,
            ..Default::default()
        };
        for line in sanitize(raw, &constraints) {
            assert!(line.chars().count() < 20, "line too wide: {line:?}");
        }
    }
}
