//! Wire payload assembly.

use bytes::Bytes;

/// Encode display lines into the bytes the panel expects: lines joined by
/// `\n`, exactly one trailing newline, ASCII only (anything else is
/// dropped, never transcoded).
///
/// An empty line set still encodes to a lone newline — the firmware treats
/// it as "clear the panel", and the senders use it to pre-open a session.
pub fn encode_payload(lines: &[String]) -> Bytes {
    let mut text = lines.join("\n");
    text.push('\n');
    let ascii: String = text.chars().filter(char::is_ascii).collect();
    Bytes::from(ascii)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_lines_with_single_trailing_newline() {
        let lines = vec!["Mountains hold".to_string(), "their silence.".to_string()];
        assert_eq!(
            encode_payload(&lines).as_ref(),
            b"Mountains hold\ntheir silence.\n"
        );
    }

    #[test]
    fn empty_lines_encode_to_lone_newline() {
        assert_eq!(encode_payload(&[]).as_ref(), b"\n");
    }

    #[test]
    fn non_ascii_is_dropped() {
        let lines = vec!["caf\u{e9} \u{1F600} ok".to_string()];
        assert_eq!(encode_payload(&lines).as_ref(), b"caf  ok\n");
    }
}
