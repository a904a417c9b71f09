//! Greedy word wrap.

/// Wrap `text` into lines at most `columns` characters wide without ever
/// splitting a word.
///
/// Words are whitespace-separated runs. A word longer than `columns` is
/// flushed onto its own line verbatim — overflow is preferred over
/// hyphenation, because a mid-word break is unreadable on a 6-row panel.
/// Every other line is at most `columns` wide. Empty input yields no lines.
///
/// Pure function: no I/O, no hidden state.
pub fn wrap(text: &str, columns: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;

    for word in text.split_whitespace() {
        let word_len = word.chars().count();

        if word_len > columns {
            // Too long to ever fit: own line, no hyphenation.
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
                current_len = 0;
            }
            lines.push(word.to_string());
            continue;
        }

        if current.is_empty() {
            current.push_str(word);
            current_len = word_len;
        } else if current_len + 1 + word_len <= columns {
            current.push(' ');
            current.push_str(word);
            current_len += 1 + word_len;
        } else {
            lines.push(std::mem::take(&mut current));
            current.push_str(word);
            current_len = word_len;
        }
    }

    if !current.is_empty() {
        lines.push(current);
    }
    lines
}
