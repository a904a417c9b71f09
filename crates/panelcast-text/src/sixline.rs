//! Fixed-geometry six-line framing.
//!
//! A simpler sibling of the wrapped protocol: the caller supplies up to six
//! `|`-delimited fields and the panel receives exactly six rows of exactly
//! ten ASCII characters each. No word wrap, no sanitizing — what you type
//! is what the panel shows, padded or cut to fit.

/// Rows in a fixed frame.
pub const SIX_LINES: usize = 6;
/// Characters per row in a fixed frame.
pub const TEN_COLUMNS: usize = 10;

/// Frame a `|`-delimited input into the fixed 6x10 wire format.
///
/// Missing fields become blank rows; extra fields are ignored. Each field
/// is stripped of surrounding whitespace and non-ASCII characters, then
/// padded or truncated to exactly ten characters. The frame always ends in
/// a newline.
pub fn frame_six(input: &str) -> String {
    let mut fields = input.split('|');
    let mut out = String::with_capacity(SIX_LINES * (TEN_COLUMNS + 1));
    for _ in 0..SIX_LINES {
        let field = fields.next().unwrap_or("").trim();
        let ascii: String = field.chars().filter(char::is_ascii).collect();
        let mut row: String = ascii.chars().take(TEN_COLUMNS).collect();
        while row.len() < TEN_COLUMNS {
            row.push(' ');
        }
        out.push_str(&row);
        out.push('\n');
    }
    out
}
