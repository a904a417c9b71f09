/// Hard ceiling on wrap width. The panel firmware renders a 5x7 font and
/// rejects lines of 20 characters or more, whatever the configured column
/// count says.
pub const MAX_WRAP_COLUMNS: usize = 19;

/// Physical geometry and content limits of the target panel.
///
/// Loaded once at startup and never mutated. `columns` must reflect the
/// panel's real character cell count: a wrong value produces an unreadable
/// payload, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PanelConstraints {
    /// Character cells per row.
    pub columns: usize,
    /// Rows the panel can show at once.
    pub max_lines: usize,
    /// Word-token budget for one message.
    pub max_tokens: usize,
}

impl Default for PanelConstraints {
    fn default() -> Self {
        // 128px wide with a 5x7 font is about 21 columns.
        Self {
            columns: 21,
            max_lines: 6,
            max_tokens: 28,
        }
    }
}

impl PanelConstraints {
    /// Effective wrap width: the configured column count clamped to the
    /// firmware's hard limit.
    pub fn wrap_width(&self) -> usize {
        self.columns.min(MAX_WRAP_COLUMNS)
    }
}
