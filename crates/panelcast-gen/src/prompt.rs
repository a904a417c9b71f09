//! The format-contract prompt.
//!
//! The panel shows six rows of under twenty characters, so the prompt asks
//! the model for exactly that shape up front. The sanitizer still enforces
//! every rule afterwards; the contract just raises the odds of usable
//! output on the first try.

use std::time::{SystemTime, UNIX_EPOCH};

/// The fixed part of the prompt.
pub const FORMAT_CONTRACT: &str = "\
You must obey this FORMAT CONTRACT exactly.

OBJECTIVE
Write one coherent sentence across AT MOST 28 tokens delivering a line that sounds like it was lifted
from the book THE OUTSIDERS by S.E. Hinton
End naturally when the sentence is complete; do not pad to reach 28 tokens.

HARD RULES
- Output no more than 6 (SIX) lines.
- After the final line, print a separate control line: END
- The END control line does not count toward the 6 line limit.
- Each line MUST be less than 20 characters
- Do NOT split or hyphenate words.
- Apostrophes within words, commas, and full stops are allowed; no other punctuation, digits, emojis, or symbols.
- The FIRST WORD on line 1 must be a simple concrete noun and MUST NOT be the same as your previous answer.
- The six lines together must read as a single sentence.
- Only one sentence total. End the sentence with a full stop. Do not continue beyond the first full stop.
- Check that there are no more than 6 lines.
- Check that there are no more than 28 tokens across the lines.

SELF-CHECK BEFORE YOU PRINT
If any rule is violated, stop, re-generate, then print. Always end on a complete sentence.
";

// X and Z are excluded: too few everyday nouns start with them.
const FIRST_LETTERS: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWY";

/// Build the prompt, rotating the required first letter by the current UTC
/// minute so consecutive messages do not all open the same way.
pub fn build_prompt() -> String {
    build_prompt_at(SystemTime::now())
}

fn build_prompt_at(now: SystemTime) -> String {
    let minute = now
        .duration_since(UNIX_EPOCH)
        .map(|d| (d.as_secs() / 60) % 60)
        .unwrap_or(0) as usize;
    let first = FIRST_LETTERS[minute % FIRST_LETTERS.len()] as char;
    format!("{FORMAT_CONTRACT}\nEXTRA RULE: The very first word must start with '{first}'.")
}
