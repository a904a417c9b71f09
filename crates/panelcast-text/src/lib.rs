//! Text shaping for small character-matrix panels.
//!
//! This is the pure layer. Model output goes in, display-ready lines come
//! out: greedy word wrap that never splits a word, a sanitizer that carves
//! one well-formed sentence out of noisy generation output, and a separate
//! fixed 6x10 framing mode for the legacy six-line protocol.

pub mod constraints;
pub mod payload;
pub mod sanitize;
pub mod sixline;
pub mod wrap;

pub use constraints::{PanelConstraints, MAX_WRAP_COLUMNS};
pub use payload::encode_payload;
pub use sanitize::sanitize;
pub use sixline::frame_six;
pub use wrap::wrap;
