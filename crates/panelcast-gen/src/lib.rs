//! Text generation for the panel.
//!
//! The delivery loop only needs "a function that returns text within a
//! bounded time, or fails" — that is the [`TextSource`] trait. The one
//! real implementation talks to an Ollama backend: HTTP chat API first,
//! `ollama run` as a fallback when the API path is unreachable or
//! answers badly.

pub mod error;
pub mod ollama;
pub mod prompt;

pub use error::{GenerationError, Result};
pub use ollama::OllamaSource;
pub use prompt::build_prompt;

/// A bounded source of generated text.
pub trait TextSource {
    /// Produce one piece of raw text, or fail within a bounded time.
    fn generate(&self) -> Result<String>;
}
