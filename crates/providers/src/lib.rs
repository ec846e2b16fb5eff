//! Text generation: the provider trait and the Gemini client.

pub mod gemini;
pub mod model;

pub use {
    gemini::GeminiGenerator,
    model::{Completion, CompletionRequest, TextGenerator, Usage},
};
