//! Live extraction/matching oracle backed by the Gemini API.

pub mod gemini;
pub mod prompts;

pub use gemini::GeminiOracle;
