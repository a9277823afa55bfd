pub mod connector;
pub mod gemini;
pub mod prompts;
