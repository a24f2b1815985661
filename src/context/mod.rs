//! Prompt context assembly.

pub mod prompt;

pub use prompt::{compose_prompt, render_documents, render_history, SYSTEM_INSTRUCTION};
