//! SQL generation: prompts, response cleaning, and the model ladder.

pub mod fixes;
pub mod orchestrator;
pub mod prompt;

pub use fixes::clean_response;
pub use orchestrator::{GenerationOrchestrator, GenerationRequest};
pub use prompt::{build_prompt, PromptStrategy};
