// src/ai/connector.rs
use crate::ai::prompts::PromptTemplate;
use crate::error::ModelError;
use crate::upload::EncodedImagePayload;

/// Trait defining the interface for a remote vision-language model
pub trait VisionConnector: Send + Sync {
    /// Send the image together with an instruction prompt and return the model's text
    fn describe(&self, payload: &EncodedImagePayload, prompt: &PromptTemplate) -> Result<String, ModelError>;

    /// Model name, for logging and display
    fn model_name(&self) -> &str;
}
