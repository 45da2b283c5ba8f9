//! Public types for the Gemgate API.

mod generate;
mod response;

pub use generate::{DEFAULT_MODEL, GenerateOptions, GenerateRequest, ImageInput};
pub use response::{
    AiResponse, FinishReason, GenerationResponse, LiveResponse, ResponseOrigin, SafetyRating,
    SyntheticResponse, TemplateKind, Usage,
};
