pub mod gemini;
pub mod prompts;
pub mod types;

use crate::error::Result;

pub use gemini::GeminiClient;
pub use types::{
    Content, FunctionCall, FunctionDeclaration, GenerateContentRequest, GenerateContentResponse,
    GenerationOptions, Role, ToolDeclarations,
};

/// Transport to a generative model.  The conversation driver only talks to
/// this trait, so tests can swap in a scripted backend.
#[async_trait::async_trait]
pub trait GenerativeBackend: Send + Sync {
    /// Human-readable name of this backend (e.g. "Gemini API").
    fn name(&self) -> &str;

    /// Send one `generateContent` request and return the decoded response.
    async fn generate_content(
        &self,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse>;
}

#[async_trait::async_trait]
impl GenerativeBackend for GeminiClient {
    fn name(&self) -> &str {
        "Gemini API"
    }

    async fn generate_content(
        &self,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse> {
        self.generate_content(request).await
    }
}
