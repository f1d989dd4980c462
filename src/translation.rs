use tracing::debug;

use crate::error::InvocationError;
use crate::llm::Llm;
use crate::prompt::PromptTemplate;

/// Everything needed for one translation call, already checked against the
/// active profile.
#[derive(Debug, Clone, PartialEq)]
pub struct TranslationRequest {
    pub source_text: String,
    pub target_language: String,
    pub tone: String,
    pub model: String,
    pub temperature: f32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationResult {
    pub target_language: String,
    pub output_text: String,
}

/// A Translator translates texts.
pub struct Translator<L: Llm> {
    llm: L,
    template: PromptTemplate,
}

impl<L: Llm> Translator<L> {
    pub fn new(llm: L, template: PromptTemplate) -> Self {
        Self { llm, template }
    }

    pub fn prompt(&self, request: &TranslationRequest) -> String {
        self.template
            .render(&request.target_language, &request.tone, &request.source_text)
    }

    /// Translate text into the requested language with one model call.
    /// The model output is returned exactly as received.
    pub async fn translate(
        &self,
        request: &TranslationRequest,
    ) -> Result<TranslationResult, InvocationError> {
        let prompt = self.prompt(request);
        debug!(
            model = %request.model,
            target_language = %request.target_language,
            tone = %request.tone,
            "Requesting translation"
        );

        let output_text = self
            .llm
            .complete(&prompt, &request.model, request.temperature)
            .await?;

        Ok(TranslationResult {
            target_language: request.target_language.clone(),
            output_text,
        })
    }
}
