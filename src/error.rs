use thiserror::Error;

/// Input problems caught before any network call is made.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("API key is missing. Enter it in the settings panel first.")]
    MissingCredential,

    #[error("The source text is empty, there is nothing to translate.")]
    EmptySourceText,

    #[error("Unsupported target language: {0}")]
    UnsupportedLanguage(String),

    #[error("Unsupported tone: {0}")]
    UnsupportedTone(String),

    #[error("Unsupported model: {0}")]
    UnsupportedModel(String),
}

/// Any failure raised while talking to the model provider.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct InvocationError {
    pub message: String,
}

impl InvocationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<reqwest::Error> for InvocationError {
    fn from(err: reqwest::Error) -> Self {
        Self::new(err.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TranslationError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Translation failed: {0}")]
    Invocation(#[from] InvocationError),
}
