use anyhow::Result;
use tracing::{debug, warn};

use crate::credentials::Credential;
use crate::error::{InvocationError, TranslationError, ValidationError};
use crate::llm::Llm;
use crate::profile::Profile;
use crate::translation::{TranslationRequest, TranslationResult, Translator};

/// Raw values collected from the form or the command line.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormInput {
    pub credential: Option<Credential>,
    pub source_text: String,
    pub target_language: String,
    pub tone: String,
    pub model: String,
}

/// A form that passed the validation gate.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedForm {
    pub credential: Credential,
    pub request: TranslationRequest,
}

/// What the user gets to see after pressing translate.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Blocked(ValidationError),
    Translated(TranslationResult),
    Failed(InvocationError),
}

impl Outcome {
    pub fn heading(&self) -> String {
        match self {
            Self::Blocked(_) => "Cannot translate yet".to_string(),
            Self::Translated(result) => format!("Result ({})", result.target_language),
            Self::Failed(_) => "Error".to_string(),
        }
    }

    pub fn body(&self) -> String {
        match self {
            Self::Blocked(e) => e.to_string(),
            Self::Translated(result) => result.output_text.clone(),
            Self::Failed(e) => format!("Translation failed: {e}"),
        }
    }

    /// The same outcome as a plain `Result`.
    pub fn into_result(self) -> Result<TranslationResult, TranslationError> {
        match self {
            Self::Translated(result) => Ok(result),
            Self::Blocked(e) => Err(e.into()),
            Self::Failed(e) => Err(e.into()),
        }
    }
}

/// Check the form against the profile. Credential and source text come
/// first so the user sees those messages before anything else.
pub fn validate(profile: &Profile, form: &FormInput) -> Result<ValidatedForm, ValidationError> {
    let credential = form
        .credential
        .clone()
        .ok_or(ValidationError::MissingCredential)?;

    if form.source_text.trim().is_empty() {
        return Err(ValidationError::EmptySourceText);
    }

    let request = TranslationRequest {
        source_text: form.source_text.clone(),
        target_language: profile.language(&form.target_language)?,
        tone: profile.tone(&form.tone)?,
        model: profile.model(&form.model)?,
        temperature: profile.temperature,
    };

    Ok(ValidatedForm {
        credential,
        request,
    })
}

/// Validation gate in front of the model invoker.
///
/// `connect` builds an invoker for a credential; it only runs once the form
/// has passed validation.
pub struct Presenter<F> {
    profile: Profile,
    connect: F,
}

impl<F, L> Presenter<F>
where
    F: Fn(&Credential) -> Result<L>,
    L: Llm,
{
    pub fn new(profile: Profile, connect: F) -> Self {
        Self { profile, connect }
    }

    pub fn validate(&self, form: &FormInput) -> Result<ValidatedForm, ValidationError> {
        validate(&self.profile, form)
    }

    /// Run an already validated form through the model.
    pub async fn invoke(&self, form: ValidatedForm) -> Outcome {
        let llm = match (self.connect)(&form.credential) {
            Ok(llm) => llm,
            Err(e) => {
                warn!("Failed to set up model client: {:#}", e);
                return Outcome::Failed(InvocationError::new(format!("{e:#}")));
            }
        };

        let translator = Translator::new(llm, self.profile.template.clone());
        match translator.translate(&form.request).await {
            Ok(result) => {
                debug!("Translation finished: {} chars", result.output_text.len());
                Outcome::Translated(result)
            }
            Err(e) => {
                warn!("Translation failed: {}", e);
                Outcome::Failed(e)
            }
        }
    }

    pub async fn submit(&self, form: &FormInput) -> Outcome {
        match self.validate(form) {
            Ok(validated) => self.invoke(validated).await,
            Err(e) => {
                debug!("Translation blocked: {}", e);
                Outcome::Blocked(e)
            }
        }
    }
}
