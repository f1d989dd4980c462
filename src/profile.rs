use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::ValidationError;
use crate::prompt::PromptTemplate;

/// Sampling temperature sent with every request. Kept low so translations
/// stay literal and consistent.
pub const TRANSLATION_TEMPERATURE: f32 = 0.3;

/// Built-in translator flavours.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ProfileKind {
    /// Single fixed model, Indonesian language labels
    Classic,
    /// Three selectable models, English language labels
    #[default]
    Pro,
}

impl fmt::Display for ProfileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Classic => write!(f, "classic"),
            Self::Pro => write!(f, "pro"),
        }
    }
}

/// The choices and prompt wording a translator form offers.
#[derive(Debug, Clone, PartialEq)]
pub struct Profile {
    pub kind: ProfileKind,
    pub title: String,
    pub models: Vec<String>,
    pub languages: Vec<String>,
    pub tones: Vec<String>,
    pub template: PromptTemplate,
    pub temperature: f32,
}

fn owned(items: &[&str]) -> Vec<String> {
    items.iter().map(|item| item.to_string()).collect()
}

impl Profile {
    pub fn classic() -> Self {
        Self {
            kind: ProfileKind::Classic,
            title: "AI Universal Translator".to_string(),
            models: owned(&["gemini-2.5-flash"]),
            languages: owned(&[
                "Inggris",
                "Jepang",
                "Korea",
                "Arab",
                "Prancis",
                "Jerman",
                "Mandarin",
                "Indonesia",
            ]),
            tones: owned(&["Sangat Formal", "Formal", "Santai", "Gaul"]),
            template: PromptTemplate::classic(),
            temperature: TRANSLATION_TEMPERATURE,
        }
    }

    pub fn pro() -> Self {
        Self {
            kind: ProfileKind::Pro,
            title: "AI Universal Translator (Next-Gen)".to_string(),
            models: owned(&["gemini-2.0-flash", "gemini-1.5-pro", "gemini-3-flash-preview"]),
            languages: owned(&[
                "English",
                "Japanese",
                "Korean",
                "Indonesian",
                "Arabic",
                "French",
                "Spanish",
                "German",
            ]),
            tones: owned(&["Sangat Formal", "Profesional", "Santai", "Bahasa Gaul/Slang"]),
            template: PromptTemplate::pro(),
            temperature: TRANSLATION_TEMPERATURE,
        }
    }

    pub fn for_kind(kind: ProfileKind) -> Self {
        match kind {
            ProfileKind::Classic => Self::classic(),
            ProfileKind::Pro => Self::pro(),
        }
    }

    pub fn with_template(mut self, template: PromptTemplate) -> Self {
        self.template = template;
        self
    }

    pub fn language(&self, label: &str) -> Result<String, ValidationError> {
        find(&self.languages, label)
            .ok_or_else(|| ValidationError::UnsupportedLanguage(label.to_string()))
    }

    pub fn tone(&self, label: &str) -> Result<String, ValidationError> {
        find(&self.tones, label).ok_or_else(|| ValidationError::UnsupportedTone(label.to_string()))
    }

    pub fn model(&self, name: &str) -> Result<String, ValidationError> {
        find(&self.models, name).ok_or_else(|| ValidationError::UnsupportedModel(name.to_string()))
    }

    pub fn has_model_choice(&self) -> bool {
        self.models.len() > 1
    }

    /// Index of `preferred` in `options`, falling back to the first entry.
    pub fn index_of(options: &[String], preferred: Option<&str>) -> usize {
        preferred
            .and_then(|wanted| {
                options
                    .iter()
                    .position(|option| option.eq_ignore_ascii_case(wanted))
            })
            .unwrap_or(0)
    }
}

/// Labels match case-insensitively but the canonical spelling is returned.
fn find(options: &[String], label: &str) -> Option<String> {
    let label = label.trim();
    options
        .iter()
        .find(|option| option.eq_ignore_ascii_case(label))
        .cloned()
}
