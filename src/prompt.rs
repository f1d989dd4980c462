use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};

pub const TARGET_LANGUAGE: &str = "{target_language}";
pub const TONE: &str = "{tone}";
pub const SOURCE_TEXT: &str = "{source_text}";

/// Template used by the classic profile.
pub const CLASSIC_TEMPLATE: &str = "Kamu adalah penerjemah profesional yang ahli dalam berbagai bahasa.
Tugasmu adalah menerjemahkan teks berikut ke dalam bahasa {target_language}.
Gunakan gaya bahasa yang {tone}.

Teks: {source_text}

Hasil Terjemahan:";

/// Template used by the pro profile: auto-detects the source language and
/// asks for natural adaptation of idioms.
pub const PRO_TEMPLATE: &str = "Anda adalah mesin penerjemah AI mutakhir.
Tugas Anda:
1. Deteksi bahasa asal secara otomatis.
2. Terjemahkan ke dalam bahasa {target_language} dengan sangat akurat.
3. Gunakan nada bicara {tone}.
4. Jika ada istilah teknis atau budaya, berikan adaptasi yang paling natural, bukan kaku.

Teks: {source_text}

Hasil Terjemahan:";

/// A natural-language instruction with `{target_language}`, `{tone}` and
/// `{source_text}` placeholders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PromptTemplate {
    text: String,
}

impl PromptTemplate {
    pub fn new(text: impl Into<String>) -> Result<Self> {
        let text = text.into();
        for placeholder in [TARGET_LANGUAGE, TONE, SOURCE_TEXT] {
            if !text.contains(placeholder) {
                bail!("Prompt template is missing the {placeholder} placeholder");
            }
        }
        Ok(Self { text })
    }

    pub fn classic() -> Self {
        Self {
            text: CLASSIC_TEMPLATE.to_string(),
        }
    }

    pub fn pro() -> Self {
        Self {
            text: PRO_TEMPLATE.to_string(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Fill the placeholders in one pass. Values are inserted verbatim and
    /// placeholders appearing inside them are left alone.
    pub fn render(&self, target_language: &str, tone: &str, source_text: &str) -> String {
        let mut rendered =
            String::with_capacity(self.text.len() + target_language.len() + source_text.len());
        let mut rest = self.text.as_str();

        while let Some(start) = rest.find('{') {
            rendered.push_str(&rest[..start]);
            let tail = &rest[start..];

            let substitution = [
                (TARGET_LANGUAGE, target_language),
                (TONE, tone),
                (SOURCE_TEXT, source_text),
            ]
            .into_iter()
            .find(|(placeholder, _)| tail.starts_with(placeholder));

            match substitution {
                Some((placeholder, value)) => {
                    rendered.push_str(value);
                    rest = &tail[placeholder.len()..];
                }
                None => {
                    rendered.push('{');
                    rest = &tail[1..];
                }
            }
        }
        rendered.push_str(rest);

        rendered
    }
}

impl TryFrom<String> for PromptTemplate {
    type Error = anyhow::Error;

    fn try_from(text: String) -> Result<Self> {
        Self::new(text)
    }
}

impl From<PromptTemplate> for String {
    fn from(template: PromptTemplate) -> Self {
        template.text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_contains_all_inputs() {
        for template in [PromptTemplate::classic(), PromptTemplate::pro()] {
            let prompt = template.render("English", "Santai", "Halo, apa kabar?");
            assert!(prompt.contains("English"));
            assert!(prompt.contains("Santai"));
            assert!(prompt.contains("Halo, apa kabar?"));
            assert!(!prompt.contains(SOURCE_TEXT));
        }
    }

    #[test]
    fn test_render_is_pure() {
        let template = PromptTemplate::pro();
        let first = template.render("Japanese", "Formal", "Selamat pagi");
        let second = template.render("Japanese", "Formal", "Selamat pagi");
        assert_eq!(first, second);
    }

    #[test]
    fn test_placeholders_in_values_are_not_expanded() {
        let template = PromptTemplate::new("{target_language}|{tone}|{source_text}").unwrap();
        let prompt = template.render("English", "Gaul", "literal {tone} and {");
        assert_eq!(prompt, "English|Gaul|literal {tone} and {");
    }

    #[test]
    fn test_unknown_braces_are_kept() {
        let template =
            PromptTemplate::new("{json} {target_language} {tone} {source_text} }").unwrap();
        assert_eq!(template.render("Korea", "Formal", "x"), "{json} Korea Formal x }");
    }

    #[test]
    fn test_new_rejects_missing_placeholder() {
        assert!(PromptTemplate::new("Translate {source_text} to {target_language}").is_err());
        assert!(PromptTemplate::new("{target_language} {tone} {source_text}").is_ok());
    }

    #[test]
    fn test_template_deserialization_validates() {
        #[derive(Deserialize)]
        struct Wrapper {
            template: PromptTemplate,
        }

        let ok: Wrapper =
            toml::from_str("template = \"{target_language} {tone} {source_text}\"").unwrap();
        assert_eq!(ok.template.as_str(), "{target_language} {tone} {source_text}");

        let bad = toml::from_str::<Wrapper>("template = \"no placeholders\"");
        assert!(bad.is_err());
    }
}
