use anyhow::Result;
use crossterm::event::{KeyCode, KeyModifiers};
use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
};
use std::cell::Cell;
use tracing::{debug, warn};

use crate::credentials::Credential;
use crate::error::InvocationError;
use crate::presenter::{self, FormInput, Outcome};
use crate::profile::Profile;
use crate::translation_service::{TranslationJob, TranslationService};
use crate::tui::{AppState, State};

const SPINNER: [&str; 4] = ["|", "/", "-", "\\"];
const SCROLL_STEP: u16 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    ApiKey,
    Model,
    Language,
    Tone,
    Source,
    Translate,
}

/// Preselected choices, usually taken from the config file.
#[derive(Debug, Clone, Default)]
pub struct Preselection {
    pub model: Option<String>,
    pub target_language: Option<String>,
    pub tone: Option<String>,
}

#[derive(Debug)]
pub struct FormState {
    pub profile: Profile,
    /// Key found in the environment or secrets file
    pub resolved_credential: Option<Credential>,
    pub api_key_input: String,
    pub model_index: usize,
    pub language_index: usize,
    pub tone_index: usize,
    pub source_text: String,
    pub focus: Field,
    pub outcome: Option<Outcome>,
    pub in_flight: Option<u64>,
    /// First output line shown; clamped to `output_max_scroll` when drawn
    pub output_scroll: u16,
    output_max_scroll: Cell<u16>,
    submit_requested: bool,
    next_job_id: u64,
    tick: usize,
}

impl FormState {
    pub fn new(
        profile: Profile,
        resolved_credential: Option<Credential>,
        preselection: Preselection,
    ) -> Self {
        let model_index = Profile::index_of(&profile.models, preselection.model.as_deref());
        let language_index =
            Profile::index_of(&profile.languages, preselection.target_language.as_deref());
        let tone_index = Profile::index_of(&profile.tones, preselection.tone.as_deref());

        let mut state = Self {
            profile,
            resolved_credential,
            api_key_input: String::new(),
            model_index,
            language_index,
            tone_index,
            source_text: String::new(),
            focus: Field::Source,
            outcome: None,
            in_flight: None,
            output_scroll: 0,
            output_max_scroll: Cell::new(0),
            submit_requested: false,
            next_job_id: 0,
            tick: 0,
        };
        state.focus = state.fields()[0];
        state
    }

    /// Fields shown for this profile, in focus order.
    pub fn fields(&self) -> Vec<Field> {
        let mut fields = Vec::with_capacity(6);
        if self.resolved_credential.is_none() {
            fields.push(Field::ApiKey);
        }
        if self.profile.has_model_choice() {
            fields.push(Field::Model);
        }
        fields.extend([Field::Language, Field::Tone, Field::Source, Field::Translate]);
        fields
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn form_input(&self) -> FormInput {
        FormInput {
            credential: self
                .resolved_credential
                .clone()
                .or_else(|| Credential::manual(self.api_key_input.clone())),
            source_text: self.source_text.clone(),
            target_language: self.profile.languages[self.language_index].clone(),
            tone: self.profile.tones[self.tone_index].clone(),
            model: self.profile.models[self.model_index].clone(),
        }
    }

    fn move_focus(&mut self, forward: bool) {
        let fields = self.fields();
        let current = fields.iter().position(|f| *f == self.focus).unwrap_or(0);
        let next = if forward {
            (current + 1) % fields.len()
        } else {
            (current + fields.len() - 1) % fields.len()
        };
        self.focus = fields[next];
    }

    fn cycle(index: &mut usize, len: usize, forward: bool) {
        if len == 0 {
            return;
        }
        *index = if forward {
            (*index + 1) % len
        } else {
            (*index + len - 1) % len
        };
    }

    fn request_submit(&mut self) {
        if self.is_busy() {
            debug!("Ignoring submit while a translation is in flight");
            return;
        }
        self.submit_requested = true;
    }

    fn show(&mut self, outcome: Option<Outcome>) {
        self.outcome = outcome;
        self.output_scroll = 0;
    }

    fn scroll_output(&mut self, down: bool) {
        let current = self.output_scroll.min(self.output_max_scroll.get());
        self.output_scroll = if down {
            current.saturating_add(SCROLL_STEP)
        } else {
            current.saturating_sub(SCROLL_STEP)
        };
    }

    fn handle_field_input(&mut self, key: KeyCode, modifiers: KeyModifiers) {
        let forward = matches!(key, KeyCode::Right);
        match (self.focus, key) {
            (Field::ApiKey, KeyCode::Char(c))
                if modifiers == KeyModifiers::NONE || modifiers == KeyModifiers::SHIFT =>
            {
                self.api_key_input.push(c)
            }
            (Field::ApiKey, KeyCode::Backspace) => {
                self.api_key_input.pop();
            }
            (Field::Model, KeyCode::Left | KeyCode::Right) => {
                Self::cycle(&mut self.model_index, self.profile.models.len(), forward)
            }
            (Field::Language, KeyCode::Left | KeyCode::Right) => {
                Self::cycle(&mut self.language_index, self.profile.languages.len(), forward)
            }
            (Field::Tone, KeyCode::Left | KeyCode::Right) => {
                Self::cycle(&mut self.tone_index, self.profile.tones.len(), forward)
            }
            (Field::Source, KeyCode::Char(c))
                if modifiers == KeyModifiers::NONE || modifiers == KeyModifiers::SHIFT =>
            {
                self.source_text.push(c)
            }
            (Field::Source, KeyCode::Enter) => self.source_text.push('\n'),
            (Field::Source, KeyCode::Backspace) => {
                self.source_text.pop();
            }
            (Field::Translate, KeyCode::Enter) => self.request_submit(),
            _ => {}
        }
    }

    fn credential_line(&self) -> Line<'static> {
        match &self.resolved_credential {
            Some(credential) => Line::from(vec![
                Span::raw("API key: "),
                Span::styled(
                    format!("from {}", credential.source()),
                    Style::default().fg(Color::Green),
                ),
            ]),
            None => Line::from(Span::styled(
                "API key: not found, enter it below",
                Style::default().fg(Color::Yellow),
            )),
        }
    }

    fn field_block(&self, field: Field, title: &str) -> Block<'static> {
        let style = if self.focus == field {
            Style::default().fg(Color::Yellow)
        } else {
            Style::default()
        };
        Block::default()
            .borders(Borders::ALL)
            .border_style(style)
            .title(title.to_string())
    }

    fn render_selector(&self, f: &mut Frame, area: Rect, field: Field, title: &str, value: &str) {
        let selector = Paragraph::new(format!("< {value} >"))
            .alignment(Alignment::Center)
            .block(self.field_block(field, title));
        f.render_widget(selector, area);
    }

    fn render_settings(&self, f: &mut Frame, area: Rect) {
        let fields = self.fields();
        let mut constraints = vec![Constraint::Length(2)];
        constraints.extend(
            fields
                .iter()
                .filter(|field| is_setting(**field))
                .map(|_| Constraint::Length(3)),
        );
        constraints.push(Constraint::Min(0));

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints(constraints)
            .split(area);

        f.render_widget(Paragraph::new(self.credential_line()), chunks[0]);

        for (slot, field) in fields.iter().filter(|f| is_setting(**f)).enumerate() {
            let area = chunks[slot + 1];
            match field {
                Field::ApiKey => {
                    let masked = "*".repeat(self.api_key_input.chars().count());
                    let input = Paragraph::new(masked)
                        .style(Style::default().fg(Color::Yellow))
                        .block(self.field_block(Field::ApiKey, "Google API Key"));
                    f.render_widget(input, area);
                }
                Field::Model => self.render_selector(
                    f,
                    area,
                    Field::Model,
                    "Model",
                    &self.profile.models[self.model_index],
                ),
                Field::Language => self.render_selector(
                    f,
                    area,
                    Field::Language,
                    "Target Language",
                    &self.profile.languages[self.language_index],
                ),
                Field::Tone => self.render_selector(
                    f,
                    area,
                    Field::Tone,
                    "Tone",
                    &self.profile.tones[self.tone_index],
                ),
                Field::Source | Field::Translate => {}
            }
        }
    }

    fn render_main(&self, f: &mut Frame, area: Rect) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Percentage(45),
                Constraint::Length(3),
                Constraint::Min(0),
            ])
            .split(area);

        // Typing happens at the end, so keep the last lines in view.
        let (width, height) = inner_size(chunks[0]);
        let lines = wrap_lines(&self.source_text, width);
        let scroll = lines.len().saturating_sub(usize::from(height));
        let source = Paragraph::new(lines)
            .scroll((u16::try_from(scroll).unwrap_or(u16::MAX), 0))
            .block(self.field_block(Field::Source, "Source Text"));
        f.render_widget(source, chunks[0]);

        let button_style = if self.focus == Field::Translate {
            Style::default()
                .fg(Color::Black)
                .bg(Color::Cyan)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::Cyan)
        };
        let button = Paragraph::new("Translate")
            .style(button_style)
            .alignment(Alignment::Center)
            .block(self.field_block(Field::Translate, ""));
        f.render_widget(button, chunks[1]);

        self.render_output(f, chunks[2]);
    }

    fn render_output(&self, f: &mut Frame, area: Rect) {
        if self.is_busy() {
            let frame = SPINNER[(self.tick / 8) % SPINNER.len()];
            let spinner = Paragraph::new(format!("{frame} Translating..."))
                .style(Style::default().fg(Color::Cyan))
                .block(Block::default().borders(Borders::ALL).title("Output"));
            f.render_widget(spinner, area);
            return;
        }

        let Some(outcome) = &self.outcome else {
            self.output_max_scroll.set(0);
            let empty =
                Paragraph::new("").block(Block::default().borders(Borders::ALL).title("Output"));
            f.render_widget(empty, area);
            return;
        };

        let color = match outcome {
            Outcome::Translated(_) => Color::White,
            Outcome::Blocked(_) => Color::Yellow,
            Outcome::Failed(_) => Color::Red,
        };
        let (width, height) = inner_size(area);
        let lines = wrap_lines(&outcome.body(), width);
        let max_scroll = lines.len().saturating_sub(usize::from(height));
        let max_scroll = u16::try_from(max_scroll).unwrap_or(u16::MAX);
        self.output_max_scroll.set(max_scroll);

        let output = Paragraph::new(lines)
            .style(Style::default().fg(color))
            .scroll((self.output_scroll.min(max_scroll), 0))
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(outcome.heading()),
            );
        f.render_widget(output, area);
    }
}

/// Width and height inside a bordered block.
fn inner_size(area: Rect) -> (u16, u16) {
    (area.width.saturating_sub(2), area.height.saturating_sub(2))
}

/// Break `text` into rows of at most `width` characters, so scroll offsets
/// count exactly the rows that get drawn.
fn wrap_lines(text: &str, width: u16) -> Vec<Line<'static>> {
    let width = usize::from(width.max(1));
    let mut lines = Vec::new();
    for row in text.split('\n') {
        let chars: Vec<char> = row.chars().collect();
        if chars.is_empty() {
            lines.push(Line::default());
            continue;
        }
        lines.extend(
            chars
                .chunks(width)
                .map(|chunk| Line::from(chunk.iter().collect::<String>())),
        );
    }
    lines
}

fn is_setting(field: Field) -> bool {
    matches!(
        field,
        Field::ApiKey | Field::Model | Field::Language | Field::Tone
    )
}

impl State for FormState {
    fn handle_key_event(
        &mut self,
        key: KeyCode,
        modifiers: KeyModifiers,
    ) -> Result<Option<AppState>> {
        match (key, modifiers) {
            (KeyCode::Char('q'), KeyModifiers::CONTROL) => Ok(Some(AppState::Quit)),
            (KeyCode::Tab, _) => {
                self.move_focus(true);
                Ok(None)
            }
            (KeyCode::BackTab, _) => {
                self.move_focus(false);
                Ok(None)
            }
            (KeyCode::F(5), _) | (KeyCode::Enter, KeyModifiers::CONTROL) => {
                self.request_submit();
                Ok(None)
            }
            (KeyCode::PageDown, _) => {
                self.scroll_output(true);
                Ok(None)
            }
            (KeyCode::PageUp, _) => {
                self.scroll_output(false);
                Ok(None)
            }
            _ => {
                self.handle_field_input(key, modifiers);
                Ok(None)
            }
        }
    }

    fn render(&self, f: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(0),
                Constraint::Length(3),
            ])
            .split(f.area());

        let title = Paragraph::new(self.profile.title.as_str())
            .style(Style::default().fg(Color::Cyan))
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::ALL));
        f.render_widget(title, chunks[0]);

        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(35), Constraint::Percentage(65)])
            .split(chunks[1]);

        self.render_settings(f, columns[0]);
        self.render_main(f, columns[1]);

        let help = Paragraph::new(
            "Tab/Shift+Tab: Move, ←/→: Change, F5 or Ctrl+Enter: Translate, PgUp/PgDn: Scroll, Ctrl+Q: Quit",
        )
        .style(Style::default().fg(Color::Gray))
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL));
        f.render_widget(help, chunks[2]);
    }

    fn update(&mut self, translation_service: &mut TranslationService) {
        self.tick = self.tick.wrapping_add(1);

        while let Some(response) = translation_service.try_recv_translation() {
            if self.in_flight == Some(response.id) {
                self.in_flight = None;
                self.show(Some(response.outcome));
            } else {
                warn!("Dropping response for unknown job {}", response.id);
            }
        }

        if !std::mem::take(&mut self.submit_requested) || self.is_busy() {
            return;
        }

        match presenter::validate(&self.profile, &self.form_input()) {
            Err(e) => {
                debug!("Translation blocked: {}", e);
                self.show(Some(Outcome::Blocked(e)));
            }
            Ok(form) => {
                let id = self.next_job_id;
                self.next_job_id += 1;
                match translation_service.request_translation(TranslationJob { id, form }) {
                    Ok(()) => {
                        self.in_flight = Some(id);
                        self.show(None);
                    }
                    Err(e) => {
                        warn!("Failed to request translation: {}", e);
                        self.show(Some(Outcome::Failed(InvocationError::new(e.to_string()))));
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::CredentialSource;
    use crate::error::ValidationError;
    use crate::presenter::tests::RecordingLlm;
    use crate::translation::TranslationResult;
    use ratatui::{Terminal, backend::TestBackend};
    use std::time::Duration;

    fn type_text(state: &mut FormState, text: &str) {
        for c in text.chars() {
            state
                .handle_key_event(KeyCode::Char(c), KeyModifiers::NONE)
                .unwrap();
        }
    }

    fn screen(state: &FormState) -> String {
        let mut terminal = Terminal::new(TestBackend::new(120, 40)).unwrap();
        terminal.draw(|f| state.render(f)).unwrap();
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    async fn settle(state: &mut FormState, service: &mut TranslationService) {
        for _ in 0..200 {
            state.update(service);
            if !state.is_busy() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("translation did not finish");
    }

    #[test]
    fn test_fields_depend_on_profile_and_credential() {
        let classic = FormState::new(Profile::classic(), None, Preselection::default());
        assert_eq!(
            classic.fields(),
            vec![
                Field::ApiKey,
                Field::Language,
                Field::Tone,
                Field::Source,
                Field::Translate
            ]
        );
        assert_eq!(classic.focus, Field::ApiKey);

        let credential = Credential::new("env-key", CredentialSource::Environment);
        let pro = FormState::new(Profile::pro(), credential, Preselection::default());
        assert_eq!(pro.fields()[0], Field::Model);
        assert_eq!(pro.focus, Field::Model);
    }

    #[test]
    fn test_preselection_and_cycling() {
        let mut state = FormState::new(
            Profile::pro(),
            None,
            Preselection {
                model: Some("gemini-1.5-pro".to_string()),
                target_language: Some("German".to_string()),
                tone: Some("unknown".to_string()),
            },
        );
        assert_eq!(state.form_input().model, "gemini-1.5-pro");
        assert_eq!(state.form_input().target_language, "German");
        assert_eq!(state.form_input().tone, "Sangat Formal");

        state.focus = Field::Language;
        state
            .handle_key_event(KeyCode::Right, KeyModifiers::NONE)
            .unwrap();
        assert_eq!(state.form_input().target_language, "English");
        state
            .handle_key_event(KeyCode::Left, KeyModifiers::NONE)
            .unwrap();
        assert_eq!(state.form_input().target_language, "German");
    }

    #[test]
    fn test_manual_key_is_masked() {
        let mut state = FormState::new(Profile::classic(), None, Preselection::default());
        type_text(&mut state, "secret-key");

        assert_eq!(state.form_input().credential.unwrap().key(), "secret-key");
        let rendered = screen(&state);
        assert!(!rendered.contains("secret-key"));
        assert!(rendered.contains("**********"));
    }

    #[test]
    fn test_key_field_ignores_control_shortcuts() {
        let mut state = FormState::new(Profile::classic(), None, Preselection::default());
        assert_eq!(state.focus, Field::ApiKey);

        for c in ['v', 'c'] {
            state
                .handle_key_event(KeyCode::Char(c), KeyModifiers::CONTROL)
                .unwrap();
        }
        assert!(state.api_key_input.is_empty());
        assert!(state.form_input().credential.is_none());

        state
            .handle_key_event(KeyCode::Char('K'), KeyModifiers::SHIFT)
            .unwrap();
        assert_eq!(state.api_key_input, "K");
    }

    #[test]
    fn test_source_box_follows_last_line() {
        let mut state = FormState::new(Profile::pro(), None, Preselection::default());
        state.focus = Field::Source;
        for i in 0..40 {
            type_text(&mut state, &format!("row-{i:02}"));
            state
                .handle_key_event(KeyCode::Enter, KeyModifiers::NONE)
                .unwrap();
        }
        type_text(&mut state, "tail");

        let rendered = screen(&state);
        assert!(rendered.contains("tail"));
        assert!(rendered.contains("row-39"));
        assert!(!rendered.contains("row-00"));
    }

    #[tokio::test]
    async fn test_long_output_scrolls_to_last_line() {
        let body: Vec<String> = (0..60).map(|i| format!("line-{i:02}")).collect();
        let llm = RecordingLlm::replying("short reply");
        let mut service = TranslationService::new(llm.presenter(Profile::pro()));
        let credential = Credential::manual("key");
        let mut state = FormState::new(Profile::pro(), credential, Preselection::default());
        state.outcome = Some(Outcome::Translated(TranslationResult {
            target_language: "English".to_string(),
            output_text: body.join("\n"),
        }));

        let rendered = screen(&state);
        assert!(rendered.contains("line-00"));
        assert!(!rendered.contains("line-59"));

        for _ in 0..20 {
            state
                .handle_key_event(KeyCode::PageDown, KeyModifiers::NONE)
                .unwrap();
        }
        let rendered = screen(&state);
        assert!(rendered.contains("line-59"));
        assert!(!rendered.contains("line-00"));

        // Scrolling back up starts from the clamped bottom, not from the overshoot.
        state
            .handle_key_event(KeyCode::PageUp, KeyModifiers::NONE)
            .unwrap();
        let rendered = screen(&state);
        assert!(!rendered.contains("line-59"));
        assert!(rendered.contains("line-45"));

        state.focus = Field::Source;
        type_text(&mut state, "Halo");
        state
            .handle_key_event(KeyCode::F(5), KeyModifiers::NONE)
            .unwrap();
        state.update(&mut service);
        settle(&mut state, &mut service).await;

        assert_eq!(state.output_scroll, 0);
        assert!(screen(&state).contains("short reply"));
    }

    #[test]
    fn test_ctrl_q_quits() {
        let mut state = FormState::new(Profile::pro(), None, Preselection::default());
        let next = state
            .handle_key_event(KeyCode::Char('q'), KeyModifiers::CONTROL)
            .unwrap();
        assert!(matches!(next, Some(AppState::Quit)));
    }

    #[tokio::test]
    async fn test_missing_key_is_reported_without_calling_model() {
        let llm = RecordingLlm::replying("unused");
        let mut service = TranslationService::new(llm.presenter(Profile::pro()));
        let mut state = FormState::new(Profile::pro(), None, Preselection::default());

        state.focus = Field::Source;
        type_text(&mut state, "Halo");
        state
            .handle_key_event(KeyCode::F(5), KeyModifiers::NONE)
            .unwrap();
        state.update(&mut service);

        assert!(!state.is_busy());
        assert_eq!(
            state.outcome,
            Some(Outcome::Blocked(ValidationError::MissingCredential))
        );
        assert_eq!(llm.calls(), 0);
    }

    #[tokio::test]
    async fn test_submit_shows_translation_under_language_label() {
        let llm = RecordingLlm::replying("Hey, how's it going?");
        let mut service = TranslationService::new(llm.presenter(Profile::pro()));
        let credential = Credential::new("valid-key", CredentialSource::SecretsFile);
        let mut state = FormState::new(
            Profile::pro(),
            credential,
            Preselection {
                target_language: Some("English".to_string()),
                tone: Some("Santai".to_string()),
                ..Preselection::default()
            },
        );

        state.focus = Field::Source;
        type_text(&mut state, "Halo, apa kabar?");
        state.focus = Field::Translate;
        state
            .handle_key_event(KeyCode::Enter, KeyModifiers::NONE)
            .unwrap();
        state.update(&mut service);
        assert!(state.is_busy());
        assert!(screen(&state).contains("Translating..."));

        // A second submit while busy is ignored.
        state
            .handle_key_event(KeyCode::F(5), KeyModifiers::NONE)
            .unwrap();

        settle(&mut state, &mut service).await;

        let rendered = screen(&state);
        assert!(rendered.contains("Result (English)"));
        assert!(rendered.contains("Hey, how's it going?"));
        assert_eq!(llm.calls(), 1);
    }

    #[tokio::test]
    async fn test_failure_keeps_form_usable() {
        let llm = RecordingLlm::failing("connection reset");
        let mut service = TranslationService::new(llm.presenter(Profile::pro()));
        let credential = Credential::manual("key");
        let mut state = FormState::new(Profile::pro(), credential, Preselection::default());

        state.focus = Field::Source;
        type_text(&mut state, "Halo");
        state
            .handle_key_event(KeyCode::F(5), KeyModifiers::NONE)
            .unwrap();
        state.update(&mut service);
        settle(&mut state, &mut service).await;

        assert!(matches!(state.outcome, Some(Outcome::Failed(_))));
        assert!(screen(&state).contains("connection reset"));

        state
            .handle_key_event(KeyCode::F(5), KeyModifiers::NONE)
            .unwrap();
        state.update(&mut service);
        settle(&mut state, &mut service).await;
        assert_eq!(llm.calls(), 2);
    }
}
