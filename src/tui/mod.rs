use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use ratatui::{Frame, Terminal, backend::Backend};
use std::time::Duration;

use crate::translation_service::TranslationService;

pub mod form_state;

use form_state::FormState;

#[derive(Debug)]
pub enum AppState {
    Form(Box<FormState>),
    Quit,
}

pub trait State {
    fn handle_key_event(
        &mut self,
        key: KeyCode,
        modifiers: KeyModifiers,
    ) -> Result<Option<AppState>>;
    fn render(&self, f: &mut Frame);
    fn update(&mut self, translation_service: &mut TranslationService);
}

pub struct TuiApp {
    pub state: AppState,
    pub translation_service: TranslationService,
}

impl TuiApp {
    pub fn new(form: FormState, translation_service: TranslationService) -> Self {
        Self {
            state: AppState::Form(Box::new(form)),
            translation_service,
        }
    }

    pub fn handle_key_event(&mut self, key: KeyCode, modifiers: KeyModifiers) -> Result<()> {
        let new_state = match &mut self.state {
            AppState::Form(form_state) => form_state.handle_key_event(key, modifiers)?,
            AppState::Quit => None,
        };

        if let Some(new_state) = new_state {
            self.state = new_state;
        }

        Ok(())
    }

    pub fn render(&self, f: &mut Frame) {
        match &self.state {
            AppState::Form(form_state) => form_state.render(f),
            AppState::Quit => {}
        }
    }

    pub fn update(&mut self) {
        match &mut self.state {
            AppState::Form(form_state) => form_state.update(&mut self.translation_service),
            AppState::Quit => {}
        }
    }

    pub fn run<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<()> {
        loop {
            // Pick up finished translations and pending submits
            self.update();

            terminal.draw(|f| self.render(f))?;

            if matches!(self.state, AppState::Quit) {
                break;
            }

            if event::poll(Duration::from_millis(16))? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press {
                        self.handle_key_event(key.code, key.modifiers)?;
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::presenter::tests::RecordingLlm;
    use crate::profile::Profile;
    use form_state::Preselection;

    #[tokio::test]
    async fn test_quit_transition() -> Result<()> {
        let llm = RecordingLlm::replying("unused");
        let service = TranslationService::new(llm.presenter(Profile::pro()));
        let form = FormState::new(Profile::pro(), None, Preselection::default());
        let mut app = TuiApp::new(form, service);

        app.handle_key_event(KeyCode::Char('q'), KeyModifiers::CONTROL)?;
        assert!(matches!(app.state, AppState::Quit));

        // Keys after quitting are ignored.
        app.handle_key_event(KeyCode::Char('x'), KeyModifiers::NONE)?;
        assert!(matches!(app.state, AppState::Quit));
        Ok(())
    }
}
