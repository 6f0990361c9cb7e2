//! `auth` / `deauth`: store or remove the API key in the system keyring.

use std::error::Error;
use std::fmt;
use std::io::{self, Write};
use std::time::Duration;

use ratatui::crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode},
};

use crate::core::credentials::{delete_api_key, store_api_key, API_KEY_ENV_VARS};

const KEY_PROMPT: &str = "API key: ";
const REVEALED_TAIL: usize = 4;

#[derive(Debug)]
pub struct PromptError(String);

impl fmt::Display for PromptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Error for PromptError {}

impl From<io::Error> for PromptError {
    fn from(err: io::Error) -> Self {
        PromptError(err.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyOutcome {
    Continue,
    Submit(String),
    Cancelled,
}

/// Buffer for a secret typed at the terminal. Only the last few characters are shown.
#[derive(Debug, Default)]
pub struct MaskedInput {
    text: String,
}

impl MaskedInput {
    pub fn handle_key(&mut self, key: &KeyEvent) -> KeyOutcome {
        match key.code {
            KeyCode::Enter => KeyOutcome::Submit(self.text.trim().to_string()),
            KeyCode::Esc => KeyOutcome::Cancelled,
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                KeyOutcome::Cancelled
            }
            KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.text.clear();
                KeyOutcome::Continue
            }
            KeyCode::Backspace => {
                self.text.pop();
                KeyOutcome::Continue
            }
            KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.text.push(c);
                KeyOutcome::Continue
            }
            _ => KeyOutcome::Continue,
        }
    }

    pub fn paste(&mut self, text: &str) {
        self.text
            .extend(text.chars().filter(|c| !c.is_control()));
    }

    pub fn display(&self) -> String {
        let count = self.text.chars().count();
        let hidden = count.saturating_sub(REVEALED_TAIL);
        let tail: String = self.text.chars().skip(hidden).collect();
        format!("{}{}", "•".repeat(hidden), tail)
    }
}

fn prompt_api_key() -> Result<String, PromptError> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, event::EnableBracketedPaste)?;

    let result = (|| -> Result<String, PromptError> {
        let mut input = MaskedInput::default();
        loop {
            print!("\r\x1b[K{KEY_PROMPT}{}", input.display());
            io::stdout().flush()?;

            if !event::poll(Duration::from_millis(100))? {
                continue;
            }
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => {
                    match input.handle_key(&key) {
                        KeyOutcome::Continue => {}
                        KeyOutcome::Submit(value) => break Ok(value),
                        KeyOutcome::Cancelled => {
                            break Err(PromptError("Cancelled by user".to_string()))
                        }
                    }
                }
                Event::Paste(text) => input.paste(&text),
                _ => {}
            }
        }
    })();

    let restore_raw = disable_raw_mode();
    let restore_paste = execute!(stdout, event::DisableBracketedPaste);
    println!();

    let value = result?;
    restore_raw?;
    restore_paste?;
    Ok(value)
}

pub fn run_auth() -> Result<(), Box<dyn Error>> {
    println!("🔐 charchat authentication");
    println!("Paste your API key and press Enter (Esc cancels).");
    let key = prompt_api_key()?;
    if key.is_empty() {
        return Err("API key cannot be empty".into());
    }
    store_api_key(&key)?;
    println!("✅ API key saved to the system keyring");
    println!(
        "💡 {} take precedence over the stored key when set.",
        API_KEY_ENV_VARS.join(" and ")
    );
    Ok(())
}

pub fn run_deauth() -> Result<(), Box<dyn Error>> {
    if delete_api_key()? {
        println!("✅ API key removed from the system keyring");
    } else {
        println!("No stored API key found.");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn typing_then_enter_submits_trimmed_key() {
        let mut input = MaskedInput::default();
        for c in " gsk_abc123 ".chars() {
            assert_eq!(input.handle_key(&press(KeyCode::Char(c))), KeyOutcome::Continue);
        }
        assert_eq!(
            input.handle_key(&press(KeyCode::Enter)),
            KeyOutcome::Submit("gsk_abc123".to_string())
        );
    }

    #[test]
    fn only_the_tail_is_revealed() {
        let mut input = MaskedInput::default();
        input.paste("gsk_secret9876");
        assert_eq!(input.display(), format!("{}9876", "•".repeat(10)));

        input.handle_key(&press(KeyCode::Backspace));
        assert_eq!(input.display(), format!("{}t987", "•".repeat(9)));
    }

    #[test]
    fn paste_drops_control_characters() {
        let mut input = MaskedInput::default();
        input.paste("ab\r\ncd\t");
        assert_eq!(input.handle_key(&press(KeyCode::Enter)), KeyOutcome::Submit("abcd".into()));
    }

    #[test]
    fn escape_and_ctrl_c_cancel() {
        let mut input = MaskedInput::default();
        assert_eq!(input.handle_key(&press(KeyCode::Esc)), KeyOutcome::Cancelled);
        let ctrl_c = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(input.handle_key(&ctrl_c), KeyOutcome::Cancelled);
    }

    #[test]
    fn ctrl_u_clears_the_buffer() {
        let mut input = MaskedInput::default();
        input.paste("wrong");
        let ctrl_u = KeyEvent::new(KeyCode::Char('u'), KeyModifiers::CONTROL);
        input.handle_key(&ctrl_u);
        assert_eq!(input.display(), "");
    }
}
