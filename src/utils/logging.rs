use chrono::Local;
use std::fs::OpenOptions;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Append-only plain-text transcript of a chat.
///
/// Each entry is written as its lines followed by one blank line, so the file
/// reads the same as the on-screen transcript. Headers (session start,
/// character switches) are prefixed with `## ` and timestamped.
pub struct TranscriptLog {
    file_path: Option<PathBuf>,
    is_active: bool,
}

impl TranscriptLog {
    /// Opens (or creates) the log file. `None` yields a disabled log.
    pub fn new(log_file: Option<PathBuf>) -> Result<Self, Box<dyn std::error::Error>> {
        if let Some(path) = &log_file {
            Self::test_file_access(path)?;
        }
        let is_active = log_file.is_some();
        Ok(TranscriptLog {
            file_path: log_file,
            is_active,
        })
    }

    pub fn disabled() -> Self {
        TranscriptLog {
            file_path: None,
            is_active: false,
        }
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }

    pub fn toggle(&mut self) -> Result<String, Box<dyn std::error::Error>> {
        match &self.file_path {
            Some(path) => {
                let name = display_name(path);
                if self.is_active {
                    self.log_header("Logging paused")?;
                    self.is_active = false;
                    Ok(format!("Logging paused ({name})"))
                } else {
                    self.is_active = true;
                    self.log_header("Logging resumed")?;
                    Ok(format!("Logging resumed ({name})"))
                }
            }
            None => Err("No log file specified. Start with --log <file> to enable logging.".into()),
        }
    }

    pub fn log_session_start(&self, character: &str) -> Result<(), Box<dyn std::error::Error>> {
        self.log_header(&format!("Chat with {character} started"))
    }

    pub fn log_character_switch(&self, character: &str) -> Result<(), Box<dyn std::error::Error>> {
        self.log_header(&format!("Switched to {character}; conversation reset"))
    }

    /// Records a completed turn: the user line, then the reply under the character's name.
    pub fn log_turn(
        &self,
        user_label: &str,
        utterance: &str,
        character: &str,
        reply: &str,
    ) -> Result<(), Box<dyn std::error::Error>> {
        self.log_message(&format!("{user_label}: {utterance}"))?;
        self.log_message(&format!("{character}: {reply}"))
    }

    fn log_header(&self, text: &str) -> Result<(), Box<dyn std::error::Error>> {
        let stamp = Local::now().format("%Y-%m-%d %H:%M:%S");
        self.log_message(&format!("## {text} ({stamp})"))
    }

    pub fn log_message(&self, content: &str) -> Result<(), Box<dyn std::error::Error>> {
        let Some(path) = self.file_path.as_ref().filter(|_| self.is_active) else {
            return Ok(());
        };

        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let mut writer = BufWriter::new(file);
        for line in content.lines() {
            writeln!(writer, "{line}")?;
        }
        writeln!(writer)?;
        writer.flush()?;
        Ok(())
    }

    pub fn status_string(&self) -> String {
        match (&self.file_path, self.is_active) {
            (None, _) => "disabled".to_string(),
            (Some(path), true) => format!("active ({})", display_name(path)),
            (Some(path), false) => format!("paused ({})", display_name(path)),
        }
    }

    fn test_file_access(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        file.flush()?;
        Ok(())
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .unwrap_or_default()
        .to_string_lossy()
        .into_owned()
}
