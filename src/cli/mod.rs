//! Command-line interface parsing and handling
//!
//! This module handles parsing command-line arguments and executing the appropriate commands.

pub mod auth;
pub mod character_list;
pub mod say;
pub mod startup;

#[cfg(test)]
mod tests;

use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};

use crate::cli::auth::{run_auth, run_deauth};
use crate::cli::character_list::list_characters;
use crate::cli::say::run_say;
use crate::cli::startup::{build_pipeline, load_catalog, open_session, Overrides, Settings};
use crate::core::config::Config;
use crate::ui::chat_loop::run_chat;
use crate::utils::diagnostics::init_tracing;
use crate::utils::logging::TranscriptLog;

#[derive(Parser)]
#[command(name = "charchat")]
#[command(version)]
#[command(about = "Chat with fictional characters through a hosted language model")]
#[command(
    long_about = "charchat is a terminal chat interface for talking to fictional characters. \
Characters are read from a JSON file mapping each name to a short description; \
every message is sent to an OpenAI-compatible completion API together with the \
conversation so far.\n\n\
Authentication:\n\
  Use 'charchat auth' to store an API key in your system keyring.\n\n\
Environment Variables (take precedence over the keyring):\n\
  CHARCHAT_API_KEY  API key for the completion service\n\
  GROQ_API_KEY      Fallback API key\n\
  CHARCHAT_LOG      Diagnostic log filter (e.g. debug, charchat=trace)\n\n\
Controls:\n\
  Type              Enter your message in the input field\n\
  Enter             Send the message\n\
  Tab/Shift+Tab     Switch to the next/previous character (clears the conversation)\n\
  Up/Down/PgUp/PgDn Scroll through the transcript\n\
  Ctrl+L            Pause or resume the transcript log\n\
  Ctrl+C            Quit the application\n\
  stop              Typed on its own, ends the chat"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// JSON file mapping character names to descriptions
    #[arg(long, global = true, value_name = "FILE")]
    pub characters: Option<PathBuf>,

    /// Character to start with
    #[arg(short = 'c', long, global = true, value_name = "NAME")]
    pub character: Option<String>,

    /// Model to use for completions
    #[arg(short = 'm', long, global = true, value_name = "MODEL")]
    pub model: Option<String>,

    /// Base URL of the OpenAI-compatible API
    #[arg(long, global = true, value_name = "URL")]
    pub base_url: Option<String>,

    /// Append the conversation to this file
    #[arg(short = 'l', long, global = true, value_name = "FILE")]
    pub log: Option<PathBuf>,

    /// Write diagnostic logs to this file
    #[arg(long, global = true, value_name = "FILE")]
    pub trace_file: Option<PathBuf>,
}

impl Args {
    pub fn overrides(&self) -> Overrides {
        Overrides {
            characters: self.characters.clone(),
            character: self.character.clone(),
            model: self.model.clone(),
            base_url: self.base_url.clone(),
        }
    }
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Start the chat interface (default)
    Chat,
    /// Send one message and print the reply
    Say {
        /// Message to send
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        prompt: Vec<String>,
    },
    /// List the characters in the catalog
    Characters,
    /// Store an API key in the system keyring
    Auth,
    /// Remove the stored API key
    Deauth,
    /// Set a configuration value, or show all values when none is given
    Set {
        /// Configuration key to set
        key: Option<String>,
        /// Value to set (can be multiple words)
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        value: Vec<String>,
    },
    /// Unset a configuration value
    Unset {
        /// Configuration key to unset
        key: String,
    },
}

pub fn main() -> Result<(), Box<dyn Error>> {
    tokio::runtime::Runtime::new()?.block_on(async_main())
}

async fn async_main() -> Result<(), Box<dyn Error>> {
    let mut args = Args::parse();
    let command = args.command.take().unwrap_or(Commands::Chat);
    let interactive = command == Commands::Chat;
    init_tracing(args.trace_file.as_deref(), interactive)?;

    match command {
        Commands::Auth => run_auth(),
        Commands::Deauth => run_deauth(),
        Commands::Set { key, value } => {
            let mut config = Config::load()?;
            match key {
                Some(key) if !value.is_empty() => {
                    let value = value.join(" ");
                    config.set_value(&key, &value)?;
                    config.save()?;
                    println!("✅ Set {key} to: {value}");
                }
                _ => config.print_all(),
            }
            Ok(())
        }
        Commands::Unset { key } => {
            let mut config = Config::load()?;
            config.unset_value(&key)?;
            config.save()?;
            println!("✅ Unset {key}");
            Ok(())
        }
        Commands::Characters => {
            let config = Config::load()?;
            let settings = Settings::resolve(&args.overrides(), &config);
            let catalog = load_catalog(&settings)?;
            list_characters(&catalog, &settings.catalog_path, settings.character.as_deref());
            Ok(())
        }
        Commands::Say { prompt } => {
            let config = Config::load()?;
            let settings = Settings::resolve(&args.overrides(), &config);
            let catalog = load_catalog(&settings)?;
            let session = open_session(catalog, &settings)?;
            let pipeline = build_pipeline(&settings)?;
            let log = TranscriptLog::new(args.log.clone())?;
            run_say(prompt, session, &pipeline, &log).await
        }
        Commands::Chat => {
            let config = Config::load()?;
            let settings = Settings::resolve(&args.overrides(), &config);
            let catalog = load_catalog(&settings)?;
            let session = open_session(catalog, &settings)?;
            let pipeline = build_pipeline(&settings)?;
            let log = TranscriptLog::new(args.log.clone())?;
            run_chat(session, Arc::new(pipeline), log).await
        }
    }
}
