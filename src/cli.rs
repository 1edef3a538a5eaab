use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[clap(author = "F++ developers", version, about = "The F++ scripting language")]
pub struct Args {
    /// Starts the interactive shell when omitted
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a .fpp script
    Run {
        /// Path to the script
        file: PathBuf,
    },

    /// Check a .fpp script for lexical and syntax errors without running it
    Check {
        /// Path to the script to check
        file: PathBuf,
    },

    /// Start an interactive shell session
    Repl,
}

impl Args {
    pub fn command(self) -> Commands {
        self.command.unwrap_or(Commands::Repl)
    }
}
