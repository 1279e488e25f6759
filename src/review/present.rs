//! Delivering the accepted result: stdout or an interactive handler.

use std::io::Write;
use std::process::{Command, Stdio};

use colored::Colorize;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ConfigError, PresentError};

/// Where the accepted result goes.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum OutputMode {
    #[default]
    Stdout,
    Interactive,
}

impl std::str::FromStr for OutputMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "stdout" => Ok(OutputMode::Stdout),
            "interactive" => Ok(OutputMode::Interactive),
            _ => Err(ConfigError::InvalidValue {
                key: "mode".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

/// Action run with the result in interactive mode.
pub trait InteractiveHandler {
    fn handle(&self, result: &str) -> Result<(), PresentError>;
}

/// Print `result` to stdout, or pass it to `handler` in interactive mode.
pub fn present(
    result: &str,
    mode: OutputMode,
    handler: &dyn InteractiveHandler,
) -> Result<(), PresentError> {
    present_to(&mut std::io::stdout().lock(), result, mode, handler)
}

pub fn present_to<W: Write>(
    out: &mut W,
    result: &str,
    mode: OutputMode,
    handler: &dyn InteractiveHandler,
) -> Result<(), PresentError> {
    match mode {
        OutputMode::Stdout => {
            writeln!(out, "{result}")?;
            out.flush()?;
            Ok(())
        }
        OutputMode::Interactive => handler.handle(result),
    }
}

const CLIPBOARD_COMMANDS: [(&str, &[&str]); 5] = [
    ("pbcopy", &[]),
    ("clip", &[]),
    ("wl-copy", &[]),
    ("xclip", &["-selection", "clipboard"]),
    ("xsel", &["--clipboard", "--input"]),
];

#[derive(Debug, Clone, PartialEq, Eq)]
struct ClipboardCommand {
    program: String,
    args: Vec<String>,
}

/// Copies the result to the system clipboard.
#[derive(Debug, Clone, Default)]
pub struct ClipboardHandler {
    /// `None` looks the command up on first use.
    command: Option<ClipboardCommand>,
}

impl ClipboardHandler {
    /// Use the first clipboard command found on PATH when the result is copied.
    pub fn system() -> Self {
        Self::default()
    }

    pub fn with_command(program: &str, args: &[&str]) -> Self {
        Self {
            command: Some(ClipboardCommand {
                program: program.to_string(),
                args: args.iter().map(|a| a.to_string()).collect(),
            }),
        }
    }

    fn resolve(&self) -> Result<ClipboardCommand, PresentError> {
        if let Some(command) = &self.command {
            return Ok(command.clone());
        }
        CLIPBOARD_COMMANDS
            .iter()
            .find(|(program, _)| which::which(program).is_ok())
            .map(|(program, args)| ClipboardCommand {
                program: program.to_string(),
                args: args.iter().map(|a| a.to_string()).collect(),
            })
            .ok_or(PresentError::ClipboardUnavailable)
    }

    fn copy(&self, text: &str) -> Result<(), PresentError> {
        let command = self.resolve()?;
        let failed = |source| PresentError::ClipboardFailed {
            command: command.program.clone(),
            source,
        };

        debug!("Copying {} chars with {}", text.len(), command.program);
        let mut child = Command::new(&command.program)
            .args(&command.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(failed)?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(text.as_bytes()).map_err(failed)?;
        }

        let status = child.wait().map_err(failed)?;
        if !status.success() {
            return Err(failed(std::io::Error::other(format!("exited with {status}"))));
        }
        Ok(())
    }
}

impl InteractiveHandler for ClipboardHandler {
    fn handle(&self, result: &str) -> Result<(), PresentError> {
        self.copy(result)?;
        eprintln!("{}", "Copied to clipboard 📋".green());
        Ok(())
    }
}
