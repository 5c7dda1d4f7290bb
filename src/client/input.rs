//! Local line input
//!
//! Interactive input is read with rustyline on a dedicated OS thread and
//! handed to the async side through an unbounded channel, so no runtime
//! worker ever blocks on the terminal and shutdown never waits on a
//! pending read.

use std::thread;

use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tokio::sync::mpsc;
use tracing::{error, info};

use crate::shutdown::Shutdown;
use crate::types::Target;

/// Source of user input lines
#[derive(Debug)]
pub struct InputLines {
    lines: mpsc::UnboundedReceiver<String>,
}

impl InputLines {
    /// Input fed by hand, for tests and embedders
    pub fn channel() -> (mpsc::UnboundedSender<String>, Self) {
        let (tx, rx) = mpsc::unbounded_channel();
        (tx, Self { lines: rx })
    }

    /// Input read from the terminal
    ///
    /// Ctrl+D closes the input. Ctrl+C is caught by the line editor
    /// before the process sees it, so it triggers `shutdown` instead.
    pub fn stdin(shutdown: Shutdown) -> Self {
        let (tx, input) = Self::channel();

        let spawned = thread::Builder::new()
            .name("stdin-reader".to_string())
            .spawn(move || {
                let mut editor = match DefaultEditor::new() {
                    Ok(editor) => editor,
                    Err(e) => {
                        error!("Failed to initialize line editor: {}", e);
                        return;
                    }
                };

                loop {
                    // Prompts are printed by the console.
                    let read = editor.readline("");
                    if let Ok(line) = &read {
                        if !line.trim().is_empty() {
                            editor.add_history_entry(line.as_str()).ok();
                        }
                    }
                    if !forward_read(read, &tx, &shutdown) {
                        break;
                    }
                }
            });

        // Without a reader thread the sender is dropped and the input
        // reads as closed.
        if let Err(e) = spawned {
            error!("Failed to spawn stdin reader: {}", e);
        }

        input
    }

    /// Next line, or `None` at end of input
    ///
    /// Cancel-safe.
    pub async fn next_line(&mut self) -> Option<String> {
        self.lines.recv().await
    }
}

/// Pass one editor result on to the async side
///
/// Returns `false` once the reader should stop.
fn forward_read(
    read: Result<String, ReadlineError>,
    lines: &mpsc::UnboundedSender<String>,
    shutdown: &Shutdown,
) -> bool {
    match read {
        Ok(line) => lines.send(line).is_ok(),
        Err(ReadlineError::Interrupted) => {
            info!("Interrupted");
            shutdown.trigger();
            false
        }
        Err(ReadlineError::Eof) => {
            info!("End of input");
            false
        }
        Err(e) => {
            error!("Failed to read input: {}", e);
            false
        }
    }
}

/// What the sender should do with one line of input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutgoingLine {
    /// Blank input
    Skip,
    /// Leave the chat
    Quit,
    /// Publish a chat message
    Send { target: Target, body: String },
}

/// Interpret one line typed by the user
///
/// `@name rest` addresses `name` privately; `@name` alone is sent to
/// everyone as typed.
pub fn parse_line(line: &str) -> OutgoingLine {
    let line = line.trim();

    if line.is_empty() {
        return OutgoingLine::Skip;
    }
    if line == "quit" {
        return OutgoingLine::Quit;
    }

    if let Some(rest) = line.strip_prefix('@') {
        if let Some((name, body)) = rest.split_once(' ') {
            if !name.is_empty() {
                return OutgoingLine::Send {
                    target: Target::from_wire(name),
                    body: body.trim_start().to_string(),
                };
            }
        }
    }

    OutgoingLine::Send {
        target: Target::All,
        body: line.to_string(),
    }
}
