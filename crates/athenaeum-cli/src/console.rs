//! Line-oriented terminal input
//!
//! A real terminal gets a rustyline editor; piped input is read line by
//! line so scripted sessions behave the same way.

use athenaeum_core::Error;
use athenaeum_core::security::{SecretPrompt, SecretSource};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use std::io::{self, BufRead, IsTerminal, Lines, StdinLock, Write};
use tracing::debug;
use zeroize::Zeroizing;

pub enum Console {
    Editor(DefaultEditor),
    Piped(Lines<StdinLock<'static>>),
}

impl Console {
    pub fn open() -> anyhow::Result<Self> {
        if io::stdin().is_terminal() {
            Ok(Console::Editor(DefaultEditor::new()?))
        } else {
            Ok(Console::Piped(io::stdin().lock().lines()))
        }
    }

    /// Read one line; `None` once input is closed or interrupted
    pub fn read_line(&mut self, prompt: &str) -> anyhow::Result<Option<String>> {
        self.read(prompt, true)
    }

    /// Read a line that must not be kept in history
    pub fn read_secret(&mut self, prompt: &str) -> anyhow::Result<Option<Zeroizing<String>>> {
        Ok(self.read(prompt, false)?.map(Zeroizing::new))
    }

    fn read(&mut self, prompt: &str, remember: bool) -> anyhow::Result<Option<String>> {
        match self {
            Console::Editor(editor) => match editor.readline(prompt) {
                Ok(line) => {
                    if remember && !line.trim().is_empty() {
                        if let Err(err) = editor.add_history_entry(line.as_str()) {
                            debug!(error = %err, "Failed to record history entry");
                        }
                    }
                    Ok(Some(line))
                }
                Err(ReadlineError::Interrupted | ReadlineError::Eof) => Ok(None),
                Err(err) => Err(err.into()),
            },
            Console::Piped(lines) => {
                print!("{}", prompt);
                io::stdout().flush()?;
                let line = lines.next().transpose()?;
                println!();
                Ok(line)
            }
        }
    }

    /// Ask a yes/no question; anything but "yes" is a no
    pub fn confirm(&mut self, question: &str) -> anyhow::Result<bool> {
        let answer = self.read_line(&format!("{} (yes/no): ", question))?;
        Ok(answer.is_some_and(|a| a.trim().eq_ignore_ascii_case("yes")))
    }
}

/// Prompts for the admin code on the console; `cancel` or closed input
/// abandons the login
pub struct ConsoleSecretSource<'a> {
    console: &'a mut Console,
}

impl<'a> ConsoleSecretSource<'a> {
    pub fn new(console: &'a mut Console) -> Self {
        Self { console }
    }
}

impl SecretSource for ConsoleSecretSource<'_> {
    fn request(&mut self, attempt: u32, remaining: u32) -> athenaeum_core::Result<SecretPrompt> {
        if attempt > 1 {
            println!("Invalid code. {} attempts remaining.", remaining);
        }

        let answer = self
            .console
            .read_secret("Enter admin code (or type 'cancel' to return): ")
            .map_err(|e| Error::AuthenticationFailed(format!("could not read admin code: {}", e)))?;

        Ok(match answer {
            Some(code) if code.trim().eq_ignore_ascii_case("cancel") => SecretPrompt::Cancel,
            Some(code) => SecretPrompt::Candidate(code),
            None => SecretPrompt::Cancel,
        })
    }
}
