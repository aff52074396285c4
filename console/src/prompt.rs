//! Terminal input.
//!
//! Lines are read on a dedicated thread and handed over a channel, so the
//! shell can wait for input and for the idle deadline at the same time.

use std::io::{BufRead, Write};
use std::time::Duration;

use anyhow::Result;
use tokio::sync::mpsc;
use tracing::debug;

pub struct Prompter {
    rx: Option<mpsc::UnboundedReceiver<String>>,
}

impl Prompter {
    pub fn new() -> Self {
        Self { rx: None }
    }

    #[cfg(test)]
    pub fn from_channel(rx: mpsc::UnboundedReceiver<String>) -> Self {
        Self { rx: Some(rx) }
    }

    fn lines(&mut self) -> &mut mpsc::UnboundedReceiver<String> {
        self.rx.get_or_insert_with(|| {
            let (tx, rx) = mpsc::unbounded_channel();
            std::thread::Builder::new()
                .name("stdin".into())
                .spawn(move || {
                    let stdin = std::io::stdin();
                    for line in stdin.lock().lines() {
                        let Ok(line) = line else { break };
                        if tx.send(line).is_err() {
                            break;
                        }
                    }
                    debug!("stdin closed");
                })
                .ok();
            rx
        })
    }

    /// Next input line; `None` once stdin is closed.
    pub async fn next_line(&mut self) -> Option<String> {
        self.lines().recv().await
    }

    pub async fn ask(&mut self, prompt: &str) -> Result<String> {
        print_prompt(prompt);
        match self.next_line().await {
            Some(line) => Ok(line.trim().to_string()),
            None => anyhow::bail!("input closed"),
        }
    }

    /// Like [`ask`](Self::ask) but gives up after `timeout`.
    pub async fn ask_within(&mut self, prompt: &str, timeout: Duration) -> Option<String> {
        print_prompt(prompt);
        tokio::time::timeout(timeout, self.next_line())
            .await
            .ok()
            .flatten()
            .map(|l| l.trim().to_string())
    }

    /// Like [`ask`](Self::ask) with terminal echo off, for passwords.
    pub async fn ask_secret(&mut self, prompt: &str) -> Result<String> {
        #[cfg(unix)]
        let _echo = EchoOff::for_fd(libc::STDIN_FILENO);
        self.ask(prompt).await
    }

    /// Use `given` or ask for it without echo.
    pub async fn secret_or_ask(&mut self, given: Option<String>, prompt: &str) -> Result<String> {
        match given {
            Some(v) => Ok(v),
            None => self.ask_secret(prompt).await,
        }
    }

    pub async fn confirm(&mut self, question: &str) -> Result<bool> {
        let answer = self.ask(&format!("{question} [y/N] ")).await?;
        Ok(is_yes(&answer))
    }

}

// ── echo ─────────────────────────────────────────────────────────────────

/// Terminal echo switched off while alive.  The newline is still echoed.
/// Does nothing when the descriptor is not a terminal.
#[cfg(unix)]
struct EchoOff {
    fd: libc::c_int,
    saved: Option<libc::termios>,
}

#[cfg(unix)]
impl EchoOff {
    fn for_fd(fd: libc::c_int) -> Self {
        // SAFETY: termios is plain data and is filled in by tcgetattr before
        // it is read or written back.
        let saved = unsafe {
            if libc::isatty(fd) != 1 {
                None
            } else {
                let mut term: libc::termios = std::mem::zeroed();
                if libc::tcgetattr(fd, &mut term) != 0 {
                    None
                } else {
                    let saved = term;
                    term.c_lflag &= !libc::ECHO;
                    term.c_lflag |= libc::ECHONL;
                    (libc::tcsetattr(fd, libc::TCSANOW, &term) == 0).then_some(saved)
                }
            }
        };
        let echo = Self { fd, saved };
        if !echo.is_active() {
            debug!("fd {fd} is not a terminal; reading secret as-is");
        }
        echo
    }

    fn is_active(&self) -> bool {
        self.saved.is_some()
    }
}

#[cfg(unix)]
impl Drop for EchoOff {
    fn drop(&mut self) {
        if let Some(saved) = &self.saved {
            // SAFETY: restores the attributes read in `for_fd`.
            unsafe {
                libc::tcsetattr(self.fd, libc::TCSANOW, saved);
            }
        }
    }
}

pub fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes" | "s" | "si" | "sí")
}

fn print_prompt(prompt: &str) {
    let mut out = std::io::stdout();
    let _ = write!(out, "{prompt}");
    let _ = out.flush();
}

/// Split a shell line into words, honouring double quotes.
pub fn split_words(line: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    let mut has_word = false;

    for c in line.chars() {
        match c {
            '"' => {
                quoted = !quoted;
                has_word = true;
            }
            c if c.is_whitespace() && !quoted => {
                if has_word {
                    words.push(std::mem::take(&mut current));
                    has_word = false;
                }
            }
            c => {
                current.push(c);
                has_word = true;
            }
        }
    }
    if has_word {
        words.push(current);
    }
    words
}
