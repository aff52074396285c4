//! Interactive shell.
//!
//! Runs commands typed one per line under the stored session and enforces
//! the inactivity policy while waiting for input.

use anyhow::Result;
use clap::Parser;
use tracing::{debug, info};

use birdia_common::idle::{IdlePolicy, IdleWatchdog};

use crate::app::App;
use crate::cli::ShellLine;
use crate::commands;
use crate::prompt::{is_yes, split_words};
use crate::router::{self, Route};

enum Event {
    Line(String),
    Eof,
    Idle,
}

pub async fn run(app: &mut App) -> Result<()> {
    let Some(session) = app.route()?.session().cloned() else {
        anyhow::bail!("not logged in – run `birdia login <email>` first");
    };
    print_banner(&session);
    app.interactive = true;

    let mut watchdog = IdleWatchdog::new(app.config.idle_timeout());
    loop {
        print_prompt();
        let deadline = tokio::time::Instant::from_std(watchdog.deadline());
        let event = tokio::select! {
            line = app.prompter.next_line() => match line {
                Some(l) => Event::Line(l),
                None => Event::Eof,
            },
            _ = tokio::time::sleep_until(deadline) => Event::Idle,
        };

        match event {
            Event::Eof => {
                println!();
                return Ok(());
            }
            Event::Idle => {
                if !keep_session(app).await? {
                    return Ok(());
                }
                watchdog.record_activity();
            }
            Event::Line(line) => {
                note_activity(app, &mut watchdog)?;
                let words = split_words(&line);
                match words.first().map(String::as_str) {
                    None => continue,
                    Some("exit" | "quit") => return Ok(()),
                    Some("menu") => {
                        if let Some(s) = app.route()?.session() {
                            print_banner(s);
                        }
                        continue;
                    }
                    _ => {}
                }
                match ShellLine::try_parse_from(&words) {
                    Ok(parsed) => {
                        if let Err(e) = commands::run(app, parsed.command).await {
                            eprintln!("error: {e:#}");
                        }
                    }
                    Err(e) => {
                        let _ = e.print();
                    }
                }
                if app.route()? == Route::Login {
                    println!("Session ended.");
                    return Ok(());
                }
            }
        }
    }
}

/// Any typed line counts as use of the session, even one that runs nothing.
fn note_activity(app: &App, watchdog: &mut IdleWatchdog) -> Result<()> {
    watchdog.record_activity();
    app.touch_session()
}

/// Apply the idle policy; `false` means the session was closed.
async fn keep_session(app: &mut App) -> Result<bool> {
    match app.config.idle_policy {
        IdlePolicy::Logout => {
            info!("Idle timeout reached, logging out");
        }
        IdlePolicy::Prompt { grace } => {
            println!();
            let question = format!(
                "Still there? You will be logged out in {}s. Continue? [Y/n] ",
                grace.as_secs()
            );
            if let Some(answer) = app.prompter.ask_within(&question, grace).await {
                if answer.is_empty() || is_yes(&answer) {
                    app.touch_session()?;
                    return Ok(true);
                }
            }
            debug!("No answer within {grace:?}");
        }
    }
    app.api.logout()?;
    println!("Logged out after inactivity.");
    Ok(false)
}

fn print_banner(session: &birdia_common::session::Session) {
    println!("{}", router::shell_title(session));
    for (cmd, help) in router::menu(session.capabilities()) {
        println!("  {cmd:<18} {help}");
    }
    println!("  {:<18} {}", "menu | help", "this list | command help");
    println!("  {:<18} {}", "exit", "leave the shell");
}

fn print_prompt() {
    use std::io::Write;
    print!("birdia> ");
    let _ = std::io::stdout().flush();
}
