//! Session guard: decides which shell a stored session lands in and which
//! commands it may run.

use std::time::Duration;

use anyhow::Result;
use chrono::{DateTime, Utc};
use tracing::{info, warn};

use birdia_common::session::{Capabilities, Role, Session, SessionStore};

use crate::cli::Commands;

#[derive(Debug, Clone, PartialEq)]
pub enum Route {
    Login,
    AdminShell(Session),
    UserShell(Session),
}

impl Route {
    pub fn session(&self) -> Option<&Session> {
        match self {
            Route::Login => None,
            Route::AdminShell(s) | Route::UserShell(s) => Some(s),
        }
    }
}

/// Read the stored session.  A session idle past `idle_timeout` is cleared
/// and treated as absent.
pub fn resolve(store: &dyn SessionStore, idle_timeout: Duration, now: DateTime<Utc>) -> Result<Route> {
    let Some(session) = store.load()? else {
        return Ok(Route::Login);
    };
    if session.is_idle_expired(idle_timeout, now) {
        warn!("Session for {} expired after inactivity", session.user_name);
        store.clear()?;
        return Ok(Route::Login);
    }
    Ok(match session.role {
        Role::Admin => Route::AdminShell(session),
        Role::Researcher => Route::UserShell(session),
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Public,
    Session,
    Admin,
}

pub fn access(command: &Commands) -> Access {
    match command {
        Commands::Login { .. } | Commands::Register { .. } | Commands::Logout => Access::Public,
        Commands::Admin(_) => Access::Admin,
        _ => Access::Session,
    }
}

/// Check `command` against the route; returns the session it runs under.
pub fn authorize(route: &Route, command: &Commands) -> Result<Option<Session>> {
    match (access(command), route) {
        (Access::Public, route) => Ok(route.session().cloned()),
        (_, Route::Login) => {
            anyhow::bail!("not logged in – run `birdia login <email>` first")
        }
        (Access::Admin, Route::UserShell(_)) => {
            info!("Refused administrator command for a researcher account");
            anyhow::bail!("this command requires an administrator account")
        }
        (_, Route::AdminShell(s) | Route::UserShell(s)) => Ok(Some(s.clone())),
    }
}

/// Commands offered in the shell menu.
pub fn menu(caps: Capabilities) -> Vec<(&'static str, &'static str)> {
    let mut items = vec![
        ("analyze", "identify a call (--file <path> | --record)"),
        ("history", "your identifications"),
        ("summary", "totals over your history"),
        ("map", "sightings with coordinates"),
        ("catalog", "species catalog"),
        ("profile", "show | rename | password"),
    ];
    if caps.can_administer() {
        items.extend([
            ("admin dashboard", "platform metrics"),
            ("admin users", "manage users"),
            ("admin sessions", "sign-in log"),
            ("admin errors", "backend errors"),
            ("admin history", "identifications by everyone"),
        ]);
    }
    items.push(("logout", "end the session"));
    items
}

pub fn shell_title(session: &Session) -> String {
    format!(
        "BirdIA · {} · {}",
        session.user_name,
        session.capabilities().role_label()
    )
}
