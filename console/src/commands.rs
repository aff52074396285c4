//! Command implementations.

use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use birdia_capture::Recorder;
use birdia_client::{AnalysisOutcome, PasswordChange};
use birdia_common::catalog::CatalogLookup;
use birdia_common::listing::{history_matches, matches_query, MapView, Paginator};
use birdia_common::model::{HistoryRecord, UserEdit};
use birdia_common::session::{Role, Session};
use birdia_common::stats::{HistorySummary, UserSummary};

use crate::app::{build_analyzer, App};
use crate::cli::{AdminCommand, Commands, HistoryCommand, ProfileCommand};
use crate::prompt::Prompter;
use crate::router::{self, Access};
use crate::signal::{self, RecordingGuard};
use crate::views;

/// Zoom of the overview map link.
const MAP_ZOOM: u8 = 13;

/// Guard the command, run it, and refresh the session on success.
pub async fn run(app: &mut App, command: Commands) -> Result<()> {
    let route = app.route()?;
    let session = router::authorize(&route, &command)?;
    let authenticated = router::access(&command) != Access::Public;

    let result = dispatch(app, command, session).await;
    if result.is_ok() && authenticated {
        app.touch_session()?;
    }
    result
}

async fn dispatch(app: &mut App, command: Commands, session: Option<Session>) -> Result<()> {
    match command {
        Commands::Login { email, password } => login(app, &email, password).await,
        Commands::Register {
            email,
            name,
            password,
        } => register(app, &email, &name, password).await,
        Commands::Logout => {
            app.api.logout()?;
            println!("Logged out.");
            Ok(())
        }
        Commands::Whoami => {
            let session = session.context("not logged in")?;
            whoami(&session);
            Ok(())
        }
        Commands::Analyze {
            file,
            record,
            seconds,
            clear,
        } => analyze(app, file, record, seconds, clear).await,
        Commands::Catalog { search } => catalog(app, search.as_deref()).await,
        Commands::History {
            action,
            search,
            more,
        } => history(app, action, search.as_deref(), more).await,
        Commands::Summary => summary(app).await,
        Commands::Map {
            search,
            select,
            more,
        } => {
            let session = session.context("not logged in")?;
            map(app, &session, search.as_deref(), select, more).await
        }
        Commands::Profile(cmd) => profile(app, cmd).await,
        Commands::Admin(cmd) => admin(app, cmd).await,
        Commands::Shell => anyhow::bail!("already in the shell"),
    }
}

// ── account ──────────────────────────────────────────────────────────────

async fn login(app: &mut App, email: &str, password: Option<String>) -> Result<()> {
    let password = app.prompter.secret_or_ask(password, "Password: ").await?;
    let session = app.api.login(email.trim(), &password).await?;
    println!("Welcome, {}.", session.user_name);
    whoami(&session);
    Ok(())
}

async fn register(app: &mut App, email: &str, name: &str, password: Option<String>) -> Result<()> {
    let password = app.prompter.secret_or_ask(password, "Choose a password: ").await?;
    app.api.register(email, &password, name).await?;
    println!("Account created. Log in with `birdia login {}`.", email.trim());
    Ok(())
}

fn whoami(session: &Session) {
    println!("{}", router::shell_title(session));
    for (cmd, help) in router::menu(session.capabilities()) {
        println!("  {cmd:<18} {help}");
    }
}

async fn profile(app: &mut App, cmd: ProfileCommand) -> Result<()> {
    match cmd {
        ProfileCommand::Show => {
            let me = app.api.me().await?;
            println!("Name:   {}", me.nombre_completo);
            println!("Email:  {}", me.email);
            println!(
                "Role:   {}",
                Role::from_flag(&me.role_id).capabilities().role_label()
            );
            println!(
                "Status: {}",
                if me.usuario_activo { "active" } else { "inactive" }
            );
        }
        ProfileCommand::Rename { name } => {
            let me = app.api.rename_profile(&name).await?;
            println!("Name updated to {}.", me.nombre_completo);
        }
        ProfileCommand::Password {
            current,
            new,
            confirm,
        } => {
            let change = PasswordChange {
                current: app.prompter.secret_or_ask(current, "Current password: ").await?,
                new: app.prompter.secret_or_ask(new, "New password: ").await?,
                confirm: app.prompter.secret_or_ask(confirm, "Repeat new password: ").await?,
            };
            app.api.change_password(&change).await?;
            println!("Password changed. Please log in again.");
        }
    }
    Ok(())
}

// ── analysis ─────────────────────────────────────────────────────────────

async fn analyze(
    app: &mut App,
    file: Option<PathBuf>,
    record: bool,
    seconds: Option<u64>,
    clear: bool,
) -> Result<()> {
    let analyzer = app.analyzer.get_or_insert_with(|| build_analyzer(&app.config));

    if clear {
        analyzer.recorder_mut().clear()?;
        println!("Capture discarded.");
        return Ok(());
    }
    if let Some(path) = file {
        let audio = analyzer.recorder_mut().select_file(&path)?;
        println!("Selected {} ({})", audio.file_name, describe_size(audio.len(), audio.duration()));
    }
    if record {
        record_from_microphone(analyzer.recorder_mut(), seconds, &mut app.prompter).await?;
    }

    println!("Analysing…");
    let outcome = match analyzer.submit(&app.api).await {
        Ok(o) => o,
        Err(e) => {
            if analyzer.recorder().capture().is_some() {
                eprintln!("{}", kept_capture_hint(app.interactive));
            }
            return Err(e.into());
        }
    };

    match outcome {
        AnalysisOutcome::Identified(response) => {
            let lookup = catalog_or_empty(app).await;
            println!("{}", views::analysis::render_result(&response, &lookup));
            let image = response
                .prediccion_principal
                .url_imagen
                .clone()
                .or_else(|| lookup.image_url(&response.prediccion_principal.especie));
            if app.open_image {
                if let Some(url) = image {
                    open_image(&url);
                }
            }
        }
        AnalysisOutcome::NoBirdDetected(response) => {
            println!("{}", views::analysis::render_no_bird(&response));
        }
    }
    Ok(())
}

async fn record_from_microphone(
    recorder: &mut Recorder,
    seconds: Option<u64>,
    prompter: &mut Prompter,
) -> Result<()> {
    let format = tokio::task::block_in_place(|| recorder.start_recording())?;
    let guard = RecordingGuard::begin();
    let limit = seconds.map(Duration::from_secs);
    match limit {
        Some(l) => println!(
            "Recording {} for up to {}s – press Enter or Ctrl-C to stop early",
            format.base_mime(),
            l.as_secs()
        ),
        None => println!("Recording {} – press Enter or Ctrl-C to stop", format.base_mime()),
    }

    let cause = wait_for_stop(prompter, limit).await;
    debug!("Recording stopped: {cause:?}");
    drop(guard);

    let (len, duration) = tokio::task::block_in_place(|| {
        recorder
            .stop_recording()
            .map(|audio| (audio.len(), audio.duration()))
    })?;
    println!("Captured {}", describe_size(len, duration));
    Ok(())
}

#[derive(Debug, PartialEq, Eq)]
enum StopCause {
    Enter,
    Signal,
    Limit,
}

/// Wait until Enter, Ctrl-C or the time limit.  Closed input only drops
/// Enter from the set.
async fn wait_for_stop(prompter: &mut Prompter, limit: Option<Duration>) -> StopCause {
    let started = Instant::now();
    let mut input_open = true;
    loop {
        tokio::select! {
            line = prompter.next_line(), if input_open => match line {
                Some(_) => return StopCause::Enter,
                None => {
                    input_open = false;
                    if limit.is_none() {
                        println!("Input closed – press Ctrl-C to stop");
                    }
                }
            },
            _ = tokio::time::sleep(Duration::from_millis(100)) => {
                if signal::stop_requested() {
                    return StopCause::Signal;
                }
                if limit.is_some_and(|l| started.elapsed() >= l) {
                    return StopCause::Limit;
                }
            }
        }
    }
}

/// What to tell the user when a submission fails but the capture survives.
fn kept_capture_hint(interactive: bool) -> &'static str {
    if interactive {
        "The capture is kept; run `analyze` again to resubmit it."
    } else {
        "The capture was not sent; run the command again to retry."
    }
}

fn describe_size(len: usize, duration: Option<Duration>) -> String {
    let kb = len as f64 / 1024.0;
    match duration {
        Some(d) => format!("{kb:.1} KB, {:.1}s", d.as_secs_f64()),
        None => format!("{kb:.1} KB"),
    }
}

fn open_image(url: &str) {
    match Command::new("xdg-open")
        .arg(url)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
    {
        Ok(_) => info!("Opened {url}"),
        Err(e) => warn!("Cannot open image viewer: {e}"),
    }
}

/// Display names are a nicety; a catalog failure must not hide a result.
async fn catalog_or_empty(app: &App) -> CatalogLookup {
    match app.api.catalog_lookup().await {
        Ok(l) => l,
        Err(e) => {
            warn!("Catalog unavailable: {e}");
            CatalogLookup::new(Vec::new())
        }
    }
}

// ── browsing ─────────────────────────────────────────────────────────────

fn print_page<T>(items: &[T], page_size: usize, more: usize, render: impl FnOnce(&[T]) -> String) {
    let paginator = Paginator::new(page_size).with_more(more);
    let page = paginator.page(items);
    println!("{}", render(page));
    if let Some(footer) = views::more_footer(page.len(), items.len(), paginator.has_more(items.len())) {
        println!("{footer}");
    }
}

async fn catalog(app: &App, search: Option<&str>) -> Result<()> {
    let lookup = app.api.catalog_lookup().await?;
    let entries = lookup.search(search.unwrap_or(""));
    println!("{}", views::history::render_catalog(&entries));
    println!("{} of {} species", entries.len(), lookup.len());
    Ok(())
}

async fn history(app: &mut App, action: Option<HistoryCommand>, search: Option<&str>, more: usize) -> Result<()> {
    match action {
        None => {
            let (records, lookup) = app.api.own_history_with_catalog().await?;
            let filtered = filter_history(&records, &lookup, search);
            print_page(&filtered, app.config.page_size, more, |page| {
                views::history::render_history(page, &lookup, false)
            });
        }
        Some(HistoryCommand::Show { id }) => {
            let (records, lookup) = app.api.own_history_with_catalog().await?;
            let record = records
                .iter()
                .find(|r| r.log_id == id)
                .with_context(|| format!("no record #{id} in your history"))?;
            println!(
                "{}",
                views::history::render_record(record, &lookup, app.config.map_fly_zoom)
            );
            if app.open_image {
                if let Some(url) = lookup.image_url(&record.prediccion) {
                    open_image(&url);
                }
            }
        }
        Some(HistoryCommand::Delete { id, yes }) => {
            if !yes && !app.prompter.confirm(&format!("Delete analysis #{id}?")).await? {
                println!("Cancelled.");
                return Ok(());
            }
            app.api.delete_record(id).await?;
            println!("Deleted #{id}.");
        }
    }
    Ok(())
}

fn filter_history<'a>(records: &'a [HistoryRecord], lookup: &CatalogLookup, search: Option<&str>) -> Vec<&'a HistoryRecord> {
    records
        .iter()
        .filter(|r| history_matches(r, lookup, search.unwrap_or("")))
        .collect()
}

async fn summary(app: &App) -> Result<()> {
    let (records, lookup) = app.api.own_history_with_catalog().await?;
    let summary = HistorySummary::compute_now(&records);
    println!("{}", views::history::render_summary(&summary, &lookup));
    Ok(())
}

async fn map(app: &App, session: &Session, search: Option<&str>, select: Option<i64>, more: usize) -> Result<()> {
    let (records, lookup) = if session.capabilities().can_administer() {
        app.api.global_history_with_catalog().await?
    } else {
        tokio::try_join!(app.api.history(), app.api.catalog_lookup())?
    };

    let mut view = MapView::new(&records, &lookup, app.config.page_size, app.config.map_fly_zoom);
    view.set_query(search.unwrap_or(""));
    view.load_more_times(more);
    let fly_to = match select {
        Some(id) => Some(
            view.select(id)
                .with_context(|| format!("record #{id} has no coordinates"))?,
        ),
        None => None,
    };
    println!(
        "{}",
        views::map::render_map(&view, app.config.map_center, MAP_ZOOM, fly_to)
    );
    Ok(())
}

// ── administration ───────────────────────────────────────────────────────

async fn admin(app: &mut App, cmd: AdminCommand) -> Result<()> {
    let page_size = app.config.page_size;
    match cmd {
        AdminCommand::Dashboard => {
            let (stats, lookup) = app.api.dashboard_with_catalog().await?;
            println!("{}", views::admin::render_dashboard(&stats, &lookup));
        }
        AdminCommand::Users { search, more } => {
            let users = app.api.list_users().await?;
            let summary = UserSummary::compute(&users);
            let q = search.as_deref().unwrap_or("");
            let filtered: Vec<_> = users
                .iter()
                .filter(|u| matches_query(q, [u.display_name(), u.email.as_str()]))
                .collect();
            print_page(&filtered, page_size, more, |page| {
                views::admin::render_users(page, &summary)
            });
        }
        AdminCommand::EditUser {
            id,
            name,
            email,
            active,
            password,
        } => {
            let users = app.api.list_users().await?;
            let user = users
                .iter()
                .find(|u| u.id_usuario == id)
                .with_context(|| format!("no user #{id}"))?;
            let current = UserEdit::prefilled(user);
            let edit = UserEdit::from_form(
                name.as_deref().unwrap_or(&current.nombre_completo),
                email.as_deref().unwrap_or(&current.email),
                active.unwrap_or(current.usuario_activo),
                &password,
            );
            app.api.edit_user(id, &edit).await?;
            println!("User #{id} updated.");
        }
        AdminCommand::Sessions { search, more } => {
            let rows = app.api.session_log().await?;
            let q = search.as_deref().unwrap_or("");
            let filtered: Vec<_> = rows
                .iter()
                .filter(|s| {
                    matches_query(
                        q,
                        [
                            s.usuario.email.as_str(),
                            s.ip_origen.as_str(),
                            s.estado.as_str(),
                            s.observacion.as_str(),
                        ],
                    )
                })
                .collect();
            print_page(&filtered, page_size, more, views::admin::render_sessions);
        }
        AdminCommand::Errors => {
            let entries = app.api.error_log(app.config.error_log_limit).await?;
            println!("{}", views::admin::render_errors(&entries));
        }
        AdminCommand::History { search, more } => {
            let (records, lookup) = app.api.global_history_with_catalog().await?;
            let filtered = filter_history(&records, &lookup, search.as_deref());
            print_page(&filtered, page_size, more, |page| {
                views::history::render_history(page, &lookup, true)
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_size() {
        assert_eq!(describe_size(2048, None), "2.0 KB");
        assert_eq!(describe_size(1024, Some(Duration::from_millis(1500))), "1.0 KB, 1.5s");
    }

    #[tokio::test]
    async fn test_recording_outlives_closed_input() {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel::<String>();
        drop(tx);
        let mut prompter = Prompter::from_channel(rx);

        let limit = Duration::from_millis(300);
        let started = Instant::now();
        let cause = wait_for_stop(&mut prompter, Some(limit)).await;
        assert_eq!(cause, StopCause::Limit);
        assert!(started.elapsed() >= limit);
    }

    #[tokio::test]
    async fn test_enter_stops_recording() {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        tx.send(String::new()).unwrap();
        let mut prompter = Prompter::from_channel(rx);

        let cause = wait_for_stop(&mut prompter, Some(Duration::from_secs(30))).await;
        assert_eq!(cause, StopCause::Enter);
    }

    #[test]
    fn test_kept_capture_hint_depends_on_mode() {
        assert!(kept_capture_hint(true).contains("run `analyze` again"));
        let one_shot = kept_capture_hint(false);
        assert!(!one_shot.contains("kept"));
        assert!(one_shot.contains("run the command again"));
    }
}
