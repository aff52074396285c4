use birdia_common::catalog::CatalogLookup;
use birdia_common::model::{AdminUser, DashboardStats, ErrorLogEntry, SessionAudit, TopSpecies};
use birdia_common::stats::UserSummary;

use super::{clip, format_date, photo_line};

pub fn render_dashboard(stats: &DashboardStats, lookup: &CatalogLookup) -> String {
    let mut lines = vec![
        "── Dashboard ──".to_string(),
        format!("  Logins today:  {}", stats.metricas.logins_hoy),
        format!("  Total users:   {}", stats.metricas.usuarios_totales),
        String::new(),
    ];
    for (title, top) in [
        ("Top of the day", &stats.tops.dia),
        ("Top of the week", &stats.tops.semana),
        ("Top overall", &stats.tops.general),
    ] {
        lines.push(format!("  {title}"));
        lines.extend(top_card(top.as_ref(), lookup));
    }
    lines.join("\n")
}

fn top_card(top: Option<&TopSpecies>, lookup: &CatalogLookup) -> Vec<String> {
    let Some(top) = top else {
        return vec!["    no data".to_string()];
    };
    let species = lookup.resolve(&top.especie);
    let image = top.imagen.clone().or(species.image_url);
    vec![
        format!("    {} · {} identifications", species.display_name, top.total),
        format!("    {}", photo_line(image.as_deref())),
    ]
}

pub fn render_users(users: &[&AdminUser], summary: &UserSummary) -> String {
    let mut lines = vec![
        format!(
            "Users: {} total · {} active · {} inactive ({:.0}% active)",
            summary.total, summary.active, summary.inactive, summary.active_pct
        ),
        format!("{:<6} {:<26} {:<30} {:<14} {}", "ID", "Name", "Email", "Role", "Status"),
        "-".repeat(86),
    ];
    for u in users {
        lines.push(format!(
            "{:<6} {:<26} {:<30} {:<14} {}",
            u.id_usuario,
            clip(u.display_name(), 26),
            clip(&u.email, 30),
            clip(u.rol.as_deref().unwrap_or("-"), 14),
            if u.usuario_activo { "active" } else { "inactive" }
        ));
    }
    lines.join("\n")
}

pub fn render_sessions(rows: &[&SessionAudit]) -> String {
    if rows.is_empty() {
        return "No sign-ins recorded.".to_string();
    }
    let mut lines = vec![
        format!(
            "{:<17} {:<28} {:<10} {:<16} {:<10} {}",
            "Date", "Email", "Role", "IP", "Status", "Note"
        ),
        "-".repeat(100),
    ];
    for s in rows {
        lines.push(format!(
            "{:<17} {:<28} {:<10} {:<16} {:<10} {}",
            format_date(&s.fecha_ingreso),
            clip(&s.usuario.email, 28),
            clip(&s.usuario.rol, 10),
            clip(&s.ip_origen, 16),
            clip(&s.estado, 10),
            s.observacion
        ));
    }
    lines.join("\n")
}

pub fn render_errors(entries: &[ErrorLogEntry]) -> String {
    if entries.is_empty() {
        return "No errors logged.".to_string();
    }
    let mut lines = Vec::new();
    for e in entries {
        lines.push(format!(
            "#{:<5} {} [{}] {}",
            e.id_log,
            format_date(&e.fecha),
            e.fuente,
            e.nombre_usuario.as_deref().unwrap_or("system")
        ));
        lines.push(format!("       {}", clip(&e.mensaje_error, 160)));
    }
    lines.join("\n")
}
