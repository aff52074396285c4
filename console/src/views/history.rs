use birdia_common::catalog::CatalogLookup;
use birdia_common::model::{CatalogEntry, HistoryRecord};
use birdia_common::stats::HistorySummary;

use super::{clip, confidence_bar, format_date, osm_link, photo_line};

/// History cards.  `show_user` adds the author line for the global view.
pub fn render_history(records: &[&HistoryRecord], lookup: &CatalogLookup, show_user: bool) -> String {
    if records.is_empty() {
        return "No identifications yet.".to_string();
    }
    let mut lines = Vec::new();
    for r in records {
        let species = lookup.resolve(&r.prediccion);
        lines.push(format!(
            "#{:<6} {} ({})",
            r.log_id,
            species.display_name,
            r.prediccion.replace('_', " ")
        ));
        let mut detail = format!("        {} · {}", format_date(&r.fecha), confidence_bar(r.confianza));
        if let Some(place) = r.ubicacion.as_deref().filter(|p| !p.is_empty()) {
            detail.push_str(&format!(" · {}", clip(place, 40)));
        }
        lines.push(detail);
        if show_user {
            lines.push(format!("        by {}", r.user_label()));
        }
    }
    lines.join("\n")
}

/// One record with its ranked candidates, photo and map link.
pub fn render_record(record: &HistoryRecord, lookup: &CatalogLookup, zoom: u8) -> String {
    let species = lookup.resolve(&record.prediccion);
    let mut lines = vec![
        format!("── Record #{} ──", record.log_id),
        format!("  {}", species.display_name),
        format!("  {}", record.prediccion.replace('_', " ")),
        format!("  {}", confidence_bar(record.confianza)),
        format!("  Date: {}", format_date(&record.fecha)),
        format!(
            "  Location: {}",
            record.ubicacion.as_deref().filter(|u| !u.is_empty()).unwrap_or("-")
        ),
    ];
    if let Some((lat, lon)) = record.coordinates() {
        lines.push(format!("  Map: {}", osm_link(lat, lon, zoom)));
    }
    lines.push(format!("  {}", photo_line(species.image_url.as_deref())));
    if let Some(audio) = species.audio_url.as_deref() {
        lines.push(format!("  Reference call: {audio}"));
    }

    if !record.top_5.is_empty() {
        lines.push("  Top candidates".to_string());
        for (i, p) in record.top_5.iter().take(5).enumerate() {
            let label = p
                .nombre
                .clone()
                .unwrap_or_else(|| lookup.display_name(&p.nombre_cientifico));
            lines.push(format!(
                "  {}. {:<28} {}",
                i + 1,
                clip(&label, 28),
                confidence_bar(p.probabilidad)
            ));
        }
    }
    lines.join("\n")
}

pub fn render_summary(summary: &HistorySummary, lookup: &CatalogLookup) -> String {
    let favourite = match &summary.most_frequent {
        Some((label, count)) => format!("{} ({count}×)", lookup.display_name(label)),
        None => "-".to_string(),
    };
    let favourite_photo = summary
        .most_frequent
        .as_ref()
        .and_then(|(label, _)| lookup.image_url(label));

    let mut lines = vec![
        "── Summary ──".to_string(),
        format!("  Identifications:     {}", summary.total),
        format!("  Today:               {}", summary.today),
        format!("  Species:             {}", summary.distinct_species),
        format!("  Average confidence:  {:.1}%", summary.average_confidence_pct),
        format!("  Most frequent:       {favourite}"),
    ];
    if favourite_photo.is_some() {
        lines.push(format!("  {}", photo_line(favourite_photo.as_deref())));
    }
    lines.join("\n")
}

pub fn render_catalog(entries: &[&CatalogEntry]) -> String {
    if entries.is_empty() {
        return "No species match.".to_string();
    }
    entries
        .iter()
        .map(|e| {
            let name = e
                .nombre
                .as_deref()
                .filter(|n| !n.is_empty())
                .unwrap_or("(no common name)");
            format!(
                "{:<28} {:<28} {}",
                clip(name, 28),
                clip(&e.nombre_cientifico.replace('_', " "), 28),
                e.imagen_url.as_deref().unwrap_or("-")
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}
