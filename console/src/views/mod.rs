//! Text renderings of every screen.  Pure functions from data to `String`.

pub mod admin;
pub mod analysis;
pub mod history;
pub mod map;

use chrono::{DateTime, Local};

use birdia_common::model::parse_timestamp;

const BAR_WIDTH: usize = 20;

/// `[########............]  42.0%` for a probability in `0..=1`.
pub fn confidence_bar(probability: f64) -> String {
    let p = if probability.is_finite() {
        probability.clamp(0.0, 1.0)
    } else {
        0.0
    };
    let filled = (p * BAR_WIDTH as f64).round() as usize;
    format!(
        "[{}{}] {:5.1}%",
        "#".repeat(filled),
        ".".repeat(BAR_WIDTH - filled),
        p * 100.0
    )
}

pub fn format_date(raw: &str) -> String {
    match parse_timestamp(raw) {
        Some(t) => format_local(&t),
        None if raw.is_empty() => "-".to_string(),
        None => raw.to_string(),
    }
}

fn format_local(t: &DateTime<Local>) -> String {
    t.format("%d/%m/%Y %H:%M").to_string()
}

pub fn osm_link(latitude: f64, longitude: f64, zoom: u8) -> String {
    format!(
        "https://www.openstreetmap.org/?mlat={latitude:.5}&mlon={longitude:.5}#map={zoom}/{latitude:.5}/{longitude:.5}"
    )
}

/// Cut to `max` characters, marking the cut.
pub fn clip(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let mut s: String = text.chars().take(max.saturating_sub(1)).collect();
        s.push('…');
        s
    }
}

/// "Load more" hint under a paged list.
pub fn more_footer(shown: usize, total: usize, has_more: bool) -> Option<String> {
    has_more.then(|| format!("Showing {shown} of {total} – pass --more 1 to see more"))
}

pub fn photo_line(url: Option<&str>) -> String {
    match url {
        Some(u) if !u.is_empty() => format!("Photo: {u}"),
        _ => "Photo: not available".to_string(),
    }
}
