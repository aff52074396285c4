use birdia_common::listing::{FlyTo, MapView};

use super::{clip, confidence_bar, more_footer, osm_link};

/// Marker list, plus the camera target when a marker is selected.
pub fn render_map(view: &MapView, center: (f64, f64), zoom: u8, fly_to: Option<FlyTo>) -> String {
    let mut lines = Vec::new();
    match fly_to {
        Some(f) => lines.push(format!("Flying to {}", osm_link(f.latitude, f.longitude, f.zoom))),
        None => lines.push(format!("Map: {}", osm_link(center.0, center.1, zoom))),
    }

    let markers = view.markers();
    if markers.is_empty() {
        lines.push("No sightings with coordinates.".to_string());
        return lines.join("\n");
    }

    lines.push(format!(
        "{} marker(s) of {} sighting(s) with coordinates",
        markers.len(),
        view.total()
    ));
    for p in &markers {
        let mark = if view.selected() == Some(p.log_id) { '>' } else { ' ' };
        lines.push(format!(
            "{mark} #{:<6} {:<26} {:>9.4},{:>9.4}  {}  {}",
            p.log_id,
            clip(&p.display_name, 26),
            p.latitude,
            p.longitude,
            p.date,
            confidence_bar(p.confidence)
        ));
        if let Some(user) = p.user.as_deref() {
            lines.push(format!("           by {user}"));
        }
    }
    if let Some(footer) = more_footer(markers.len(), view.filtered().len(), view.has_more()) {
        lines.push(footer);
    }
    lines.join("\n")
}
