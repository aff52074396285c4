use birdia_common::catalog::CatalogLookup;
use birdia_common::model::InferenceResponse;

use super::{clip, confidence_bar, photo_line};

/// Result "modal": principal species, its confidence and the ranked list.
pub fn render_result(response: &InferenceResponse, lookup: &CatalogLookup) -> String {
    let main = &response.prediccion_principal;
    let species = lookup.resolve(&main.especie);
    let name = main
        .nombre
        .clone()
        .filter(|n| !n.trim().is_empty() && !species.in_catalog)
        .unwrap_or(species.display_name);
    let image = main.url_imagen.clone().or(species.image_url);

    let mut lines = vec![
        "── Identification result ──".to_string(),
        format!("  {name}"),
        format!("  {}", main.especie.replace('_', " ")),
        format!("  {}", confidence_bar(main.probabilidad)),
        format!("  {}", photo_line(image.as_deref())),
    ];

    if !response.top_5_predicciones.is_empty() {
        lines.push(String::new());
        lines.push("  Top candidates".to_string());
        for (i, p) in response.top_5_predicciones.iter().take(5).enumerate() {
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

pub fn render_no_bird(response: &InferenceResponse) -> String {
    let mut lines = vec![
        "── No bird detected ──".to_string(),
        "  The recording did not contain a call the model could recognise.".to_string(),
        "  Try again closer to the bird, with less background noise.".to_string(),
    ];
    if let Some(note) = response.prediccion_principal.nombre.as_deref() {
        lines.push(format!("  ({note})"));
    }
    lines.join("\n")
}
