//! Species catalog lookup.
//!
//! History, map and result views only carry scientific names.  The lookup
//! is built once from the catalog and turns those into display names and
//! photos, falling back to a tidied-up scientific name.

use std::collections::HashMap;

use crate::model::CatalogEntry;

/// What a view needs to show a species.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedSpecies {
    pub display_name: String,
    pub scientific_name: String,
    pub image_url: Option<String>,
    pub audio_url: Option<String>,
    /// `false` when the name is the formatted fallback.
    pub in_catalog: bool,
}

#[derive(Debug, Clone, Default)]
pub struct CatalogLookup {
    entries: Vec<CatalogEntry>,
    by_key: HashMap<String, usize>,
}

impl CatalogLookup {
    pub fn new(entries: Vec<CatalogEntry>) -> Self {
        let mut by_key = HashMap::with_capacity(entries.len());
        for (i, entry) in entries.iter().enumerate() {
            let key = normalize_key(&entry.nombre_cientifico);
            if key.is_empty() {
                continue;
            }
            // first entry wins on duplicate keys
            by_key.entry(key).or_insert(i);
        }
        Self { entries, by_key }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    pub fn get(&self, scientific_name: &str) -> Option<&CatalogEntry> {
        self.by_key
            .get(&normalize_key(scientific_name))
            .map(|&i| &self.entries[i])
    }

    /// Resolve a label to its display name and photo.
    pub fn resolve(&self, scientific_name: &str) -> ResolvedSpecies {
        match self.get(scientific_name) {
            Some(entry) => ResolvedSpecies {
                display_name: entry
                    .nombre
                    .clone()
                    .filter(|n| !n.trim().is_empty())
                    .unwrap_or_else(|| format_scientific_name(scientific_name)),
                scientific_name: scientific_name.to_string(),
                image_url: entry.imagen_url.clone(),
                audio_url: entry.audio_url.clone(),
                in_catalog: true,
            },
            None => ResolvedSpecies {
                display_name: format_scientific_name(scientific_name),
                scientific_name: scientific_name.to_string(),
                image_url: None,
                audio_url: None,
                in_catalog: false,
            },
        }
    }

    pub fn display_name(&self, scientific_name: &str) -> String {
        self.resolve(scientific_name).display_name
    }

    pub fn image_url(&self, scientific_name: &str) -> Option<String> {
        self.get(scientific_name).and_then(|e| e.imagen_url.clone())
    }

    /// Catalog entries whose common or scientific name contains `query`.
    pub fn search(&self, query: &str) -> Vec<&CatalogEntry> {
        let q = query.trim().to_lowercase();
        self.entries
            .iter()
            .filter(|e| {
                if q.is_empty() {
                    return true;
                }
                let common = e.nombre.as_deref().unwrap_or("").to_lowercase();
                let sci = e.nombre_cientifico.to_lowercase();
                common.contains(&q) || sci.contains(&q) || sci.replace('_', " ").contains(&q)
            })
            .collect()
    }
}

/// Lower-case, underscores as spaces, trimmed.
pub fn normalize_key(name: &str) -> String {
    name.to_lowercase().replace('_', " ").trim().to_string()
}

/// `"Unknown_sp"` → `"Unknown Sp"`.
pub fn format_scientific_name(name: &str) -> String {
    let spaced = name.replace('_', " ");
    if spaced.trim().is_empty() {
        return "Unknown".to_string();
    }
    let mut out = String::with_capacity(spaced.len());
    let mut at_word_start = true;
    for ch in spaced.chars() {
        if at_word_start && ch.is_alphanumeric() {
            out.extend(ch.to_uppercase());
        } else {
            out.push(ch);
        }
        at_word_start = !ch.is_alphanumeric();
    }
    out
}
