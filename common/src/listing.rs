//! Client-side filtering, "load more" paging and map markers.

use crate::catalog::CatalogLookup;
use crate::model::HistoryRecord;

/// Case-insensitive substring match against any of `fields`.
/// An empty query matches everything.
pub fn matches_query<'a>(query: &str, fields: impl IntoIterator<Item = &'a str>) -> bool {
    let q = query.trim().to_lowercase();
    if q.is_empty() {
        return true;
    }
    fields.into_iter().any(|f| f.to_lowercase().contains(&q))
}

/// History filter used by the global history screens: user name, raw label
/// or catalog common name.
pub fn history_matches(record: &HistoryRecord, lookup: &CatalogLookup, query: &str) -> bool {
    let common = lookup
        .get(&record.prediccion)
        .and_then(|e| e.nombre.clone())
        .unwrap_or_default();
    let user = record.usuario.clone().unwrap_or_default();
    matches_query(query, [user.as_str(), record.prediccion.as_str(), common.as_str()])
}

/// "Load more" slicing over an already-fetched list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Paginator {
    step: usize,
    visible: usize,
}

impl Paginator {
    pub fn new(step: usize) -> Self {
        let step = step.max(1);
        Self {
            step,
            visible: step,
        }
    }

    pub fn visible(&self) -> usize {
        self.visible
    }

    pub fn load_more(&mut self) {
        self.load_more_times(1);
    }

    /// Show `times` extra pages at once.  Saturates instead of overflowing.
    pub fn load_more_times(&mut self, times: usize) {
        self.visible = self.visible.saturating_add(self.step.saturating_mul(times));
    }

    pub fn with_more(mut self, times: usize) -> Self {
        self.load_more_times(times);
        self
    }

    /// Back to the first page, e.g. after the filter text changes.
    pub fn reset(&mut self) {
        self.visible = self.step;
    }

    pub fn page<'a, T>(&self, items: &'a [T]) -> &'a [T] {
        &items[..items.len().min(self.visible)]
    }

    pub fn has_more(&self, total: usize) -> bool {
        total > self.visible
    }
}

// ─── Map ─────────────────────────────────────────────────────────────────────

/// A plotted sighting joined with its catalog data.
#[derive(Debug, Clone, PartialEq)]
pub struct MapPoint {
    pub log_id: i64,
    pub latitude: f64,
    pub longitude: f64,
    pub scientific_name: String,
    pub display_name: String,
    pub image_url: Option<String>,
    pub confidence: f64,
    pub date: String,
    pub user: Option<String>,
}

/// Camera move for a selected marker.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlyTo {
    pub latitude: f64,
    pub longitude: f64,
    pub zoom: u8,
}

/// Marker list state for the map screen.
#[derive(Debug, Clone)]
pub struct MapView {
    points: Vec<MapPoint>,
    query: String,
    paginator: Paginator,
    selected: Option<i64>,
    fly_zoom: u8,
}

impl MapView {
    /// Join records with the catalog, dropping those without coordinates.
    pub fn new(records: &[HistoryRecord], lookup: &CatalogLookup, page_size: usize, fly_zoom: u8) -> Self {
        let points = records
            .iter()
            .filter_map(|r| {
                let (latitude, longitude) = r.coordinates()?;
                let species = lookup.resolve(&r.prediccion);
                Some(MapPoint {
                    log_id: r.log_id,
                    latitude,
                    longitude,
                    scientific_name: r.prediccion.clone(),
                    display_name: species.display_name,
                    image_url: species.image_url,
                    confidence: r.confianza,
                    date: r
                        .timestamp()
                        .map(|t| t.format("%Y-%m-%d").to_string())
                        .unwrap_or_else(|| r.fecha.clone()),
                    user: r.usuario.clone(),
                })
            })
            .collect();
        Self {
            points,
            query: String::new(),
            paginator: Paginator::new(page_size),
            selected: None,
            fly_zoom,
        }
    }

    pub fn total(&self) -> usize {
        self.points.len()
    }

    pub fn set_query(&mut self, query: &str) {
        if self.query != query {
            self.query = query.to_string();
            self.paginator.reset();
        }
    }

    pub fn load_more(&mut self) {
        self.paginator.load_more();
    }

    pub fn load_more_times(&mut self, times: usize) {
        self.paginator.load_more_times(times);
    }

    /// All points matching the current filter.
    pub fn filtered(&self) -> Vec<&MapPoint> {
        self.points
            .iter()
            .filter(|p| {
                matches_query(
                    &self.query,
                    [
                        p.display_name.as_str(),
                        p.scientific_name.as_str(),
                        p.user.as_deref().unwrap_or(""),
                    ],
                )
            })
            .collect()
    }

    /// Filtered points bounded by the current page.
    pub fn markers(&self) -> Vec<&MapPoint> {
        let filtered = self.filtered();
        self.paginator.page(&filtered).to_vec()
    }

    pub fn has_more(&self) -> bool {
        self.paginator.has_more(self.filtered().len())
    }

    /// Select a marker from the list; returns where to fly.
    pub fn select(&mut self, log_id: i64) -> Option<FlyTo> {
        let point = self.points.iter().find(|p| p.log_id == log_id)?;
        self.selected = Some(log_id);
        Some(FlyTo {
            latitude: point.latitude,
            longitude: point.longitude,
            zoom: self.fly_zoom,
        })
    }

    pub fn selected(&self) -> Option<i64> {
        self.selected
    }
}
