//! Client-side aggregates over fetched collections.

use std::collections::HashMap;

use chrono::{Local, NaiveDate};

use crate::model::{AdminUser, HistoryRecord};

/// Metrics shown on the personal and global summary screens.
#[derive(Debug, Clone, PartialEq)]
pub struct HistorySummary {
    pub total: usize,
    /// Mean confidence, 0..=100.
    pub average_confidence_pct: f64,
    pub today: usize,
    pub distinct_species: usize,
    /// Most frequent label with its count; ties go to the label seen first.
    pub most_frequent: Option<(String, usize)>,
}

impl HistorySummary {
    pub fn compute(records: &[HistoryRecord], today: NaiveDate) -> Self {
        let total = records.len();
        let average_confidence_pct = if total == 0 {
            0.0
        } else {
            records.iter().map(|r| r.confianza).sum::<f64>() / total as f64 * 100.0
        };
        let (most_frequent, distinct_species) = most_frequent_label(records);

        Self {
            total,
            average_confidence_pct,
            today: count_on_date(records, today),
            distinct_species,
            most_frequent,
        }
    }

    pub fn compute_now(records: &[HistoryRecord]) -> Self {
        Self::compute(records, Local::now().date_naive())
    }
}

/// Records whose timestamp falls on `day` in local time.
pub fn count_on_date(records: &[HistoryRecord], day: NaiveDate) -> usize {
    records
        .iter()
        .filter_map(HistoryRecord::timestamp)
        .filter(|ts| ts.date_naive() == day)
        .count()
}

/// Scan once: most frequent label and number of distinct labels.
fn most_frequent_label(records: &[HistoryRecord]) -> (Option<(String, usize)>, usize) {
    let mut counts: HashMap<&str, (usize, usize)> = HashMap::new();
    for (i, r) in records.iter().enumerate() {
        if r.prediccion.is_empty() {
            continue;
        }
        counts.entry(r.prediccion.as_str()).or_insert((0, i)).0 += 1;
    }
    let distinct = counts.len();
    let best = counts
        .into_iter()
        .max_by(|(_, (ca, fa)), (_, (cb, fb))| ca.cmp(cb).then(fb.cmp(fa)))
        .map(|(label, (count, _))| (label.to_string(), count));
    (best, distinct)
}

/// Account totals for the user-management screen.
#[derive(Debug, Clone, PartialEq)]
pub struct UserSummary {
    pub total: usize,
    pub active: usize,
    pub inactive: usize,
    /// Share of active accounts, 0..=100.
    pub active_pct: f64,
}

impl UserSummary {
    pub fn compute(users: &[AdminUser]) -> Self {
        let total = users.len();
        let active = users.iter().filter(|u| u.usuario_activo).count();
        Self {
            total,
            active,
            inactive: total - active,
            active_pct: percentage(active, total),
        }
    }
}

fn percentage(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn rec(id: i64, label: &str, conf: f64, fecha: &str) -> HistoryRecord {
        HistoryRecord {
            log_id: id,
            prediccion: label.to_string(),
            confianza: conf,
            fecha: fecha.to_string(),
            ubicacion: None,
            latitud: None,
            longitud: None,
            usuario: None,
            nombre_completo: None,
            id_usuario: None,
            top_5: vec![],
        }
    }

    #[test]
    fn test_today_count_uses_local_date() {
        let now = Local::now();
        let today = now.date_naive();
        let today_str = now.format("%Y-%m-%dT%H:%M:%S").to_string();
        let yesterday = (now - Duration::days(1)).format("%Y-%m-%dT%H:%M:%S").to_string();

        let records = vec![
            rec(1, "Ara_macao", 0.9, &today_str),
            rec(2, "Ara_macao", 0.8, &today_str),
            rec(3, "Turdus_merula", 0.7, &yesterday),
            rec(4, "Turdus_merula", 0.7, "not a date"),
        ];
        assert_eq!(count_on_date(&records, today), 2);
        assert_eq!(HistorySummary::compute(&records, today).today, 2);
    }

    #[test]
    fn test_summary_metrics() {
        let day = NaiveDate::from_ymd_opt(2024, 6, 15).unwrap();
        let records = vec![
            rec(1, "Turdus_merula", 0.5, "2024-06-15T08:00:00"),
            rec(2, "Ara_macao", 1.0, "2024-06-14T08:00:00"),
            rec(3, "Ara_macao", 0.75, "2024-06-15T09:00:00"),
            rec(4, "Turdus_merula", 0.25, "2024-06-13T09:00:00"),
        ];
        let s = HistorySummary::compute(&records, day);
        assert_eq!(s.total, 4);
        assert!((s.average_confidence_pct - 62.5).abs() < 1e-9);
        assert_eq!(s.today, 2);
        assert_eq!(s.distinct_species, 2);
        // tie: Turdus_merula seen first
        assert_eq!(s.most_frequent, Some(("Turdus_merula".to_string(), 2)));
    }

    #[test]
    fn test_empty_history() {
        let s = HistorySummary::compute(&[], NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        assert_eq!(s.total, 0);
        assert_eq!(s.average_confidence_pct, 0.0);
        assert!(s.most_frequent.is_none());
    }

    #[test]
    fn test_user_summary() {
        let user = |id, active| AdminUser {
            id_usuario: id,
            nombre_completo: None,
            email: String::new(),
            rol: None,
            usuario_activo: active,
        };
        let s = UserSummary::compute(&[user(1, true), user(2, false), user(3, true), user(4, true)]);
        assert_eq!((s.total, s.active, s.inactive), (4, 3, 1));
        assert!((s.active_pct - 75.0).abs() < 1e-9);
        assert_eq!(UserSummary::compute(&[]).active_pct, 0.0);
    }
}
