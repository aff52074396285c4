//! Wire types for the identification backend.
//!
//! Field names follow the backend's JSON.  Several screens of the service
//! see slightly different shapes for the same entity; the aliases below
//! accept all of them.

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, TimeZone};
use serde::{Deserialize, Deserializer, Serialize};

/// Species label the backend uses when nothing was recognised.
pub const UNKNOWN_SPECIES: &str = "Desconocido";

// ─── Accounts ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub nombre_completo: String,
    pub role: String,
}

impl RegisterRequest {
    /// Self-service sign-up always creates a regular account.
    pub fn researcher(email: &str, password: &str, full_name: &str) -> Self {
        Self {
            email: email.to_string(),
            password: password.to_string(),
            nombre_completo: full_name.to_string(),
            role: "usuario".to_string(),
        }
    }
}

/// `GET /usuarios/me`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(default)]
    pub id_usuario: Option<i64>,
    pub email: String,
    #[serde(default)]
    pub nombre_completo: String,
    #[serde(deserialize_with = "flag_from_any")]
    pub role_id: String,
    #[serde(default = "default_true")]
    pub usuario_activo: bool,
}

/// `PUT /usuarios/actualiza_usuario`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileUpdate {
    pub nombre_completo: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    pub usuario_activo: bool,
}

// ─── Inference ───────────────────────────────────────────────────────────────

/// One ranked candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    #[serde(default)]
    pub nombre: Option<String>,
    #[serde(default, alias = "especie")]
    pub nombre_cientifico: String,
    #[serde(default)]
    pub probabilidad: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MainPrediction {
    pub especie: String,
    #[serde(default)]
    pub probabilidad: f64,
    #[serde(default)]
    pub url_imagen: Option<String>,
    #[serde(default)]
    pub nombre: Option<String>,
}

/// `POST /inferencia/procesar_inferencia`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InferenceResponse {
    pub prediccion_principal: MainPrediction,
    #[serde(default)]
    pub top_5_predicciones: Vec<Prediction>,
}

// ─── History ─────────────────────────────────────────────────────────────────

/// A stored past inference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub log_id: i64,
    #[serde(default)]
    pub prediccion: String,
    #[serde(default)]
    pub confianza: f64,
    #[serde(default)]
    pub fecha: String,
    #[serde(default)]
    pub ubicacion: Option<String>,
    #[serde(default)]
    pub latitud: Option<f64>,
    #[serde(default)]
    pub longitud: Option<f64>,
    #[serde(default)]
    pub usuario: Option<String>,
    #[serde(default)]
    pub nombre_completo: Option<String>,
    #[serde(default)]
    pub id_usuario: Option<i64>,
    #[serde(default)]
    pub top_5: Vec<Prediction>,
}

impl HistoryRecord {
    pub fn timestamp(&self) -> Option<DateTime<Local>> {
        parse_timestamp(&self.fecha)
    }

    pub fn is_unknown(&self) -> bool {
        self.prediccion == UNKNOWN_SPECIES
    }

    /// Who made the record, for the global views.
    pub fn user_label(&self) -> String {
        if let Some(u) = self.usuario.as_deref().filter(|u| !u.is_empty()) {
            return u.to_string();
        }
        if let Some(n) = self.nombre_completo.as_deref().filter(|n| !n.is_empty()) {
            return n.to_string();
        }
        match self.id_usuario {
            Some(id) => format!("ID: {id}"),
            None => "Anónimo".to_string(),
        }
    }

    /// Both coordinates present and non-zero.
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        match (self.latitud, self.longitud) {
            (Some(lat), Some(lon)) if lat != 0.0 && lon != 0.0 => Some((lat, lon)),
            _ => None,
        }
    }
}

/// History comes back either as a bare array or wrapped in `historial`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum HistoryPayload {
    List(Vec<HistoryRecord>),
    Wrapped {
        #[serde(default)]
        historial: Vec<HistoryRecord>,
    },
}

impl HistoryPayload {
    pub fn into_records(self) -> Vec<HistoryRecord> {
        match self {
            HistoryPayload::List(v) => v,
            HistoryPayload::Wrapped { historial } => historial,
        }
    }
}

// ─── Catalog ─────────────────────────────────────────────────────────────────

/// `GET /inferencia/listar_aves`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    #[serde(default)]
    pub id_ave: Option<i64>,
    #[serde(default, alias = "nombre_comun")]
    pub nombre: Option<String>,
    #[serde(default)]
    pub nombre_cientifico: String,
    #[serde(default, alias = "url_imagen")]
    pub imagen_url: Option<String>,
    #[serde(default)]
    pub audio_url: Option<String>,
}

// ─── Administration ──────────────────────────────────────────────────────────

/// Row of `GET /admin/logs/listar_usuarios`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdminUser {
    pub id_usuario: i64,
    #[serde(default, alias = "Nombre completo")]
    pub nombre_completo: Option<String>,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub rol: Option<String>,
    #[serde(default)]
    pub usuario_activo: bool,
}

impl AdminUser {
    pub fn display_name(&self) -> &str {
        self.nombre_completo.as_deref().unwrap_or("")
    }
}

/// Body of `PUT /admin/logs/usuarios/{id}/editar`.
///
/// `password` is left out of the JSON entirely when not being changed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserEdit {
    pub nombre_completo: String,
    pub email: String,
    pub usuario_activo: bool,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub password: Option<String>,
}

impl UserEdit {
    /// Build from form input; a blank (or whitespace-only) password means
    /// "keep the current one".
    pub fn from_form(full_name: &str, email: &str, active: bool, password: &str) -> Self {
        let password = password.trim();
        Self {
            nombre_completo: full_name.to_string(),
            email: email.to_string(),
            usuario_activo: active,
            password: (!password.is_empty()).then(|| password.to_string()),
        }
    }

    /// Start from an existing row so untouched fields keep their values.
    pub fn prefilled(user: &AdminUser) -> Self {
        Self {
            nombre_completo: user.display_name().to_string(),
            email: user.email.clone(),
            usuario_activo: user.usuario_activo,
            password: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuditUser {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub rol: String,
}

/// Row of `GET /admin/logs/Listar_sesiones`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionAudit {
    #[serde(default)]
    pub usuario: AuditUser,
    #[serde(default)]
    pub fecha_ingreso: String,
    #[serde(default)]
    pub ip_origen: String,
    #[serde(default)]
    pub estado: String,
    #[serde(default)]
    pub observacion: String,
}

/// Row of `GET /admin/logs/errores`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorLogEntry {
    pub id_log: i64,
    #[serde(default)]
    pub mensaje_error: String,
    #[serde(default)]
    pub fuente: String,
    #[serde(default)]
    pub fecha: String,
    #[serde(default)]
    pub nombre_usuario: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DashboardMetrics {
    #[serde(default)]
    pub logins_hoy: u64,
    #[serde(default)]
    pub usuarios_totales: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopSpecies {
    pub especie: String,
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub imagen: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DashboardTops {
    #[serde(default)]
    pub dia: Option<TopSpecies>,
    #[serde(default)]
    pub semana: Option<TopSpecies>,
    #[serde(default)]
    pub general: Option<TopSpecies>,
}

/// `GET /admin/logs/dashboard_stats`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DashboardStats {
    #[serde(default)]
    pub metricas: DashboardMetrics,
    #[serde(default)]
    pub tops: DashboardTops,
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

/// Parse a backend timestamp.  Offset-less values are local wall-clock time.
pub fn parse_timestamp(s: &str) -> Option<DateTime<Local>> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Local));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Local.from_local_datetime(&naive).earliest();
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .and_then(|naive| Local.from_local_datetime(&naive).earliest())
}

fn default_true() -> bool {
    true
}

/// Role flags arrive as either `0` or `"0"`.
fn flag_from_any<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    let v = serde_json::Value::deserialize(d)?;
    Ok(match v {
        serde_json::Value::String(s) => s,
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    })
}
