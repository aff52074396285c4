//! Inference submission, history and the species catalog.

use reqwest::multipart::{Form, Part};
use reqwest::Method;
use tracing::{debug, info, warn};

use birdia_capture::CapturedAudio;
use birdia_common::catalog::CatalogLookup;
use birdia_common::model::{CatalogEntry, HistoryPayload, HistoryRecord, InferenceResponse};

use crate::error::ApiError;
use crate::http::{decode, ApiClient};
use crate::location::{GeoPoint, LOCATION_UNAVAILABLE};

const INFERENCE_PATH: &str = "inferencia/procesar_inferencia";
const HISTORY_PATH: &str = "inferencia/historial";
const CATALOG_PATH: &str = "inferencia/listar_aves";

/// Multipart body for an inference request.  Unknown coordinates go out as
/// `0`.
pub fn inference_form(audio: &CapturedAudio, location: Option<GeoPoint>) -> Result<Form, ApiError> {
    let file = Part::bytes(audio.bytes.clone())
        .file_name(audio.file_name.clone())
        .mime_str(&audio.mime)?;

    let (lat, lon, label) = match location {
        Some(p) => (p.latitude, p.longitude, p.label()),
        None => (0.0, 0.0, LOCATION_UNAVAILABLE.to_string()),
    };

    Ok(Form::new()
        .part("file", file)
        .text("latitud", lat.to_string())
        .text("longitud", lon.to_string())
        .text("localizacion", label))
}

impl ApiClient {
    pub async fn submit_inference(
        &self,
        audio: &CapturedAudio,
        location: Option<GeoPoint>,
    ) -> Result<InferenceResponse, ApiError> {
        let form = inference_form(audio, location)?;
        info!(
            "Submitting {} ({} bytes, {})",
            audio.file_name,
            audio.len(),
            location.map(|p| p.label()).unwrap_or_else(|| LOCATION_UNAVAILABLE.to_string())
        );
        let rb = self.request(Method::POST, INFERENCE_PATH)?.multipart(form);
        let resp = self.send(INFERENCE_PATH, rb).await?;
        decode(INFERENCE_PATH, resp).await
    }

    /// The signed-in user's records, as returned.
    pub async fn history(&self) -> Result<Vec<HistoryRecord>, ApiError> {
        let payload: HistoryPayload = self.get_json(HISTORY_PATH).await?;
        Ok(payload.into_records())
    }

    /// The user's records without the "nothing recognised" entries.
    pub async fn own_history(&self) -> Result<Vec<HistoryRecord>, ApiError> {
        let mut records = self.history().await?;
        records.retain(|r| !r.is_unknown());
        Ok(records)
    }

    pub async fn catalog(&self) -> Result<Vec<CatalogEntry>, ApiError> {
        let value: serde_json::Value = self.get_json(CATALOG_PATH).await?;
        if !value.is_array() {
            warn!("Catalog answer is not a list; treating it as empty");
            return Ok(Vec::new());
        }
        serde_json::from_value(value).map_err(|e| ApiError::Decode {
            path: CATALOG_PATH.to_string(),
            message: e.to_string(),
        })
    }

    pub async fn catalog_lookup(&self) -> Result<CatalogLookup, ApiError> {
        Ok(CatalogLookup::new(self.catalog().await?))
    }

    /// Own history (unknowns removed) and catalog, fetched concurrently.
    pub async fn own_history_with_catalog(&self) -> Result<(Vec<HistoryRecord>, CatalogLookup), ApiError> {
        let (records, lookup) = tokio::try_join!(self.own_history(), self.catalog_lookup())?;
        debug!("Loaded {} records, {} catalog entries", records.len(), lookup.len());
        Ok((records, lookup))
    }

    pub async fn delete_record(&self, log_id: i64) -> Result<(), ApiError> {
        self.delete(&format!("inferencia/eliminar/{log_id}")).await?;
        info!("Deleted record {log_id}");
        Ok(())
    }
}
