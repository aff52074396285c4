//! Administrator endpoints.

use tracing::{debug, info};

use birdia_common::catalog::CatalogLookup;
use birdia_common::model::{
    AdminUser, DashboardStats, ErrorLogEntry, HistoryPayload, HistoryRecord, SessionAudit, UserEdit,
};

use crate::error::ApiError;
use crate::http::ApiClient;

const USERS_PATH: &str = "admin/logs/listar_usuarios";
const SESSIONS_PATH: &str = "admin/logs/Listar_sesiones";
const ERRORS_PATH: &str = "admin/logs/errores";
const DASHBOARD_PATH: &str = "admin/logs/dashboard_stats";
const GLOBAL_HISTORY_PATH: &str = "admin/logs/historial";

impl ApiClient {
    pub async fn list_users(&self) -> Result<Vec<AdminUser>, ApiError> {
        self.get_json(USERS_PATH).await
    }

    /// Partial update; a blank password is never sent.
    pub async fn edit_user(&self, user_id: i64, edit: &UserEdit) -> Result<(), ApiError> {
        if edit.email.trim().is_empty() {
            return Err(ApiError::validation("email cannot be empty"));
        }
        self.put_json(&format!("admin/logs/usuarios/{user_id}/editar"), edit)
            .await?;
        info!(
            "Updated user {user_id}{}",
            if edit.password.is_some() { " (password changed)" } else { "" }
        );
        Ok(())
    }

    pub async fn session_log(&self) -> Result<Vec<SessionAudit>, ApiError> {
        self.get_json(SESSIONS_PATH).await
    }

    pub async fn error_log(&self, limit: u32) -> Result<Vec<ErrorLogEntry>, ApiError> {
        self.get_json_query(ERRORS_PATH, &[("limite", limit)]).await
    }

    pub async fn dashboard_stats(&self) -> Result<DashboardStats, ApiError> {
        self.get_json(DASHBOARD_PATH).await
    }

    pub async fn global_history(&self) -> Result<Vec<HistoryRecord>, ApiError> {
        let payload: HistoryPayload = self.get_json(GLOBAL_HISTORY_PATH).await?;
        Ok(payload.into_records())
    }

    pub async fn global_history_with_catalog(&self) -> Result<(Vec<HistoryRecord>, CatalogLookup), ApiError> {
        let (records, lookup) = tokio::try_join!(self.global_history(), self.catalog_lookup())?;
        debug!("Loaded {} global records", records.len());
        Ok((records, lookup))
    }

    pub async fn dashboard_with_catalog(&self) -> Result<(DashboardStats, CatalogLookup), ApiError> {
        tokio::try_join!(self.dashboard_stats(), self.catalog_lookup())
    }
}
