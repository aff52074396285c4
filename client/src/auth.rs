//! Account endpoints: login, registration and profile changes.

use reqwest::{Method, StatusCode};
use tracing::{info, warn};

use birdia_common::model::{LoginResponse, ProfileUpdate, RegisterRequest, UserProfile};
use birdia_common::session::{Role, Session};

use crate::error::ApiError;
use crate::http::{decode, error_message, ApiClient};

pub const MIN_PASSWORD_LEN: usize = 4;

const LOGIN_PATH: &str = "usuarios/login";
const REGISTER_PATH: &str = "usuarios/registro";
const ME_PATH: &str = "usuarios/me";
const PROFILE_PATH: &str = "usuarios/actualiza_usuario";

/// Password change form.
#[derive(Debug, Clone)]
pub struct PasswordChange {
    pub current: String,
    pub new: String,
    pub confirm: String,
}

impl PasswordChange {
    /// Local checks, run before anything is sent.
    pub fn validate(&self) -> Result<(), ApiError> {
        if self.current.is_empty() {
            return Err(ApiError::validation("enter your current password"));
        }
        if self.new != self.confirm {
            return Err(ApiError::validation("the new passwords do not match"));
        }
        if self.new.chars().count() < MIN_PASSWORD_LEN {
            return Err(ApiError::validation(format!(
                "the new password must have at least {MIN_PASSWORD_LEN} characters"
            )));
        }
        Ok(())
    }
}

impl ApiClient {
    /// Exchange credentials for a token, then resolve role and display name
    /// through `/usuarios/me`.  Bad credentials never touch the stored
    /// session.
    pub async fn login(&self, email: &str, password: &str) -> Result<Session, ApiError> {
        let token = self.request_token(email, password).await?;

        let session = match self.fetch_profile_with(&token).await {
            Ok(me) => {
                let name = if me.nombre_completo.trim().is_empty() {
                    email.to_string()
                } else {
                    me.nombre_completo.clone()
                };
                Session::new(token, Role::from_flag(&me.role_id), name)
            }
            Err(e) => {
                warn!("Cannot load profile after login ({e}); continuing as researcher");
                Session::new(token, Role::Researcher, email)
            }
        };

        self.store().save(&session)?;
        info!(
            "Logged in as {} ({})",
            session.user_name,
            session.capabilities().role_label()
        );
        Ok(session)
    }

    async fn request_token(&self, email: &str, password: &str) -> Result<String, ApiError> {
        let resp = self
            .anonymous(Method::POST, LOGIN_PATH)
            .form(&[("username", email), ("password", password)])
            .send()
            .await?;

        let status = resp.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::BAD_REQUEST {
            return Err(ApiError::InvalidCredentials);
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ApiError::Status {
                status,
                message: error_message(status, &body),
            });
        }

        let login: LoginResponse = decode(LOGIN_PATH, resp).await?;
        if login.access_token.is_empty() {
            return Err(ApiError::Decode {
                path: LOGIN_PATH.to_string(),
                message: "empty access_token".to_string(),
            });
        }
        Ok(login.access_token)
    }

    /// `/usuarios/me` with an explicit token, outside the 401 rule.
    async fn fetch_profile_with(&self, token: &str) -> Result<UserProfile, ApiError> {
        let resp = self
            .anonymous(Method::GET, ME_PATH)
            .bearer_auth(token)
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ApiError::Status {
                status,
                message: error_message(status, &body),
            });
        }
        decode(ME_PATH, resp).await
    }

    /// Self-service sign-up; always creates a researcher account.
    pub async fn register(&self, email: &str, password: &str, full_name: &str) -> Result<(), ApiError> {
        if email.trim().is_empty() || full_name.trim().is_empty() {
            return Err(ApiError::validation("email and full name are required"));
        }
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(ApiError::validation(format!(
                "the password must have at least {MIN_PASSWORD_LEN} characters"
            )));
        }

        let body = RegisterRequest::researcher(email.trim(), password, full_name.trim());
        let resp = self
            .anonymous(Method::POST, REGISTER_PATH)
            .json(&body)
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(ApiError::Status {
                status,
                message: error_message(status, &text),
            });
        }
        info!("Registered {}", body.email);
        Ok(())
    }

    pub async fn me(&self) -> Result<UserProfile, ApiError> {
        self.get_json(ME_PATH).await
    }

    /// Change the display name and mirror it into the stored session.
    pub async fn rename_profile(&self, new_name: &str) -> Result<UserProfile, ApiError> {
        let new_name = new_name.trim();
        if new_name.is_empty() {
            return Err(ApiError::validation("the name cannot be empty"));
        }
        let mut me = self.me().await?;
        let update = ProfileUpdate {
            nombre_completo: new_name.to_string(),
            password: None,
            usuario_activo: me.usuario_activo,
        };
        self.put_json(PROFILE_PATH, &update).await?;

        if let Some(mut session) = self.store().load()? {
            session.user_name = new_name.to_string();
            self.store().save(&session)?;
        }
        me.nombre_completo = new_name.to_string();
        Ok(me)
    }

    /// Verify the current password with a test login, set the new one and
    /// drop the session so the user signs in again.
    pub async fn change_password(&self, change: &PasswordChange) -> Result<(), ApiError> {
        change.validate()?;
        let me = self.me().await?;

        match self.request_token(&me.email, &change.current).await {
            Ok(_) => {}
            Err(ApiError::InvalidCredentials) => {
                return Err(ApiError::validation("the current password is incorrect"));
            }
            Err(e) => return Err(e),
        }

        let update = ProfileUpdate {
            nombre_completo: me.nombre_completo.clone(),
            password: Some(change.new.clone()),
            usuario_activo: me.usuario_activo,
        };
        self.put_json(PROFILE_PATH, &update).await?;
        self.store().clear()?;
        info!("Password changed for {}; session closed", me.email);
        Ok(())
    }

    pub fn logout(&self) -> Result<(), ApiError> {
        self.store().clear()?;
        info!("Logged out");
        Ok(())
    }
}
