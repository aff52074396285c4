//! In-process stand-in for the identification backend.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::body::Bytes;
use axum::extract::{Form, Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{delete, get, post, put};
use axum::Router;
use serde_json::{json, Value};
use tokio::net::TcpListener;

pub const PASSWORD: &str = "secret";

/// What the backend saw.
#[derive(Debug, Default)]
pub struct Seen {
    pub inference_calls: usize,
    pub inference_body: String,
    pub inference_content_type: String,
    pub user_edits: Vec<(i64, Value)>,
    pub profile_updates: Vec<Value>,
    pub error_limit: Option<String>,
    pub deleted: Vec<i64>,
    pub login_attempts: usize,
}

pub type Shared = Arc<Mutex<Seen>>;

/// Start the mock on an ephemeral port; returns the API root URL.
pub async fn spawn_backend() -> (String, Shared) {
    let seen: Shared = Arc::new(Mutex::new(Seen::default()));

    let api = Router::new()
        .route("/usuarios/login", post(login))
        .route("/usuarios/me", get(me))
        .route("/usuarios/actualiza_usuario", put(update_profile))
        .route("/inferencia/historial", get(history))
        .route("/inferencia/listar_aves", get(catalog))
        .route("/inferencia/procesar_inferencia", post(inference))
        .route("/inferencia/eliminar/{id}", delete(delete_record))
        .route("/admin/logs/usuarios/{id}/editar", put(edit_user))
        .route("/admin/logs/errores", get(errors))
        .with_state(seen.clone());
    let app = Router::new().nest("/v1", api);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{addr}/v1"), seen)
}

fn bearer(headers: &HeaderMap) -> Option<String> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::to_string)
}

fn unauthorized() -> Response {
    (StatusCode::UNAUTHORIZED, Json(json!({"detail": "Token inválido"}))).into_response()
}

/// Tokens are `tok-<email>`; `expired` is always rejected.
fn authorized(headers: &HeaderMap) -> Option<String> {
    bearer(headers)
        .filter(|t| t != "expired")
        .and_then(|t| t.strip_prefix("tok-").map(str::to_string))
}

// ── route handlers ───────────────────────────────────────────────────────

async fn login(State(seen): State<Shared>, Form(form): Form<HashMap<String, String>>) -> Response {
    seen.lock().unwrap().login_attempts += 1;
    let user = form.get("username").cloned().unwrap_or_default();
    if form.get("password").map(String::as_str) == Some(PASSWORD) {
        Json(json!({"access_token": format!("tok-{user}"), "token_type": "bearer"})).into_response()
    } else {
        unauthorized()
    }
}

async fn me(headers: HeaderMap) -> Response {
    let Some(email) = authorized(&headers) else {
        return unauthorized();
    };
    match email.as_str() {
        "admin@birdia.ec" => Json(json!({
            "id_usuario": 1, "email": email, "nombre_completo": "Admin Root",
            "role_id": 0, "usuario_activo": true
        }))
        .into_response(),
        "broken@birdia.ec" => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
        _ => Json(json!({
            "id_usuario": 2, "email": email, "nombre_completo": "Ana Torres",
            "role_id": "1", "usuario_activo": true
        }))
        .into_response(),
    }
}

async fn update_profile(State(seen): State<Shared>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    if authorized(&headers).is_none() {
        return unauthorized();
    }
    seen.lock().unwrap().profile_updates.push(body);
    Json(json!({"ok": true})).into_response()
}

async fn history(headers: HeaderMap) -> Response {
    if authorized(&headers).is_none() {
        return unauthorized();
    }
    Json(json!({"historial": [
        {"log_id": 1, "prediccion": "Ara_macao", "confianza": 0.91, "fecha": "2024-06-15T10:00:00",
         "latitud": -2.19, "longitud": -79.88},
        {"log_id": 2, "prediccion": "Desconocido", "confianza": 0.10, "fecha": "2024-06-15T11:00:00"},
        {"log_id": 3, "prediccion": "Turdus_sp", "confianza": 0.55, "fecha": "2024-06-16T09:30:00"}
    ]}))
    .into_response()
}

async fn catalog(headers: HeaderMap) -> Response {
    if authorized(&headers).is_none() {
        return unauthorized();
    }
    Json(json!([
        {"id_ave": 1, "nombre": "Guacamayo Rojo", "nombre_cientifico": "Ara_macao",
         "imagen_url": "http://img.local/ara.jpg"}
    ]))
    .into_response()
}

async fn inference(State(seen): State<Shared>, headers: HeaderMap, body: Bytes) -> Response {
    if authorized(&headers).is_none() {
        return unauthorized();
    }
    {
        let mut s = seen.lock().unwrap();
        s.inference_calls += 1;
        s.inference_body = String::from_utf8_lossy(&body).into_owned();
        s.inference_content_type = headers
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
    }
    Json(json!({
        "prediccion_principal": {"especie": "Ara_macao", "probabilidad": 0.87,
                                 "url_imagen": "http://img.local/ara.jpg"},
        "top_5_predicciones": [
            {"nombre_cientifico": "Ara_macao", "probabilidad": 0.87},
            {"nombre_cientifico": "Ara_ararauna", "probabilidad": 0.08}
        ]
    }))
    .into_response()
}

async fn delete_record(State(seen): State<Shared>, headers: HeaderMap, Path(id): Path<i64>) -> Response {
    if authorized(&headers).is_none() {
        return unauthorized();
    }
    seen.lock().unwrap().deleted.push(id);
    StatusCode::NO_CONTENT.into_response()
}

async fn edit_user(
    State(seen): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(body): Json<Value>,
) -> Response {
    if authorized(&headers).is_none() {
        return unauthorized();
    }
    seen.lock().unwrap().user_edits.push((id, body));
    Json(json!({"mensaje": "ok"})).into_response()
}

async fn errors(
    State(seen): State<Shared>,
    headers: HeaderMap,
    Query(q): Query<HashMap<String, String>>,
) -> Response {
    if authorized(&headers).is_none() {
        return unauthorized();
    }
    seen.lock().unwrap().error_limit = q.get("limite").cloned();
    Json(json!([
        {"id_log": 9, "mensaje_error": "timeout", "fuente": "inferencia", "fecha": "2024-06-15T10:00:00"}
    ]))
    .into_response()
}
