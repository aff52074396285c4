mod common;

use std::sync::Arc;
use std::time::Duration;

use birdia_capture::{AudioFormat, AudioInput, CaptureConstraints, CaptureError, Recorder};
use birdia_client::location::{FixedLocation, NoLocation};
use birdia_client::{AnalysisOutcome, Analyzer, ApiClient, ApiError, GeoPoint, PasswordChange};
use birdia_common::model::UserEdit;
use birdia_common::session::{MemorySessionStore, Role, Session, SessionStore};

use common::{spawn_backend, PASSWORD};

fn client(base: &str, store: Arc<MemorySessionStore>) -> ApiClient {
    ApiClient::new(base, Duration::from_secs(5), store).unwrap()
}

fn signed_in(email: &str, role: Role) -> Arc<MemorySessionStore> {
    Arc::new(MemorySessionStore::with_session(Session::new(
        format!("tok-{email}"),
        role,
        "Someone",
    )))
}

/// Microphone that is never available; these tests upload files.
struct NoMicrophone;

impl AudioInput for NoMicrophone {
    fn supports(&self, _: &AudioFormat) -> bool {
        false
    }
    fn open(&mut self, _: &AudioFormat, _: &CaptureConstraints) -> Result<(), CaptureError> {
        Err(CaptureError::DeviceUnavailable("none".into()))
    }
    fn finish(&mut self) -> Result<Vec<u8>, CaptureError> {
        Err(CaptureError::NotRecording)
    }
    fn release(&mut self) {}
    fn is_open(&self) -> bool {
        false
    }
}

fn temp_audio(name: &str) -> std::path::PathBuf {
    let dir = std::env::temp_dir().join(format!("birdia-client-{}-{name}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("call.wav");
    std::fs::write(&path, b"RIFF fake audio").unwrap();
    path
}

// ── session ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn login_stores_token_role_and_name() {
    let (base, _) = spawn_backend().await;
    let store = Arc::new(MemorySessionStore::new());
    let api = client(&base, store.clone());

    let session = api.login("admin@birdia.ec", PASSWORD).await.unwrap();
    assert_eq!(session.role, Role::Admin);
    assert_eq!(session.user_name, "Admin Root");

    let stored = store.load().unwrap().unwrap();
    assert_eq!(stored.token, "tok-admin@birdia.ec");
    assert!(stored.capabilities().can_administer());
}

#[tokio::test]
async fn login_falls_back_to_researcher_when_profile_fails() {
    let (base, _) = spawn_backend().await;
    let store = Arc::new(MemorySessionStore::new());
    let api = client(&base, store.clone());

    let session = api.login("broken@birdia.ec", PASSWORD).await.unwrap();
    assert_eq!(session.role, Role::Researcher);
    assert_eq!(session.user_name, "broken@birdia.ec");
    assert!(store.load().unwrap().is_some());
}

#[tokio::test]
async fn bad_credentials_leave_session_untouched() {
    let (base, _) = spawn_backend().await;
    let store = signed_in("ana@birdia.ec", Role::Researcher);
    let before = store.load().unwrap();
    let api = client(&base, store.clone());

    let err = api.login("ana@birdia.ec", "wrong").await.unwrap_err();
    assert!(matches!(err, ApiError::InvalidCredentials));
    assert_eq!(store.load().unwrap(), before);
}

#[tokio::test]
async fn unauthorized_answer_clears_session() {
    let (base, _) = spawn_backend().await;
    let store = Arc::new(MemorySessionStore::with_session(Session::new(
        "expired",
        Role::Admin,
        "Old",
    )));
    let api = client(&base, store.clone());

    let err = api.history().await.unwrap_err();
    assert!(err.is_session_expired());
    assert!(store.load().unwrap().is_none());
}

// ── analysis ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn submit_without_audio_sends_nothing() {
    let (base, seen) = spawn_backend().await;
    let api = client(&base, signed_in("ana@birdia.ec", Role::Researcher));
    let mut analyzer = Analyzer::new(
        Recorder::new(Box::new(NoMicrophone)),
        Box::new(NoLocation),
        Duration::from_millis(100),
    );

    let err = analyzer.submit(&api).await.unwrap_err();
    assert!(matches!(err, ApiError::Capture(CaptureError::NothingCaptured)));
    assert_eq!(seen.lock().unwrap().inference_calls, 0);
}

#[tokio::test]
async fn submit_sends_audio_and_location() {
    let (base, seen) = spawn_backend().await;
    let api = client(&base, signed_in("ana@birdia.ec", Role::Researcher));
    let mut analyzer = Analyzer::new(
        Recorder::new(Box::new(NoMicrophone)),
        Box::new(FixedLocation(GeoPoint::new(-2.5, -79.75))),
        Duration::from_millis(500),
    );
    let path = temp_audio("loc");
    analyzer.recorder_mut().select_file(&path).unwrap();

    let outcome = analyzer.submit(&api).await.unwrap();
    match outcome {
        AnalysisOutcome::Identified(r) => {
            assert_eq!(r.prediccion_principal.especie, "Ara_macao");
            assert_eq!(r.top_5_predicciones.len(), 2);
        }
        other => panic!("expected identification, got {other:?}"),
    }

    let s = seen.lock().unwrap();
    assert_eq!(s.inference_calls, 1);
    assert!(s.inference_content_type.starts_with("multipart/form-data"));
    assert!(s.inference_body.contains("filename=\"call.wav\""));
    assert!(s.inference_body.contains("Lat: -2.5, Lon: -79.75"));
    assert!(s.inference_body.contains("name=\"latitud\"\r\n\r\n-2.5"));
    drop(s);

    assert_eq!(analyzer.recorder().phase(), birdia_capture::Phase::Done);
    std::fs::remove_dir_all(path.parent().unwrap()).ok();
}

#[tokio::test]
async fn submit_without_location_sends_zero_coordinates() {
    let (base, seen) = spawn_backend().await;
    let api = client(&base, signed_in("ana@birdia.ec", Role::Researcher));
    let mut analyzer = Analyzer::new(
        Recorder::new(Box::new(NoMicrophone)),
        Box::new(NoLocation),
        Duration::from_millis(100),
    );
    let path = temp_audio("noloc");
    analyzer.recorder_mut().select_file(&path).unwrap();
    analyzer.submit(&api).await.unwrap();

    let s = seen.lock().unwrap();
    assert!(s.inference_body.contains("name=\"latitud\"\r\n\r\n0\r\n"));
    assert!(s.inference_body.contains("name=\"longitud\"\r\n\r\n0\r\n"));
    assert!(s.inference_body.contains("Ubicación no disponible"));
    drop(s);
    std::fs::remove_dir_all(path.parent().unwrap()).ok();
}

// ── history & catalog ────────────────────────────────────────────────────

#[tokio::test]
async fn own_history_drops_unknown_and_joins_catalog() {
    let (base, _) = spawn_backend().await;
    let api = client(&base, signed_in("ana@birdia.ec", Role::Researcher));

    let (records, lookup) = api.own_history_with_catalog().await.unwrap();
    let ids: Vec<i64> = records.iter().map(|r| r.log_id).collect();
    assert_eq!(ids, vec![1, 3]);
    assert_eq!(lookup.display_name("Ara_macao"), "Guacamayo Rojo");
    assert_eq!(lookup.display_name("Turdus_sp"), "Turdus Sp");
}

#[tokio::test]
async fn delete_record_hits_endpoint() {
    let (base, seen) = spawn_backend().await;
    let api = client(&base, signed_in("ana@birdia.ec", Role::Researcher));
    api.delete_record(42).await.unwrap();
    assert_eq!(seen.lock().unwrap().deleted, vec![42]);
}

// ── administration ───────────────────────────────────────────────────────

#[tokio::test]
async fn user_edit_omits_blank_password() {
    let (base, seen) = spawn_backend().await;
    let api = client(&base, signed_in("admin@birdia.ec", Role::Admin));

    api.edit_user(7, &UserEdit::from_form("Ana", "ana@birdia.ec", false, "   "))
        .await
        .unwrap();
    api.edit_user(7, &UserEdit::from_form("Ana", "ana@birdia.ec", true, "nueva"))
        .await
        .unwrap();

    let s = seen.lock().unwrap();
    let (id, first) = &s.user_edits[0];
    assert_eq!(*id, 7);
    assert!(first.get("password").is_none());
    assert_eq!(first["usuario_activo"], false);
    assert_eq!(s.user_edits[1].1["password"], "nueva");
}

#[tokio::test]
async fn error_log_passes_limit() {
    let (base, seen) = spawn_backend().await;
    let api = client(&base, signed_in("admin@birdia.ec", Role::Admin));
    let entries = api.error_log(50).await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(seen.lock().unwrap().error_limit.as_deref(), Some("50"));
}

// ── profile ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn password_change_checks_current_password() {
    let (base, seen) = spawn_backend().await;
    let store = signed_in("ana@birdia.ec", Role::Researcher);
    let api = client(&base, store.clone());

    let wrong = PasswordChange {
        current: "nope".into(),
        new: "abcd".into(),
        confirm: "abcd".into(),
    };
    assert!(matches!(api.change_password(&wrong).await, Err(ApiError::Validation(_))));
    assert!(store.load().unwrap().is_some(), "a failed password check must not log out");
    assert!(seen.lock().unwrap().profile_updates.is_empty());

    let right = PasswordChange {
        current: PASSWORD.into(),
        new: "abcd".into(),
        confirm: "abcd".into(),
    };
    api.change_password(&right).await.unwrap();
    assert!(store.load().unwrap().is_none());
    assert_eq!(seen.lock().unwrap().profile_updates[0]["password"], "abcd");
}

#[tokio::test]
async fn mismatched_confirmation_is_rejected_locally() {
    let (base, seen) = spawn_backend().await;
    let api = client(&base, signed_in("ana@birdia.ec", Role::Researcher));
    let change = PasswordChange {
        current: PASSWORD.into(),
        new: "abcd".into(),
        confirm: "abce".into(),
    };
    assert!(matches!(api.change_password(&change).await, Err(ApiError::Validation(_))));
    assert_eq!(seen.lock().unwrap().login_attempts, 0);
}

#[tokio::test]
async fn rename_updates_stored_name() {
    let (base, seen) = spawn_backend().await;
    let store = signed_in("ana@birdia.ec", Role::Researcher);
    let api = client(&base, store.clone());

    let me = api.rename_profile("  Ana María ").await.unwrap();
    assert_eq!(me.nombre_completo, "Ana María");
    assert_eq!(store.load().unwrap().unwrap().user_name, "Ana María");
    let s = seen.lock().unwrap();
    assert!(s.profile_updates[0].get("password").is_none());
}
