//! Capture, locate, submit, classify.

use std::time::Duration;

use tracing::info;

use birdia_capture::Recorder;
use birdia_common::model::{InferenceResponse, UNKNOWN_SPECIES};

use crate::error::ApiError;
use crate::http::ApiClient;
use crate::location::{locate_best_effort, LocationProvider};

const NO_DETECTION_MARKERS: [&str; 2] = ["no se detectó", "baja confianza"];

#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisOutcome {
    Identified(InferenceResponse),
    /// Expected "nothing found" answer, shown in its own dialog.
    NoBirdDetected(InferenceResponse),
}

impl AnalysisOutcome {
    pub fn response(&self) -> &InferenceResponse {
        match self {
            AnalysisOutcome::Identified(r) | AnalysisOutcome::NoBirdDetected(r) => r,
        }
    }
}

pub fn classify(response: InferenceResponse) -> AnalysisOutcome {
    let main = &response.prediccion_principal;
    let marked = |s: &str| {
        let s = s.to_lowercase();
        NO_DETECTION_MARKERS.iter().any(|m| s.contains(m))
    };
    let no_bird = main.especie == UNKNOWN_SPECIES
        || marked(&main.especie)
        || main.nombre.as_deref().is_some_and(marked)
        || response
            .top_5_predicciones
            .first()
            .and_then(|p| p.nombre.as_deref())
            .is_some_and(marked);

    if no_bird {
        AnalysisOutcome::NoBirdDetected(response)
    } else {
        AnalysisOutcome::Identified(response)
    }
}

pub struct Analyzer {
    recorder: Recorder,
    location: Box<dyn LocationProvider>,
    location_timeout: Duration,
}

impl Analyzer {
    pub fn new(recorder: Recorder, location: Box<dyn LocationProvider>, location_timeout: Duration) -> Self {
        Self {
            recorder,
            location,
            location_timeout,
        }
    }

    pub fn recorder(&self) -> &Recorder {
        &self.recorder
    }

    pub fn recorder_mut(&mut self) -> &mut Recorder {
        &mut self.recorder
    }

    /// Upload the held capture.  Without one nothing is sent.  A failed
    /// upload keeps the capture so it can be resubmitted by hand.
    pub async fn submit(&mut self, client: &ApiClient) -> Result<AnalysisOutcome, ApiError> {
        let audio = self.recorder.begin_submit()?;
        let location = locate_best_effort(self.location.as_ref(), self.location_timeout).await;

        let result = client.submit_inference(&audio, location).await;
        self.recorder.finish_submit(result.is_ok());

        let outcome = classify(result?);
        match &outcome {
            AnalysisOutcome::Identified(r) => info!(
                "Identified {} ({:.1}%)",
                r.prediccion_principal.especie,
                r.prediccion_principal.probabilidad * 100.0
            ),
            AnalysisOutcome::NoBirdDetected(_) => info!("No bird detected"),
        }
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use birdia_common::model::{MainPrediction, Prediction};

    fn response(especie: &str, nombre: Option<&str>) -> InferenceResponse {
        InferenceResponse {
            prediccion_principal: MainPrediction {
                especie: especie.to_string(),
                probabilidad: 0.4,
                url_imagen: None,
                nombre: nombre.map(str::to_string),
            },
            top_5_predicciones: vec![],
        }
    }

    #[test]
    fn test_classify_reads_first_candidate_note() {
        let mut r = response("Ara_macao", None);
        r.top_5_predicciones = vec![
            Prediction {
                nombre: Some("No se detectó ave".into()),
                nombre_cientifico: "Ara_macao".into(),
                probabilidad: 0.2,
            },
            Prediction {
                nombre: Some("Guacamayo".into()),
                nombre_cientifico: "Ara_ararauna".into(),
                probabilidad: 0.1,
            },
        ];
        assert!(matches!(classify(r.clone()), AnalysisOutcome::NoBirdDetected(_)));

        r.top_5_predicciones.swap(0, 1);
        assert!(matches!(classify(r), AnalysisOutcome::Identified(_)));
    }

    #[test]
    fn test_classify() {
        assert!(matches!(classify(response("Ara_macao", None)), AnalysisOutcome::Identified(_)));
        assert!(matches!(
            classify(response("Desconocido", None)),
            AnalysisOutcome::NoBirdDetected(_)
        ));
        assert!(matches!(
            classify(response("x", Some("No se detectó ningún ave"))),
            AnalysisOutcome::NoBirdDetected(_)
        ));
        assert!(matches!(
            classify(response("Resultado de BAJA CONFIANZA", None)),
            AnalysisOutcome::NoBirdDetected(_)
        ));
    }
}
