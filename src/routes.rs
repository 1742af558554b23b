use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use base64::Engine;
use bytes::Bytes;
use chrono::Utc;
use parking_lot::RwLock;
use serde_json::json;
use std::{collections::HashMap, sync::Arc};
use uuid::Uuid;

use crate::{
    error::{CapabilityError, PipelineError},
    models::{
        BriefRequest, CustomizationDescriptor, DesignArtifact, DesignSession, Finger, GenerateDesignRequest,
        GenerateDesignResponse, GenerateVariationsRequest, GenerateVariationsResponse, MeasureHandRequest,
        MeasurementOutcome, NailMeasurement, PricingRequest, PricingResponse, RecommendationReport,
        RecommendationRequest,
    },
    pipeline::DesignPipeline,
    prompt::DesignBrief,
};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<RwLock<HashMap<Uuid, DesignSession>>>,
    pub pipeline: Arc<DesignPipeline>,
}

impl AppState {
    pub fn new(pipeline: DesignPipeline) -> Self {
        Self { store: Arc::default(), pipeline: Arc::new(pipeline) }
    }

    fn record(&self, session_id: Option<Uuid>, artifacts: &[DesignArtifact]) -> Uuid {
        let id = session_id.unwrap_or_else(Uuid::new_v4);
        let mut guard = self.store.write();
        let session = guard.entry(id).or_insert_with(|| DesignSession::new(id));
        session.artifacts.extend_from_slice(artifacts);
        session.updated_at = Utc::now();
        id
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/measurements/validate", post(validate_measurement))
        .route("/api/measurements", post(measure_hand))
        .route("/api/briefs", post(synthesize_brief))
        .route("/api/designs", post(generate_design))
        .route("/api/designs/variations", post(generate_variations))
        .route("/api/recommendations", post(analyze_recommendations))
        .route("/api/pricing", post(calculate_price))
        .route("/api/sessions/:id", get(get_session))
        .with_state(state)
}

impl IntoResponse for PipelineError {
    fn into_response(self) -> Response {
        let status = match &self {
            PipelineError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            PipelineError::Capability(CapabilityError::RateLimited { .. }) => StatusCode::TOO_MANY_REQUESTS,
            PipelineError::Capability(CapabilityError::Configuration { .. }) => StatusCode::SERVICE_UNAVAILABLE,
            PipelineError::Capability(_)
            | PipelineError::GenerationFailed(_)
            | PipelineError::MalformedResponse { .. } => StatusCode::BAD_GATEWAY,
        };
        tracing::error!("❌ Request failed ({}): {}", status, self);
        let mut body = json!({ "error": self.code(), "message": self.to_string() });
        if let Some(upstream) = self.capability_error() {
            body["capability"] = json!(upstream.capability());
            body["detail"] = json!(upstream.message());
        }
        (status, Json(body)).into_response()
    }
}

fn brief_from(state: &AppState, body: &BriefRequest) -> DesignBrief {
    state
        .pipeline
        .synthesize_prompt(&body.measurements, &body.preferences, body.custom_request.as_deref())
}

pub async fn validate_measurement(
    State(state): State<AppState>,
    Json(body): Json<NailMeasurement>,
) -> Json<MeasurementOutcome> {
    Json(state.pipeline.validate_measurement(body))
}

pub async fn measure_hand(
    State(state): State<AppState>,
    Json(body): Json<MeasureHandRequest>,
) -> Result<Json<Vec<MeasurementOutcome>>, PipelineError> {
    if body.photos.is_empty() {
        return Err(PipelineError::InvalidInput("at least one photo is required".into()));
    }
    let photos = body
        .photos
        .into_iter()
        .map(|photo| decode_photo(&photo.finger, &photo.image_base64).map(|bytes| (photo.finger, bytes)))
        .collect::<Result<Vec<(Finger, Bytes)>, PipelineError>>()?;

    tracing::info!("📷 Measuring {} nail photos", photos.len());
    Ok(Json(state.pipeline.measure_hand(&photos).await?))
}

fn decode_photo(finger: &Finger, encoded: &str) -> Result<Bytes, PipelineError> {
    let payload = match encoded.split_once(";base64,") {
        Some((_, data)) => data,
        None => encoded,
    };
    base64::engine::general_purpose::STANDARD
        .decode(payload.trim())
        .map(Bytes::from)
        .map_err(|e| PipelineError::InvalidInput(format!("photo for {} is not valid base64: {}", finger, e)))
}

pub async fn synthesize_brief(
    State(state): State<AppState>,
    Json(body): Json<BriefRequest>,
) -> Json<DesignBrief> {
    Json(brief_from(&state, &body))
}

pub async fn generate_design(
    State(state): State<AppState>,
    Json(body): Json<GenerateDesignRequest>,
) -> Result<Json<GenerateDesignResponse>, PipelineError> {
    let brief = brief_from(&state, &body.brief);
    tracing::info!("🚀 Generating design with brief sections {:?}", brief.kinds());

    let artifact = state.pipeline.generate_design(&brief).await?;
    let session_id = state.record(body.session_id, std::slice::from_ref(&artifact));
    Ok(Json(GenerateDesignResponse { session_id, artifact }))
}

pub async fn generate_variations(
    State(state): State<AppState>,
    Json(body): Json<GenerateVariationsRequest>,
) -> Json<GenerateVariationsResponse> {
    let brief = brief_from(&state, &body.brief);
    let artifacts = state.pipeline.generate_variations(&brief, body.count).await;
    let session_id = state.record(body.session_id, &artifacts);
    Json(GenerateVariationsResponse { session_id, requested: body.count, artifacts })
}

pub async fn analyze_recommendations(
    State(state): State<AppState>,
    Json(body): Json<RecommendationRequest>,
) -> Json<RecommendationReport> {
    Json(state.pipeline.analyze_recommendations(&body.measurements, &body.preferences).await)
}

pub async fn calculate_price(
    State(state): State<AppState>,
    Json(body): Json<PricingRequest>,
) -> Result<Json<PricingResponse>, PipelineError> {
    let descriptor = match (body.descriptor, body.preferences) {
        (Some(descriptor), _) => descriptor,
        (None, Some(preferences)) => {
            CustomizationDescriptor::from_preferences(&preferences, body.personalized_elements)
        }
        (None, None) => {
            return Err(PipelineError::InvalidInput("either descriptor or preferences is required".into()))
        }
    };
    let price = state.pipeline.calculate_price(&descriptor);
    Ok(Json(PricingResponse { descriptor, price }))
}

pub async fn get_session(Path(id): Path<Uuid>, State(state): State<AppState>) -> Response {
    if let Some(s) = state.store.read().get(&id).cloned() { Json(s).into_response() } else { StatusCode::NOT_FOUND.into_response() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capabilities::fakes::{FakeReasoning, FakeSynthesis, FakeVision};
    use crate::config::PipelineSettings;
    use crate::error::Capability;
    use crate::pipeline::Capabilities;
    use axum::body::Body;
    use axum::http::Request;
    use pretty_assertions::assert_eq;
    use serde_json::Value;
    use tower::ServiceExt;

    fn state_with(synthesis: FakeSynthesis, vision: FakeVision) -> AppState {
        AppState::new(DesignPipeline::new(
            PipelineSettings::default(),
            Capabilities {
                vision: Arc::new(vision),
                synthesis: Arc::new(synthesis),
                reasoning: Arc::new(FakeReasoning::failing()),
            },
        ))
    }

    fn state() -> AppState {
        state_with(FakeSynthesis::default(), FakeVision::new(|_| {
            Ok(r#"{"nail_width":14.2,"nail_length":18.5,"shape_category":"oval","confidence":0.92}"#.into())
        }))
    }

    async fn post_json(state: &AppState, uri: &str, body: Value) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        send(state, request).await
    }

    async fn send(state: &AppState, request: Request<Body>) -> (StatusCode, Value) {
        let response = router(state.clone()).oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
        (status, value)
    }

    #[tokio::test]
    async fn validate_reports_reason_codes() {
        let s = state();
        let (status, body) = post_json(&s, "/api/measurements/validate", json!({
            "finger_type": "left_thumb", "nail_width": 14.2, "nail_length": 60.0,
            "nail_area": 210.0, "shape_category": "oval", "confidence": 0.92
        }))
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["verdict"], json!({"accepted": false, "reason": "out-of-range-length"}));
        assert_eq!(body["usable"], json!(false));
    }

    #[tokio::test]
    async fn measure_decodes_photos_and_rejects_bad_base64() {
        let s = state();
        let (status, body) = post_json(&s, "/api/measurements", json!({
            "photos": [{"finger": "right_index", "image_base64": "data:image/jpeg;base64,/9j/4AAQ"}]
        }))
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body[0]["measurement"]["finger_type"], json!("right_index"));
        assert_eq!(body[0]["usable"], json!(true));

        let (status, body) = post_json(&s, "/api/measurements", json!({
            "photos": [{"finger": "right_index", "image_base64": "%%%"}]
        }))
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], json!("invalid_input"));
    }

    #[tokio::test]
    async fn rate_limited_vision_maps_to_429() {
        let s = state_with(FakeSynthesis::default(), FakeVision::new(|_| {
            Err(CapabilityError::RateLimited { capability: Capability::Vision, message: "quota".into() })
        }));
        let (status, body) = post_json(&s, "/api/measurements", json!({
            "photos": [{"finger": "left_ring", "image_base64": "/9j/4AAQ"}]
        }))
        .await;
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(body["error"], json!("capability_rate_limited"));
    }

    #[tokio::test]
    async fn brief_endpoint_returns_ordered_sections() {
        let s = state();
        let (status, body) = post_json(&s, "/api/briefs", json!({
            "preferences": {"colors": ["coral"], "intensity": "subtle"},
            "custom_request": "beach wedding"
        }))
        .await;
        assert_eq!(status, StatusCode::OK);
        let kinds: Vec<&str> = body["sections"].as_array().unwrap().iter().map(|s| s["kind"].as_str().unwrap()).collect();
        assert_eq!(kinds, vec!["custom_request", "color_palette", "intensity", "technical_requirements"]);
        assert!(body["text"].as_str().unwrap().contains("subtle and understated"));
    }

    #[tokio::test]
    async fn designs_are_kept_per_session() {
        let s = state();
        let (status, body) = post_json(&s, "/api/designs", json!({"preferences": {"intensity": "dramatic"}})).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["artifact"]["style_hint"], json!("vivid"));
        let session_id = body["session_id"].as_str().unwrap().to_string();

        let (status, body) = post_json(&s, "/api/designs/variations", json!({"session_id": session_id, "count": 3})).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["artifacts"].as_array().unwrap().len(), 3);

        let request = Request::builder().uri(format!("/api/sessions/{session_id}")).body(Body::empty()).unwrap();
        let (status, body) = send(&s, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["artifacts"].as_array().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn failed_variations_still_answer_ok() {
        let s = state_with(FakeSynthesis::failing_on("TECHNICAL REQUIREMENTS"), FakeVision::new(|_| Ok("{}".into())));
        let (status, body) = post_json(&s, "/api/designs/variations", json!({})).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["requested"], json!(3));
        assert_eq!(body["artifacts"], json!([]));

        let (status, body) = post_json(&s, "/api/designs", json!({})).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["error"], json!("generation_failed"));
        assert_eq!(body["capability"], json!("synthesis"));
        assert_eq!(body["detail"], json!("upstream exploded"));
    }

    #[tokio::test]
    async fn recommendations_fall_back_with_all_keys() {
        let s = state();
        let (status, body) = post_json(&s, "/api/recommendations", json!({"preferences": {"colors": ["teal"]}})).await;
        assert_eq!(status, StatusCode::OK);
        for key in ["recommendations", "colorSuggestions", "styleSuggestions", "warnings"] {
            assert!(body[key].is_array(), "{key}");
        }
        assert!(body["colorSuggestions"][0].as_str().unwrap().contains("teal"));
    }

    #[tokio::test]
    async fn pricing_accepts_descriptor_or_preferences() {
        let s = state();
        let (status, body) = post_json(&s, "/api/pricing", json!({"descriptor": {
            "complexity": "complex", "color_count": 4, "style_keywords": ["glitter"],
            "occasion": "wedding", "personalized_elements": 2
        }}))
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["price"], json!({"amount": 196, "currency": "USD"}));

        let (status, body) = post_json(&s, "/api/pricing", json!({
            "preferences": {"complexity": "medium"}, "personalized_elements": 1
        }))
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["price"]["amount"], json!(70));

        let (status, _) = post_json(&s, "/api/pricing", json!({})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn unknown_session_is_404() {
        let s = state();
        let request = Request::builder().uri(format!("/api/sessions/{}", Uuid::new_v4())).body(Body::empty()).unwrap();
        let (status, _) = send(&s, request).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
