use crate::cleanup::{
    self, presets, steps::recolor::parse_hex_color, AdjustParams, ImageSource, InkColor, Mode,
    ProcessedImageOptions, ProcessedSignature, ProcessingParams, SensitivityOptions,
};
use crate::config::Config;
use crate::error::SignatureError;
use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Multipart, State},
    http::{header, HeaderMap, HeaderName, HeaderValue},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use image::RgbaImage;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Room for multipart boundaries and text fields on top of the file parts
const FORM_OVERHEAD: usize = 64 * 1024;
/// Most file parts a single request carries (`/seal/composite`)
const MAX_FILES_PER_REQUEST: usize = 2;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
}

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

#[derive(Serialize)]
pub struct PresetInfo {
    pub name: &'static str,
    pub params: AdjustParams,
}

/// Server info response
#[derive(Serialize)]
pub struct InfoResponse {
    pub version: String,
    pub presets: Vec<PresetInfo>,
    pub ink_colors: Vec<&'static str>,
    pub modes: Vec<&'static str>,
    pub max_file_size_bytes: usize,
    pub default_ink_color: &'static str,
}

/// Image statistics response
#[derive(Serialize)]
pub struct AnalyzeResponse {
    pub width: u32,
    pub height: u32,
    pub otsu_threshold: u8,
    pub is_blue_ink: bool,
    pub processing_time_ms: u64,
}

/// Build the HTTP router
///
/// `max_file_size` applies to each uploaded file; the body limit leaves room for every file
/// part of a request so oversized files are reported individually.
pub fn router(config: Config) -> Router {
    let body_limit = config
        .max_file_size
        .saturating_mul(MAX_FILES_PER_REQUEST)
        .saturating_add(FORM_OVERHEAD);
    let state = AppState {
        config: Arc::new(config),
    };

    Router::new()
        .route("/process", post(handle_process))
        .route("/process/sensitivity", post(handle_process_sensitivity))
        .route("/process/params", post(handle_process_params))
        .route("/analyze", post(handle_analyze))
        .route("/seal/color", post(handle_seal_color))
        .route("/seal/composite", post(handle_seal_composite))
        .route("/health", get(handle_health))
        .route("/info", get(handle_info))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Run the HTTP server
pub async fn run(config: Config) -> anyhow::Result<()> {
    let addr = format!("{}:{}", config.host, config.port);
    let app = router(config);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// A multipart field: uploaded file or plain text
enum FormValue {
    File(Bytes),
    Text(String),
}

/// Parsed multipart form
struct UploadForm {
    values: HashMap<String, FormValue>,
}

impl UploadForm {
    async fn read(mut multipart: Multipart, config: &Config) -> Result<Self, SignatureError> {
        let mut values = HashMap::new();

        while let Some(field) = multipart.next_field().await.map_err(|e| {
            SignatureError::InvalidRequest(format!("Failed to parse multipart: {}", e))
        })? {
            let name = field.name().unwrap_or_default().to_string();

            let value = if field.file_name().is_some() {
                let data = field.bytes().await.map_err(|e| {
                    SignatureError::InvalidRequest(format!("Failed to read file data: {}", e))
                })?;
                if data.len() > config.max_file_size {
                    return Err(SignatureError::ImageTooLarge {
                        size: data.len(),
                        max: config.max_file_size,
                    });
                }
                FormValue::File(data)
            } else {
                let text = field.text().await.map_err(|e| {
                    SignatureError::InvalidRequest(format!("Invalid field {}: {}", name, e))
                })?;
                FormValue::Text(text)
            };

            values.insert(name, value);
        }

        Ok(Self { values })
    }

    /// Image source from a file part, or a data URI sent as text
    fn source(&mut self, names: &[&str]) -> Result<ImageSource, SignatureError> {
        for name in names {
            match self.values.remove(*name) {
                Some(FormValue::File(data)) => return Ok(ImageSource::Bytes(data.to_vec())),
                Some(FormValue::Text(uri)) => return Ok(ImageSource::DataUri(uri)),
                None => {}
            }
        }
        Err(SignatureError::MissingFile)
    }

    fn text(&self, name: &str) -> Option<&str> {
        match self.values.get(name) {
            Some(FormValue::Text(text)) if !text.trim().is_empty() => Some(text.trim()),
            _ => None,
        }
    }

    fn number(&self, name: &str) -> Result<Option<f64>, SignatureError> {
        self.text(name)
            .map(|value| {
                value.parse::<f64>().map_err(|_| {
                    SignatureError::InvalidRequest(format!("{} must be a number", name))
                })
            })
            .transpose()
    }

    fn ink_color(&self, default: InkColor) -> Result<InkColor, SignatureError> {
        match self.text("ink_color") {
            Some(value) => InkColor::from_str(value).ok_or_else(|| {
                SignatureError::InvalidRequest(format!("Unknown ink color: {}", value))
            }),
            None => Ok(default),
        }
    }
}

/// Run CPU-bound cleanup off the async runtime
async fn run_blocking<T, F>(f: F) -> Result<T, SignatureError>
where
    F: FnOnce() -> Result<T, SignatureError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| SignatureError::Internal(format!("Cleanup task failed: {}", e)))?
}

fn png_response(image: &RgbaImage, mut headers: HeaderMap) -> Result<Response, SignatureError> {
    let bytes = cleanup::encode_png(image)?;
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("image/png"));
    Ok((headers, bytes).into_response())
}

fn signature_response(
    result: &ProcessedSignature,
    start: Instant,
) -> Result<Response, SignatureError> {
    let mut headers = HeaderMap::new();
    let values = [
        ("x-threshold", format!("{:.1}", result.threshold)),
        ("x-otsu-threshold", result.otsu_threshold.to_string()),
        ("x-blue-ink", result.is_blue_ink.to_string()),
        ("x-ink-pixels", result.ink_pixels.to_string()),
        ("x-fallback-used", result.fallback_used.to_string()),
        (
            "x-processing-time-ms",
            start.elapsed().as_millis().to_string(),
        ),
    ];
    for (name, value) in values {
        let value = HeaderValue::from_str(&value)
            .map_err(|e| SignatureError::Internal(format!("Invalid header {}: {}", name, e)))?;
        headers.insert(HeaderName::from_static(name), value);
    }

    tracing::info!(
        "Cleanup completed in {}ms: threshold {:.1}, {} ink pixels",
        start.elapsed().as_millis(),
        result.threshold,
        result.ink_pixels
    );

    png_response(&result.image, headers)
}

/// Options JSON for one-shot processing; the configured ink color fills in when absent
fn parse_options(
    json: Option<&str>,
    default_ink: InkColor,
) -> Result<ProcessedImageOptions, SignatureError> {
    let mut value = match json {
        Some(json) => serde_json::from_str::<serde_json::Value>(json)
            .map_err(|e| SignatureError::InvalidRequest(format!("Invalid options: {}", e)))?,
        None => serde_json::json!({}),
    };

    let object = value
        .as_object_mut()
        .ok_or_else(|| SignatureError::InvalidRequest("options must be an object".to_string()))?;
    object
        .entry("ink_color")
        .or_insert_with(|| serde_json::json!(default_ink.as_str()));

    serde_json::from_value(value)
        .map_err(|e| SignatureError::InvalidRequest(format!("Invalid options: {}", e)))
}

/// One-shot cleanup of an uploaded signature
async fn handle_process(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Response, SignatureError> {
    let start = Instant::now();
    let mut form = UploadForm::read(multipart, &state.config).await?;

    let source = form.source(&["file", "data_uri"])?;
    let mut options = parse_options(form.text("options"), state.config.default_ink_color)?;
    if form.text("ink_color").is_some() {
        options.ink_color = form.ink_color(options.ink_color)?;
    }

    let result = run_blocking(move || cleanup::process_one_shot(source, &options)).await?;
    signature_response(&result, start)
}

/// Cleanup driven by a single sensitivity slider
async fn handle_process_sensitivity(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Response, SignatureError> {
    let start = Instant::now();
    let mut form = UploadForm::read(multipart, &state.config).await?;

    let source = form.source(&["file", "data_uri"])?;
    let sensitivity = form.number("sensitivity")?.unwrap_or(50.0);
    let options = SensitivityOptions {
        ink_color: form.ink_color(state.config.default_ink_color)?,
        stroke_thickness: form
            .number("stroke_thickness")?
            .map(|v| v.round().clamp(0.0, 3.0) as i32)
            .unwrap_or(1),
    };

    let result = run_blocking(move || {
        let loaded = cleanup::load_for_adjustment(source)?;
        Ok(cleanup::process_with_sensitivity(&loaded, sensitivity, options))
    })
    .await?;
    signature_response(&result, start)
}

/// Cleanup driven by the multi-dimensional sliders or a named preset
async fn handle_process_params(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Response, SignatureError> {
    let start = Instant::now();
    let mut form = UploadForm::read(multipart, &state.config).await?;

    let source = form.source(&["file", "data_uri"])?;
    let ink_color = form.ink_color(state.config.default_ink_color)?;
    let params = match (form.text("params"), form.text("preset")) {
        (Some(json), _) => serde_json::from_str::<AdjustParams>(json)
            .map_err(|e| SignatureError::InvalidRequest(format!("Invalid params: {}", e)))?,
        (None, Some(name)) => presets::preset(name).ok_or_else(|| {
            SignatureError::UnknownPreset(format!(
                "{} (expected one of: {})",
                name,
                presets::names().join(", ")
            ))
        })?,
        (None, None) => AdjustParams::default(),
    };

    let params = ProcessingParams::Adjust(params);
    let result = run_blocking(move || {
        let loaded = cleanup::load_for_adjustment(source)?;
        Ok(cleanup::process_with_params(&loaded, &params, ink_color))
    })
    .await?;
    signature_response(&result, start)
}

/// Otsu threshold and ink classification without processing
async fn handle_analyze(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<AnalyzeResponse>, SignatureError> {
    let start = Instant::now();
    let mut form = UploadForm::read(multipart, &state.config).await?;
    let source = form.source(&["file", "data_uri"])?;

    let loaded = run_blocking(move || cleanup::load_for_adjustment(source)).await?;

    Ok(Json(AnalyzeResponse {
        width: loaded.raw_pixels().width(),
        height: loaded.raw_pixels().height(),
        otsu_threshold: loaded.otsu_threshold(),
        is_blue_ink: loaded.is_blue_ink(),
        processing_time_ms: start.elapsed().as_millis() as u64,
    }))
}

/// Recolor a stamp image
async fn handle_seal_color(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Response, SignatureError> {
    let mut form = UploadForm::read(multipart, &state.config).await?;

    let source = form.source(&["file", "data_uri"])?;
    let color = form
        .text("color")
        .ok_or_else(|| SignatureError::InvalidRequest("Missing color".to_string()))?;
    let color = parse_hex_color(color).ok_or_else(|| {
        SignatureError::InvalidRequest(format!("Invalid color {}, expected #rrggbb", color))
    })?;

    let image = run_blocking(move || {
        let seal = cleanup::steps::load::apply(source)?;
        Ok(cleanup::apply_seal_color(seal, color))
    })
    .await?;
    png_response(&image, HeaderMap::new())
}

/// Stack a stamp over a signature
async fn handle_seal_composite(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Response, SignatureError> {
    let mut form = UploadForm::read(multipart, &state.config).await?;

    let seal = form.source(&["seal"])?;
    let signature = form.source(&["signature"])?;

    let image = run_blocking(move || {
        let seal = cleanup::steps::load::apply(seal)?;
        let signature = cleanup::steps::load::apply(signature)?;
        cleanup::composite_seal_with_signature(&seal, &signature)
    })
    .await?;
    png_response(&image, HeaderMap::new())
}

/// Handle health check requests
async fn handle_health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Handle info requests
async fn handle_info(State(state): State<AppState>) -> impl IntoResponse {
    Json(InfoResponse {
        version: env!("CARGO_PKG_VERSION").to_string(),
        presets: presets::SIGNATURE_PRESETS
            .iter()
            .map(|(name, params)| PresetInfo {
                name: *name,
                params: *params,
            })
            .collect(),
        ink_colors: vec![InkColor::Black.as_str(), InkColor::DarkBlue.as_str()],
        modes: Mode::ALL.iter().map(Mode::as_str).collect(),
        max_file_size_bytes: state.config.max_file_size,
        default_ink_color: state.config.default_ink_color.as_str(),
    })
}
