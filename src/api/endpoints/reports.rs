//! Report upload endpoints.
//!
//! `POST /api/analyze-report`: report image (or X-ray with `mode=xray`)
//! `POST /api/analyze-xray`: radiograph
//! `POST /api/report-fields`: image or PDF, pattern-matched fields
//!
//! All take a multipart body with a `file` part and an optional
//! `language` text part.

use axum::extract::multipart::MultipartError;
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::Json;

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, ReportResponse};
use crate::pipeline::analysis::AnalysisMode;
use crate::pipeline::upload::UploadedFile;
use crate::pipeline::{PipelineProfile, ProcessRequest};

/// Parsed multipart body. Unknown parts are ignored.
#[derive(Debug, Default)]
pub struct UploadForm {
    pub file: Option<UploadedFile>,
    pub language: Option<String>,
    pub mode: Option<String>,
}

fn multipart_error(e: MultipartError) -> ApiError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::FileTooLarge("Upload exceeds the request size limit".into())
    } else {
        ApiError::BadRequest(e.body_text())
    }
}

/// Read every part of the request. A later `file` part replaces an earlier one.
pub async fn read_form(mut multipart: Multipart) -> Result<UploadForm, ApiError> {
    let mut form = UploadForm::default();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "file" => {
                let file_name = field.file_name().unwrap_or("upload").to_string();
                let content_type = match field.content_type() {
                    Some(ct) => ct.to_string(),
                    None => mime_guess::from_path(&file_name)
                        .first_or_octet_stream()
                        .to_string(),
                };
                let bytes = field.bytes().await.map_err(multipart_error)?;
                form.file = Some(UploadedFile::new(&file_name, &content_type, bytes.to_vec()));
            }
            "language" => {
                let value = field.text().await.map_err(multipart_error)?;
                form.language = Some(value.trim().to_string()).filter(|v| !v.is_empty());
            }
            "mode" => {
                let value = field.text().await.map_err(multipart_error)?;
                form.mode = Some(value.trim().to_string()).filter(|v| !v.is_empty());
            }
            other => {
                tracing::debug!(field = other, "Ignoring unknown multipart field");
            }
        }
    }

    Ok(form)
}

async fn run(
    ctx: &ApiContext,
    profile: &PipelineProfile,
    form: UploadForm,
) -> Result<Json<ReportResponse>, ApiError> {
    let request = ProcessRequest {
        language: form.language,
        progress: None,
    };
    let outcome = ctx.processor.process(form.file, profile, request).await?;
    Ok(Json(outcome.into()))
}

/// `POST /api/analyze-report`
pub async fn analyze_report(
    State(ctx): State<ApiContext>,
    multipart: Multipart,
) -> Result<Json<ReportResponse>, ApiError> {
    let form = read_form(multipart).await?;
    let profile = match AnalysisMode::from_flag(form.mode.as_deref()) {
        AnalysisMode::Xray => &ctx.profiles.xray,
        AnalysisMode::Text => &ctx.profiles.report,
    };
    run(&ctx, profile, form).await
}

/// `POST /api/analyze-xray`
pub async fn analyze_xray(
    State(ctx): State<ApiContext>,
    multipart: Multipart,
) -> Result<Json<ReportResponse>, ApiError> {
    let form = read_form(multipart).await?;
    run(&ctx, &ctx.profiles.xray, form).await
}

/// `POST /api/report-fields`
pub async fn report_fields(
    State(ctx): State<ApiContext>,
    multipart: Multipart,
) -> Result<Json<ReportResponse>, ApiError> {
    let form = read_form(multipart).await?;
    run(&ctx, &ctx.profiles.fields, form).await
}
