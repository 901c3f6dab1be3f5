use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde_json::json;

use super::repository::{CertificateId, CertificateRepository, DocumentStore};
use super::service::{CertificateRequest, ResaleCertificateService};
use crate::error::AppError;

/// HTTP endpoints for descriptor preview, on-demand rendering, and stored generation.
pub fn certificate_router<S, R>(service: Arc<ResaleCertificateService<S, R>>) -> Router
where
    S: DocumentStore + 'static,
    R: CertificateRepository + 'static,
{
    Router::new()
        .route("/api/v1/resale-certificates", post(generate_handler::<S, R>))
        .route(
            "/api/v1/resale-certificates/fields",
            post(fields_handler::<S, R>),
        )
        .route(
            "/api/v1/resale-certificates/render",
            post(render_handler::<S, R>),
        )
        .route(
            "/api/v1/resale-certificates/:certificate_id",
            get(status_handler::<S, R>),
        )
        .with_state(service)
}

fn parse_request(body: &Bytes) -> Result<CertificateRequest, AppError> {
    Ok(serde_json::from_slice(body)?)
}

pub(crate) async fn fields_handler<S, R>(
    State(service): State<Arc<ResaleCertificateService<S, R>>>,
    body: Bytes,
) -> Result<Response, AppError>
where
    S: DocumentStore + 'static,
    R: CertificateRepository + 'static,
{
    let request = parse_request(&body)?;
    let fields = service.preview(&request);
    let payload = json!({
        "template": service.mapper().manifest().version(),
        "fields": fields,
    });
    Ok((StatusCode::OK, axum::Json(payload)).into_response())
}

pub(crate) async fn render_handler<S, R>(
    State(service): State<Arc<ResaleCertificateService<S, R>>>,
    body: Bytes,
) -> Result<Response, AppError>
where
    S: DocumentStore + 'static,
    R: CertificateRepository + 'static,
{
    let request = parse_request(&body)?;
    let rendered = service.render(&request)?;
    let etag = format!("\"{}\"", rendered.content_hash);

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, mime::APPLICATION_PDF.to_string()),
            (header::ETAG, etag),
        ],
        rendered.bytes,
    )
        .into_response())
}

pub(crate) async fn generate_handler<S, R>(
    State(service): State<Arc<ResaleCertificateService<S, R>>>,
    body: Bytes,
) -> Result<Response, AppError>
where
    S: DocumentStore + 'static,
    R: CertificateRepository + 'static,
{
    let request = parse_request(&body)?;
    let record = service.generate(&request)?;
    Ok((StatusCode::CREATED, axum::Json(record.view())).into_response())
}

pub(crate) async fn status_handler<S, R>(
    State(service): State<Arc<ResaleCertificateService<S, R>>>,
    Path(certificate_id): Path<String>,
) -> Result<Response, AppError>
where
    S: DocumentStore + 'static,
    R: CertificateRepository + 'static,
{
    let record = service.get(&CertificateId(certificate_id))?;
    Ok((StatusCode::OK, axum::Json(record.view())).into_response())
}
