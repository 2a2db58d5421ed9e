//! HTTP request handlers

pub mod organization;

use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tera::Context;

use super::auth::Viewer;
use crate::data::Profile;
use crate::error::AppError;
use crate::templates;

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

/// Health check endpoint
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Context every page starts from: the title and the logged-in viewer
pub fn page_context(title: &str, viewer: Option<&Profile>) -> Context {
    let mut context = Context::new();
    context.insert("title", title);
    context.insert("user", &viewer.map(Viewer::from));
    context
}

/// Render a page template with the given status
pub fn render_page(name: &str, context: &Context, status: StatusCode) -> Result<Response, AppError> {
    let body = templates::render(name, context)?;
    Ok((status, Html(body)).into_response())
}
