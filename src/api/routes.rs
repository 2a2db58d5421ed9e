//! HTTP route definitions

use axum::{
    response::Redirect,
    routing::{get, post},
    Router,
};

use super::auth;
use super::handlers::{self, organization};
use super::AppState;

/// Create the main router with all routes
pub fn create_router(state: AppState) -> Router {
    // Session routes
    let account_routes = Router::new()
        .route("/accounts/login", get(auth::login_page).post(auth::login))
        .route("/accounts/logout", post(auth::logout));

    // Organization pages (static routes before dynamic {key} routes)
    let organization_routes = Router::new()
        .route("/organizations/", get(organization::organization_list))
        .route(
            "/organizations/new",
            get(organization::new_organization_form).post(organization::create_organization),
        )
        .route("/organization/{key}", get(organization::organization_home))
        .route("/organization/{key}/users", get(organization::organization_users))
        .route(
            "/organization/{key}/join",
            get(organization::join_organization).post(organization::join_organization),
        )
        .route(
            "/organization/{key}/leave",
            get(organization::leave_organization).post(organization::leave_organization),
        )
        .route(
            "/organization/{key}/edit",
            get(organization::edit_organization_form).post(organization::edit_organization),
        );

    Router::new()
        .route("/", get(|| async { Redirect::to("/organizations/") }))
        .route("/health", get(handlers::health))
        .merge(account_routes)
        .merge(organization_routes)
        .with_state(state)
}
