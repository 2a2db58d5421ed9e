//! Organization HTTP handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    Form,
};

use super::{page_context, render_page};
use crate::api::auth::{AuthRejection, CurrentProfile, MaybeProfile};
use crate::api::AppState;
use crate::commands::organization::{
    self, EditOrganizationForm, FormErrors, FormResult, OrganizationForm,
};
use crate::data::{Organization, Profile};
use crate::error::AppError;

/// Home page of an organization
pub fn organization_home_url(key: &str) -> String {
    format!("/organization/{}", key)
}

// ============================================================================
// Listing and detail
// ============================================================================

/// List all organizations
pub async fn organization_list(
    State(state): State<AppState>,
    MaybeProfile(viewer): MaybeProfile,
) -> Result<Response, AppError> {
    list_page(&state, viewer.as_ref())
        .await
        .map_err(|e| e.for_viewer(viewer.as_ref()))
}

async fn list_page(state: &AppState, viewer: Option<&Profile>) -> Result<Response, AppError> {
    let organizations = organization::list_organizations(state).await?;
    let can_create = viewer.is_some_and(|p| organization::ensure_can_create(state, p).is_ok());

    let mut context = page_context("Organizations", viewer);
    context.insert("organizations", &organizations);
    context.insert("can_create", &can_create);
    render_page("organizations.html", &context, StatusCode::OK)
}

/// Show one organization
pub async fn organization_home(
    State(state): State<AppState>,
    Path(key): Path<String>,
    MaybeProfile(viewer): MaybeProfile,
) -> Result<Response, AppError> {
    home_page(&state, &key, viewer.as_ref())
        .await
        .map_err(|e| e.for_viewer(viewer.as_ref()))
}

async fn home_page(state: &AppState, key: &str, viewer: Option<&Profile>) -> Result<Response, AppError> {
    let org = organization::get_organization(state, key).await?;
    let member_count = organization::member_count(state, org.id).await?;
    let registrant = state
        .profiles
        .get(org.registrant)
        .await?
        .map(|p| p.display_name().to_string())
        .unwrap_or_default();

    let is_member = viewer.is_some_and(|p| p.is_member_of(org.id));
    let can_join = viewer.is_some_and(|p| p.organization.is_none());

    let mut context = page_context(&org.name, viewer);
    context.insert("organization", &org);
    context.insert("member_count", &member_count);
    context.insert("registrant", &registrant);
    context.insert("can_join", &can_join);
    context.insert("can_leave", &is_member);
    context.insert("can_edit", &is_member);
    render_page("organization.html", &context, StatusCode::OK)
}

/// Ranked member roster of one organization
pub async fn organization_users(
    State(state): State<AppState>,
    Path(key): Path<String>,
    MaybeProfile(viewer): MaybeProfile,
) -> Result<Response, AppError> {
    users_page(&state, &key, viewer.as_ref())
        .await
        .map_err(|e| e.for_viewer(viewer.as_ref()))
}

async fn users_page(state: &AppState, key: &str, viewer: Option<&Profile>) -> Result<Response, AppError> {
    let org = organization::get_organization(state, key).await?;
    let users = organization::ranked_members(state, &org).await?;

    let mut context = page_context(&format!("{} Members", org.name), viewer);
    context.insert("organization", &org);
    context.insert("users", &users);
    render_page("users.html", &context, StatusCode::OK)
}

// ============================================================================
// Membership
// ============================================================================

#[derive(Debug, Clone, Copy)]
enum MembershipChange {
    Join,
    Leave,
}

/// Resolve the organization, require a login, apply the rule, go home
async fn change_membership(
    state: &AppState,
    key: &str,
    auth: Result<CurrentProfile, AuthRejection>,
    change: MembershipChange,
) -> Response {
    let viewer = auth.as_ref().ok().map(|CurrentProfile(p)| p);
    let org = match organization::get_organization(state, key).await {
        Ok(org) => org,
        Err(e) => return e.for_viewer(viewer).into_response(),
    };

    let CurrentProfile(profile) = match auth {
        Ok(current) => current,
        Err(rejection) => return rejection.into_response(),
    };

    let result = match change {
        MembershipChange::Join => {
            organization::join_organization(state, &org, profile.clone()).await
        }
        MembershipChange::Leave => {
            organization::leave_organization(state, &org, profile.clone()).await
        }
    };

    match result {
        Ok(()) => Redirect::to(&organization_home_url(&org.key)).into_response(),
        Err(e) => e.for_viewer(Some(&profile)).into_response(),
    }
}

/// Join an organization
pub async fn join_organization(
    State(state): State<AppState>,
    Path(key): Path<String>,
    auth: Result<CurrentProfile, AuthRejection>,
) -> Response {
    change_membership(&state, &key, auth, MembershipChange::Join).await
}

/// Leave an organization
pub async fn leave_organization(
    State(state): State<AppState>,
    Path(key): Path<String>,
    auth: Result<CurrentProfile, AuthRejection>,
) -> Response {
    change_membership(&state, &key, auth, MembershipChange::Leave).await
}

// ============================================================================
// Creation and editing
// ============================================================================

fn render_new_form(
    viewer: &Profile,
    form: &OrganizationForm,
    errors: &FormErrors,
    status: StatusCode,
) -> Result<Response, AppError> {
    let mut context = page_context("Create new organization", Some(viewer));
    context.insert("form", form);
    context.insert("errors", errors);
    render_page("new_organization.html", &context, status)
}

/// Show the creation form
pub async fn new_organization_form(
    State(state): State<AppState>,
    CurrentProfile(profile): CurrentProfile,
) -> Result<Response, AppError> {
    organization::ensure_can_create(&state, &profile).map_err(|e| e.for_viewer(Some(&profile)))?;
    render_new_form(
        &profile,
        &OrganizationForm::default(),
        &organization::empty_errors(OrganizationForm::FIELDS),
        StatusCode::OK,
    )
}

/// Register a new organization
pub async fn create_organization(
    State(state): State<AppState>,
    CurrentProfile(profile): CurrentProfile,
    Form(form): Form<OrganizationForm>,
) -> Result<Response, AppError> {
    let result = organization::create_organization(&state, &profile, &form)
        .await
        .map_err(|e| e.for_viewer(Some(&profile)))?;
    match result {
        FormResult::Saved(org) => Ok(Redirect::to(&organization_home_url(&org.key)).into_response()),
        FormResult::Invalid(errors) => {
            render_new_form(&profile, &form, &errors, StatusCode::BAD_REQUEST)
        }
    }
}

fn render_edit_form(
    viewer: &Profile,
    org: &Organization,
    form: &EditOrganizationForm,
    errors: &FormErrors,
    status: StatusCode,
) -> Result<Response, AppError> {
    let mut context = page_context(&format!("Edit {}", org.name), Some(viewer));
    context.insert("organization", org);
    context.insert("form", form);
    context.insert("errors", errors);
    render_page("edit_organization.html", &context, status)
}

/// Show the edit form
pub async fn edit_organization_form(
    State(state): State<AppState>,
    Path(key): Path<String>,
    CurrentProfile(profile): CurrentProfile,
) -> Result<Response, AppError> {
    let org = organization::get_editable_organization(&state, &key, &profile)
        .await
        .map_err(|e| e.for_viewer(Some(&profile)))?;
    render_edit_form(
        &profile,
        &org,
        &EditOrganizationForm::from(&org),
        &organization::empty_errors(EditOrganizationForm::FIELDS),
        StatusCode::OK,
    )
}

/// Save an edited organization
pub async fn edit_organization(
    State(state): State<AppState>,
    Path(key): Path<String>,
    CurrentProfile(profile): CurrentProfile,
    Form(form): Form<EditOrganizationForm>,
) -> Result<Response, AppError> {
    let result = organization::update_organization(&state, &key, &profile, &form)
        .await
        .map_err(|e| e.for_viewer(Some(&profile)))?;
    match result {
        FormResult::Saved(org) => Ok(Redirect::to(&organization_home_url(&org.key)).into_response()),
        FormResult::Invalid(errors) => {
            let org = organization::get_editable_organization(&state, &key, &profile)
                .await
                .map_err(|e| e.for_viewer(Some(&profile)))?;
            render_edit_form(&profile, &org, &form, &errors, StatusCode::BAD_REQUEST)
        }
    }
}
