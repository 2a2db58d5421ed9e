//! Organization rules: lookup, membership changes, creation and editing
//!
//! Each operation reads at most a couple of records and writes one. Every
//! expected failure comes back as an `AppError` carrying the text shown to
//! the user; nothing is written when a rule rejects the request.

use std::collections::BTreeMap;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::api::AppState;
use crate::cache::{make_template_fragment_key, ORG_MEMBER_COUNT_FRAGMENT};
use crate::constants::{ORGANIZATION_KEY_MAX_LEN, ORGANIZATION_NAME_MAX_LEN, RE_ORGANIZATION_KEY};
use crate::data::{NewOrganization, Organization, OrganizationId, Profile, RepositoryError};
use crate::error::AppError;
use crate::utils::ranker::ranker;

// ============================================================================
// Lookup
// ============================================================================

/// Resolve an organization by key
pub async fn get_organization(state: &AppState, key: &str) -> Result<Organization, AppError> {
    state
        .organizations
        .get_by_key(key)
        .await?
        .ok_or_else(|| AppError::organization_not_found(key))
}

/// Cache key of the member-count fragment for one organization
pub fn member_count_key(organization: OrganizationId) -> String {
    make_template_fragment_key(ORG_MEMBER_COUNT_FRAGMENT, &[organization.0])
}

/// Member count, served from the fragment cache
pub async fn member_count(state: &AppState, organization: OrganizationId) -> Result<String, AppError> {
    let profiles = state.profiles.clone();
    state
        .fragments
        .get_or_insert_with(&member_count_key(organization), || async move {
            let count = profiles.count_members(organization).await?;
            Ok::<_, AppError>(count.to_string())
        })
        .await
}

/// Drop the cached member count so the next render recomputes it
pub fn invalidate_member_count(state: &AppState, organization: OrganizationId) {
    state.fragments.delete(&member_count_key(organization));
}

#[derive(Debug, Clone, Serialize)]
pub struct OrganizationSummary {
    pub key: String,
    pub name: String,
    pub member_count: String,
}

/// Every organization with its member count, in persistence order
pub async fn list_organizations(state: &AppState) -> Result<Vec<OrganizationSummary>, AppError> {
    let organizations = state.organizations.list().await?;

    let mut summaries = Vec::with_capacity(organizations.len());
    for org in organizations {
        summaries.push(OrganizationSummary {
            member_count: member_count(state, org.id).await?,
            key: org.key,
            name: org.name,
        });
    }
    Ok(summaries)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedMember {
    pub rank: usize,
    pub username: String,
    pub display_name: String,
    pub points: f64,
}

/// Active members with positive points, best first
pub async fn ranked_members(
    state: &AppState,
    organization: &Organization,
) -> Result<Vec<RankedMember>, AppError> {
    let mut members: Vec<Profile> = state
        .profiles
        .members(organization.id)
        .await?
        .into_iter()
        .filter(|p| p.is_active && p.points > 0.0)
        .collect();

    members.sort_by(|a, b| b.points.total_cmp(&a.points));

    Ok(ranker(members, |p| p.points)
        .into_iter()
        .map(|(rank, p)| RankedMember {
            rank,
            display_name: p.display_name().to_string(),
            username: p.username,
            points: p.points,
        })
        .collect())
}

// ============================================================================
// Membership
// ============================================================================

/// Put `profile` into `org`
pub async fn join_organization(
    state: &AppState,
    org: &Organization,
    mut profile: Profile,
) -> Result<(), AppError> {
    if profile.organization.is_some() {
        tracing::warn!(user = %profile.username, org = %org.key, "join rejected: already in an organization");
        return Err(AppError::precondition_failed(
            "Joining organization",
            "You are already in an organization.",
        ));
    }

    profile.organization = Some(org.id);
    profile.organization_join_time = Some(Utc::now());
    state.profiles.save(&profile).await?;
    invalidate_member_count(state, org.id);

    tracing::info!(user = %profile.username, org = %org.key, "joined organization");
    Ok(())
}

/// Take `profile` out of `org`
pub async fn leave_organization(
    state: &AppState,
    org: &Organization,
    mut profile: Profile,
) -> Result<(), AppError> {
    if !profile.is_member_of(org.id) {
        tracing::warn!(user = %profile.username, org = %org.key, "leave rejected: not a member");
        return Err(AppError::precondition_failed(
            "Leaving organization",
            format!("You are not in \"{}\".", org.key),
        ));
    }

    profile.organization = None;
    profile.organization_join_time = None;
    state.profiles.save(&profile).await?;
    invalidate_member_count(state, org.id);

    tracing::info!(user = %profile.username, org = %org.key, "left organization");
    Ok(())
}

// ============================================================================
// Forms
// ============================================================================

const KEY_TAKEN: &str = "Organization with this identifier already exists.";

/// Field name to validation messages; every form field has an entry
pub type FormErrors = BTreeMap<&'static str, Vec<String>>;

/// Outcome of a submitted form
#[derive(Debug)]
pub enum FormResult<T> {
    Saved(T),
    Invalid(FormErrors),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrganizationForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub about: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EditOrganizationForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub about: String,
}

impl From<&Organization> for EditOrganizationForm {
    fn from(org: &Organization) -> Self {
        Self {
            name: org.name.clone(),
            about: org.about.clone(),
        }
    }
}

pub fn empty_errors(fields: &[&'static str]) -> FormErrors {
    fields.iter().map(|f| (*f, Vec::new())).collect()
}

fn has_errors(errors: &FormErrors) -> bool {
    errors.values().any(|messages| !messages.is_empty())
}

fn validate_name(name: &str, errors: &mut FormErrors) {
    let messages = errors.entry("name").or_default();
    if name.is_empty() {
        messages.push("This field is required.".to_string());
    } else if name.chars().count() > ORGANIZATION_NAME_MAX_LEN {
        messages.push(format!(
            "Ensure this value has at most {} characters.",
            ORGANIZATION_NAME_MAX_LEN
        ));
    }
}

fn validate_key(key: &str, errors: &mut FormErrors) {
    let messages = errors.entry("key").or_default();
    if key.is_empty() {
        messages.push("This field is required.".to_string());
    } else if key.len() > ORGANIZATION_KEY_MAX_LEN {
        messages.push(format!(
            "Ensure this value has at most {} characters.",
            ORGANIZATION_KEY_MAX_LEN
        ));
    } else if !RE_ORGANIZATION_KEY.is_match(key) {
        messages.push("Identifier must contain letters and numbers only.".to_string());
    }
}

impl OrganizationForm {
    pub const FIELDS: &'static [&'static str] = &["name", "key", "about"];

    fn normalized(&self) -> Self {
        Self {
            name: self.name.trim().to_string(),
            key: self.key.trim().to_string(),
            about: self.about.trim().to_string(),
        }
    }

    /// Field-level checks that need no storage access
    pub fn validate(&self) -> FormErrors {
        let mut errors = empty_errors(Self::FIELDS);
        validate_name(&self.name, &mut errors);
        validate_key(&self.key, &mut errors);
        errors
    }
}

impl EditOrganizationForm {
    pub const FIELDS: &'static [&'static str] = &["name", "about"];

    fn normalized(&self) -> Self {
        Self {
            name: self.name.trim().to_string(),
            about: self.about.trim().to_string(),
        }
    }

    pub fn validate(&self) -> FormErrors {
        let mut errors = empty_errors(Self::FIELDS);
        validate_name(&self.name, &mut errors);
        errors
    }
}

// ============================================================================
// Creation and editing
// ============================================================================

/// Check that `profile` may register a new organization
pub fn ensure_can_create(state: &AppState, profile: &Profile) -> Result<(), AppError> {
    let min_points = state.config.min_points_to_create;
    if profile.points < min_points {
        return Err(AppError::insufficient_points(
            "Can't add organization",
            format!("You need {} points to add an organization.", min_points),
        ));
    }
    if profile.organization.is_some() {
        return Err(AppError::precondition_failed(
            "Can't add organization",
            "You are already in an organization.",
        ));
    }
    Ok(())
}

/// Register a new organization with `profile` as registrant
pub async fn create_organization(
    state: &AppState,
    profile: &Profile,
    form: &OrganizationForm,
) -> Result<FormResult<Organization>, AppError> {
    ensure_can_create(state, profile)?;

    let form = form.normalized();
    let mut errors = form.validate();
    if errors["key"].is_empty() && state.organizations.exists_by_key(&form.key).await? {
        errors
            .entry("key")
            .or_default()
            .push(KEY_TAKEN.to_string());
    }
    if has_errors(&errors) {
        return Ok(FormResult::Invalid(errors));
    }

    let inserted = state
        .organizations
        .insert(NewOrganization {
            key: form.key,
            name: form.name,
            about: form.about,
            registrant: profile.id,
        })
        .await;

    // Another request may have taken the key since the check above
    let org = match inserted {
        Ok(org) => org,
        Err(RepositoryError::DuplicateKey(key)) => {
            tracing::warn!(user = %profile.username, org = %key, "create rejected: key taken");
            errors.entry("key").or_default().push(KEY_TAKEN.to_string());
            return Ok(FormResult::Invalid(errors));
        }
        Err(e) => return Err(e.into()),
    };

    tracing::info!(user = %profile.username, org = %org.key, "created organization");
    Ok(FormResult::Saved(org))
}

/// Resolve an organization `profile` is allowed to edit
pub async fn get_editable_organization(
    state: &AppState,
    key: &str,
    profile: &Profile,
) -> Result<Organization, AppError> {
    let org = get_organization(state, key).await?;
    if !profile.is_member_of(org.id) {
        tracing::warn!(user = %profile.username, org = %org.key, "edit rejected: not a member");
        return Err(AppError::permission_denied(
            "Can't edit organization",
            "You are not in this organization.",
        ));
    }
    Ok(org)
}

/// Save new name/about for an organization `profile` belongs to
pub async fn update_organization(
    state: &AppState,
    key: &str,
    profile: &Profile,
    form: &EditOrganizationForm,
) -> Result<FormResult<Organization>, AppError> {
    let mut org = get_editable_organization(state, key, profile).await?;

    let form = form.normalized();
    let errors = form.validate();
    if has_errors(&errors) {
        return Ok(FormResult::Invalid(errors));
    }

    org.name = form.name;
    org.about = form.about;
    state.organizations.save(&org).await?;

    tracing::info!(user = %profile.username, org = %org.key, "edited organization");
    Ok(FormResult::Saved(org))
}
