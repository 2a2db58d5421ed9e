//! Authentication helpers, extractors and login handlers
//!
//! Provides password-based authentication with session tokens.
//! Password hashes are stored on each profile as Argon2 PHC strings.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{
    extract::{FromRequestParts, Query, State},
    http::{header, request::Parts, HeaderMap, HeaderValue, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
    Form,
};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

use super::AppState;
use crate::constants::{LOGIN_PATH, SESSION_HEADER};
use crate::data::{Profile, ProfileId};
use crate::error::AppError;
use crate::templates;

#[derive(Debug, Clone, Copy)]
struct Session {
    profile: ProfileId,
    expires_at: Option<Instant>,
}

impl Session {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |at| now < at)
    }
}

/// Active session tokens mapped to the profile they belong to
///
/// Expired sessions are dropped when looked up and whenever a new one is
/// started, so the map never outgrows the sessions still in use.
#[derive(Debug, Clone, Default)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<String, Session>>>,
    ttl: Option<Duration>,
}

impl SessionStore {
    /// `None` keeps sessions until logout
    pub fn new(ttl: Option<Duration>) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            ttl,
        }
    }

    /// Start a session for `profile` and return its token
    pub async fn create(&self, profile: ProfileId) -> String {
        let token = generate_session_token();
        self.insert(token.clone(), profile).await;
        token
    }

    pub async fn insert(&self, token: impl Into<String>, profile: ProfileId) {
        let now = Instant::now();
        let mut sessions = self.sessions.write().await;
        sessions.retain(|_, session| session.is_live(now));
        sessions.insert(
            token.into(),
            Session {
                profile,
                expires_at: self.ttl.map(|ttl| now + ttl),
            },
        );
    }

    /// Profile owning `token`, if the session is still live
    pub async fn profile_for(&self, token: &str) -> Option<ProfileId> {
        let now = Instant::now();
        let session = self.sessions.read().await.get(token).copied()?;
        if session.is_live(now) {
            return Some(session.profile);
        }

        let mut sessions = self.sessions.write().await;
        if sessions.get(token).is_some_and(|s| !s.is_live(now)) {
            sessions.remove(token);
        }
        None
    }

    /// Returns whether a session was removed
    pub async fn remove(&self, token: &str) -> bool {
        self.sessions.write().await.remove(token).is_some()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

/// Hash a password with Argon2 and a fresh salt
pub fn hash_password(password: &str) -> Result<String, String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| format!("Failed to hash password: {}", e))
}

/// Verify password against a stored hash
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    match PasswordHash::new(stored_hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

/// Generate a random session token
pub fn generate_session_token() -> String {
    let token: [u8; 32] = rand::thread_rng().gen();
    hex::encode(token)
}

/// Find the session token in the request headers
///
/// Checked in order:
/// 1. `Authorization: Bearer <token>` header
/// 2. `X-Judge-Session` header
/// 3. the session cookie
fn extract_session_token(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    if let Some(auth) = headers.get(header::AUTHORIZATION) {
        if let Ok(auth_str) = auth.to_str() {
            if let Some(token) = auth_str.strip_prefix("Bearer ") {
                return Some(token.trim().to_string());
            }
        }
    }

    if let Some(session) = headers.get(SESSION_HEADER) {
        if let Ok(session_str) = session.to_str() {
            return Some(session_str.trim().to_string());
        }
    }

    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|cookies| cookies.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == cookie_name)
        .map(|(_, value)| value.to_string())
}

async fn resolve_profile(parts: &Parts, state: &AppState) -> Result<Option<Profile>, AppError> {
    let Some(token) = extract_session_token(&parts.headers, &state.config.session_cookie_name)
    else {
        return Ok(None);
    };

    let Some(profile_id) = state.sessions.profile_for(&token).await else {
        return Ok(None);
    };

    let profile = state.profiles.get(profile_id).await?;
    Ok(profile.filter(|p| p.is_active))
}

/// Only local paths are accepted as redirect targets
fn safe_next(next: Option<&str>) -> String {
    match next {
        Some(path) if path.starts_with('/') && !path.starts_with("//") => path.to_string(),
        _ => "/organizations/".to_string(),
    }
}

/// Login page URL that returns to `next` afterwards
pub fn login_url(next: &str) -> String {
    match serde_urlencoded::to_string([("next", next)]) {
        Ok(query) => format!("{}?{}", LOGIN_PATH, query),
        Err(_) => LOGIN_PATH.to_string(),
    }
}

/// The logged-in profile; anonymous requests are sent to the login page
pub struct CurrentProfile(pub Profile);

pub enum AuthRejection {
    LoginRequired { next: String },
    Internal(AppError),
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            AuthRejection::LoginRequired { next } => Redirect::to(&login_url(&next)).into_response(),
            AuthRejection::Internal(e) => e.into_response(),
        }
    }
}

impl FromRequestParts<AppState> for CurrentProfile {
    type Rejection = AuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        match resolve_profile(parts, state).await {
            Ok(Some(profile)) => Ok(CurrentProfile(profile)),
            Ok(None) => {
                let next = parts
                    .uri
                    .path_and_query()
                    .map(|pq| pq.as_str().to_string())
                    .unwrap_or_else(|| parts.uri.path().to_string());
                Err(AuthRejection::LoginRequired { next })
            }
            Err(e) => Err(AuthRejection::Internal(e)),
        }
    }
}

/// The logged-in profile if there is one
pub struct MaybeProfile(pub Option<Profile>);

impl FromRequestParts<AppState> for MaybeProfile {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        resolve_profile(parts, state).await.map(MaybeProfile)
    }
}

/// Minimal view of the viewer handed to templates
#[derive(Serialize)]
pub struct Viewer<'a> {
    pub username: &'a str,
}

impl<'a> From<&'a Profile> for Viewer<'a> {
    fn from(profile: &'a Profile) -> Self {
        Viewer {
            username: &profile.username,
        }
    }
}

// Auth route handlers

#[derive(Deserialize)]
pub struct LoginQuery {
    next: Option<String>,
}

#[derive(Deserialize)]
pub struct LoginForm {
    username: String,
    password: String,
    next: Option<String>,
}

#[derive(Serialize)]
struct LoginPage<'a> {
    title: &'static str,
    next: &'a str,
    username: &'a str,
    error: Option<&'static str>,
    user: Option<Viewer<'a>>,
}

fn render_login(
    status: StatusCode,
    next: &str,
    username: &str,
    error: Option<&'static str>,
) -> Result<Response, AppError> {
    let page = LoginPage {
        title: "Login",
        next,
        username,
        error,
        user: None,
    };
    let body = templates::render_value("login.html", &page)?;
    Ok((status, Html(body)).into_response())
}

pub async fn login_page(
    MaybeProfile(profile): MaybeProfile,
    Query(query): Query<LoginQuery>,
) -> Result<Response, AppError> {
    let next = safe_next(query.next.as_deref());
    if profile.is_some() {
        return Ok(Redirect::to(&next).into_response());
    }
    render_login(StatusCode::OK, &next, "", None)
}

pub async fn login(
    State(state): State<AppState>,
    Form(form): Form<LoginForm>,
) -> Result<Response, AppError> {
    let next = safe_next(form.next.as_deref());

    let profile = state
        .profiles
        .get_by_username(&form.username)
        .await?
        .filter(|p| p.is_active && verify_password(&form.password, &p.password_hash));

    let Some(profile) = profile else {
        tracing::warn!(username = %form.username, "failed login attempt");
        return render_login(
            StatusCode::UNAUTHORIZED,
            &next,
            &form.username,
            Some("Invalid username or password."),
        );
    };

    let token = state.sessions.create(profile.id).await;
    tracing::info!(username = %profile.username, "user logged in");

    let cookie = format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax",
        state.config.session_cookie_name, token
    );
    let mut response = Redirect::to(&next).into_response();
    if let Ok(value) = HeaderValue::from_str(&cookie) {
        response.headers_mut().insert(header::SET_COOKIE, value);
    }
    Ok(response)
}

pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if let Some(token) = extract_session_token(&headers, &state.config.session_cookie_name) {
        state.sessions.remove(&token).await;
    }

    let cookie = format!(
        "{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0",
        state.config.session_cookie_name
    );
    let mut response = Redirect::to("/organizations/").into_response();
    if let Ok(value) = HeaderValue::from_str(&cookie) {
        response.headers_mut().insert(header::SET_COOKIE, value);
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_round_trip() {
        let hash = hash_password("hunter22").unwrap();
        assert!(verify_password("hunter22", &hash));
        assert!(!verify_password("hunter23", &hash));
        assert!(!verify_password("hunter22", "not-a-hash"));
    }

    #[test]
    fn test_session_tokens_are_unique_hex() {
        let a = generate_session_token();
        let b = generate_session_token();
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn test_session_lookup_and_logout() {
        let store = SessionStore::new(None);
        let token = store.create(ProfileId(3)).await;

        assert_eq!(store.profile_for(&token).await, Some(ProfileId(3)));
        assert_eq!(store.profile_for("unknown").await, None);
        assert!(store.remove(&token).await);
        assert_eq!(store.profile_for(&token).await, None);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_expired_sessions_are_dropped() {
        let store = SessionStore::new(Some(Duration::ZERO));
        store.insert("old", ProfileId(1)).await;

        assert_eq!(store.profile_for("old").await, None);
        assert!(store.is_empty().await);

        store.insert("a", ProfileId(1)).await;
        store.insert("b", ProfileId(2)).await;
        assert_eq!(store.len().await, 1);
    }

    #[test]
    fn test_token_sources() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("a=1; judge_session=abc"));
        assert_eq!(extract_session_token(&headers, "judge_session").as_deref(), Some("abc"));

        headers.insert(SESSION_HEADER, HeaderValue::from_static("def"));
        assert_eq!(extract_session_token(&headers, "judge_session").as_deref(), Some("def"));

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer ghi"));
        assert_eq!(extract_session_token(&headers, "judge_session").as_deref(), Some("ghi"));

        assert_eq!(extract_session_token(&HeaderMap::new(), "judge_session"), None);
    }

    #[test]
    fn test_safe_next_rejects_external_targets() {
        assert_eq!(safe_next(Some("/organization/abc")), "/organization/abc");
        assert_eq!(safe_next(Some("//evil.example")), "/organizations/");
        assert_eq!(safe_next(Some("https://evil.example")), "/organizations/");
        assert_eq!(safe_next(None), "/organizations/");
    }

    #[test]
    fn test_login_url_encodes_next() {
        assert_eq!(
            login_url("/organization/abc/join"),
            "/accounts/login?next=%2Forganization%2Fabc%2Fjoin"
        );
    }
}
