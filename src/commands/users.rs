//! Profile administration used by the `add-user` subcommand

use crate::api::auth::hash_password;
use crate::constants::RE_USERNAME;
use crate::data::{NewProfile, Profile, ProfileRepository};

/// Minimum password length accepted for new users
const MIN_PASSWORD_LEN: usize = 8;

/// Create a profile with a hashed password
pub async fn add_user(
    profiles: &dyn ProfileRepository,
    username: &str,
    password: &str,
    points: f64,
    display_name: Option<String>,
) -> Result<Profile, String> {
    if !RE_USERNAME.is_match(username) {
        return Err(format!("Invalid username '{}'", username));
    }
    if password.len() < MIN_PASSWORD_LEN {
        return Err(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        ));
    }
    if !points.is_finite() || points < 0.0 {
        return Err("Points must be a non-negative number".to_string());
    }

    let profile = profiles
        .insert(NewProfile {
            username: username.to_string(),
            display_name,
            password_hash: hash_password(password)?,
            points,
            is_active: true,
        })
        .await
        .map_err(|e| e.to_string())?;

    tracing::info!(username = %profile.username, id = %profile.id, "added user");
    Ok(profile)
}
