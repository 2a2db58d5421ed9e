use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{OrganizationId, RepositoryError};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct ProfileId(pub u64);

impl fmt::Display for ProfileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Judge-side representation of a user
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Profile {
    pub id: ProfileId,
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default = "default_active")]
    pub is_active: bool,
    /// Argon2 PHC string
    pub password_hash: String,
    #[serde(default)]
    pub points: f64,
    #[serde(default)]
    pub organization: Option<OrganizationId>,
    #[serde(default)]
    pub organization_join_time: Option<DateTime<Utc>>,
}

fn default_active() -> bool {
    true
}

impl Profile {
    /// Name shown in rosters
    pub fn display_name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.username)
    }

    pub fn is_member_of(&self, organization: OrganizationId) -> bool {
        self.organization == Some(organization)
    }
}

/// Fields supplied when adding a user
#[derive(Debug, Clone)]
pub struct NewProfile {
    pub username: String,
    pub display_name: Option<String>,
    pub password_hash: String,
    pub points: f64,
    pub is_active: bool,
}

#[async_trait]
pub trait ProfileRepository: Send + Sync + 'static {
    async fn get(&self, id: ProfileId) -> Result<Option<Profile>, RepositoryError>;

    async fn get_by_username(&self, username: &str) -> Result<Option<Profile>, RepositoryError>;

    /// Every profile whose organization is `organization`, in insertion order
    async fn members(&self, organization: OrganizationId) -> Result<Vec<Profile>, RepositoryError>;

    async fn count_members(&self, organization: OrganizationId) -> Result<usize, RepositoryError>;

    async fn insert(&self, new: NewProfile) -> Result<Profile, RepositoryError>;

    /// Overwrites the stored record with the same id
    async fn save(&self, profile: &Profile) -> Result<(), RepositoryError>;
}

pub type DynProfileRepository = Arc<dyn ProfileRepository>;
