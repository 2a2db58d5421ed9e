use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{ProfileId, RepositoryError};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct OrganizationId(pub u64);

impl fmt::Display for OrganizationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A named group that profiles can join
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Organization {
    pub id: OrganizationId,
    /// URL slug, unique across organizations
    pub key: String,
    pub name: String,
    #[serde(default)]
    pub about: String,
    pub registrant: ProfileId,
    pub creation_date: DateTime<Utc>,
}

/// Fields supplied when registering a new organization
#[derive(Debug, Clone)]
pub struct NewOrganization {
    pub key: String,
    pub name: String,
    pub about: String,
    pub registrant: ProfileId,
}

#[async_trait]
pub trait OrganizationRepository: Send + Sync + 'static {
    /// All organizations in insertion order
    async fn list(&self) -> Result<Vec<Organization>, RepositoryError>;

    async fn get_by_key(&self, key: &str) -> Result<Option<Organization>, RepositoryError>;

    async fn exists_by_key(&self, key: &str) -> Result<bool, RepositoryError>;

    /// Assigns the id and creation date
    async fn insert(&self, new: NewOrganization) -> Result<Organization, RepositoryError>;

    /// Overwrites the stored record with the same id
    async fn save(&self, organization: &Organization) -> Result<(), RepositoryError>;
}

pub type DynOrganizationRepository = Arc<dyn OrganizationRepository>;
