use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;

use super::JsonlDatabase;
use crate::data::{
    NewOrganization, Organization, OrganizationId, OrganizationRepository, RepositoryError,
};

#[derive(Debug, Clone)]
pub struct JsonlOrganizationRepository {
    db: Arc<JsonlDatabase>,
}

impl JsonlOrganizationRepository {
    pub fn new(db: Arc<JsonlDatabase>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl OrganizationRepository for JsonlOrganizationRepository {
    async fn list(&self) -> Result<Vec<Organization>, RepositoryError> {
        Ok(self.db.read().await.organizations.clone())
    }

    async fn get_by_key(&self, key: &str) -> Result<Option<Organization>, RepositoryError> {
        Ok(self
            .db
            .read()
            .await
            .organizations
            .iter()
            .find(|org| org.key == key)
            .cloned())
    }

    async fn exists_by_key(&self, key: &str) -> Result<bool, RepositoryError> {
        Ok(self.db.read().await.organizations.iter().any(|org| org.key == key))
    }

    async fn insert(&self, new: NewOrganization) -> Result<Organization, RepositoryError> {
        let mut tables = self.db.write().await;

        if tables.organizations.iter().any(|org| org.key == new.key) {
            return Err(RepositoryError::DuplicateKey(new.key));
        }

        let organization = Organization {
            id: OrganizationId(tables.next_organization_id()),
            key: new.key,
            name: new.name,
            about: new.about,
            registrant: new.registrant,
            creation_date: Utc::now(),
        };

        let mut organizations = tables.organizations.clone();
        organizations.push(organization.clone());
        self.db.flush_organizations(&organizations).await?;
        tables.organizations = organizations;

        Ok(organization)
    }

    async fn save(&self, organization: &Organization) -> Result<(), RepositoryError> {
        let mut tables = self.db.write().await;

        let mut organizations = tables.organizations.clone();
        let slot = organizations
            .iter_mut()
            .find(|org| org.id == organization.id)
            .ok_or_else(|| RepositoryError::Missing(format!("organization {}", organization.id)))?;
        *slot = organization.clone();

        self.db.flush_organizations(&organizations).await?;
        tables.organizations = organizations;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::ProfileId;

    fn new_org(key: &str) -> NewOrganization {
        NewOrganization {
            key: key.to_string(),
            name: format!("{} name", key),
            about: String::new(),
            registrant: ProfileId(1),
        }
    }

    #[tokio::test]
    async fn test_insert_assigns_sequential_ids() {
        let repo = JsonlOrganizationRepository::new(Arc::new(JsonlDatabase::in_memory()));

        let first = repo.insert(new_org("abc")).await.unwrap();
        let second = repo.insert(new_org("def")).await.unwrap();

        assert_eq!(first.id, OrganizationId(1));
        assert_eq!(second.id, OrganizationId(2));
        assert_eq!(repo.list().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_insert_rejects_duplicate_key() {
        let repo = JsonlOrganizationRepository::new(Arc::new(JsonlDatabase::in_memory()));
        repo.insert(new_org("abc")).await.unwrap();

        let err = repo.insert(new_org("abc")).await.unwrap_err();
        assert!(matches!(err, RepositoryError::DuplicateKey(key) if key == "abc"));
        assert_eq!(repo.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_save_unknown_organization_fails() {
        let repo = JsonlOrganizationRepository::new(Arc::new(JsonlDatabase::in_memory()));
        let mut org = repo.insert(new_org("abc")).await.unwrap();
        org.id = OrganizationId(42);

        assert!(matches!(repo.save(&org).await, Err(RepositoryError::Missing(_))));
    }

    #[tokio::test]
    async fn test_records_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();

        {
            let db = Arc::new(JsonlDatabase::open(dir.path()).unwrap());
            let repo = JsonlOrganizationRepository::new(db);
            let mut org = repo.insert(new_org("abc")).await.unwrap();
            org.about = "edited".to_string();
            repo.save(&org).await.unwrap();
        }

        let db = Arc::new(JsonlDatabase::open(dir.path()).unwrap());
        let repo = JsonlOrganizationRepository::new(db);
        let org = repo.get_by_key("abc").await.unwrap().unwrap();
        assert_eq!(org.about, "edited");
        assert_eq!(org.id, OrganizationId(1));
    }
}
