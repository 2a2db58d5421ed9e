use std::sync::Arc;

use async_trait::async_trait;

use super::JsonlDatabase;
use crate::data::{
    NewProfile, OrganizationId, Profile, ProfileId, ProfileRepository, RepositoryError,
};

#[derive(Debug, Clone)]
pub struct JsonlProfileRepository {
    db: Arc<JsonlDatabase>,
}

impl JsonlProfileRepository {
    pub fn new(db: Arc<JsonlDatabase>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ProfileRepository for JsonlProfileRepository {
    async fn get(&self, id: ProfileId) -> Result<Option<Profile>, RepositoryError> {
        Ok(self.db.read().await.profiles.iter().find(|p| p.id == id).cloned())
    }

    async fn get_by_username(&self, username: &str) -> Result<Option<Profile>, RepositoryError> {
        Ok(self
            .db
            .read()
            .await
            .profiles
            .iter()
            .find(|p| p.username == username)
            .cloned())
    }

    async fn members(&self, organization: OrganizationId) -> Result<Vec<Profile>, RepositoryError> {
        Ok(self
            .db
            .read()
            .await
            .profiles
            .iter()
            .filter(|p| p.is_member_of(organization))
            .cloned()
            .collect())
    }

    async fn count_members(&self, organization: OrganizationId) -> Result<usize, RepositoryError> {
        Ok(self
            .db
            .read()
            .await
            .profiles
            .iter()
            .filter(|p| p.is_member_of(organization))
            .count())
    }

    async fn insert(&self, new: NewProfile) -> Result<Profile, RepositoryError> {
        let mut tables = self.db.write().await;

        if tables.profiles.iter().any(|p| p.username == new.username) {
            return Err(RepositoryError::DuplicateUsername(new.username));
        }

        let profile = Profile {
            id: ProfileId(tables.next_profile_id()),
            username: new.username,
            display_name: new.display_name,
            is_active: new.is_active,
            password_hash: new.password_hash,
            points: new.points,
            organization: None,
            organization_join_time: None,
        };

        let mut profiles = tables.profiles.clone();
        profiles.push(profile.clone());
        self.db.flush_profiles(&profiles).await?;
        tables.profiles = profiles;

        Ok(profile)
    }

    async fn save(&self, profile: &Profile) -> Result<(), RepositoryError> {
        let mut tables = self.db.write().await;

        let mut profiles = tables.profiles.clone();
        let slot = profiles
            .iter_mut()
            .find(|p| p.id == profile.id)
            .ok_or_else(|| RepositoryError::Missing(format!("profile {}", profile.id)))?;
        *slot = profile.clone();

        self.db.flush_profiles(&profiles).await?;
        tables.profiles = profiles;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_profile(username: &str) -> NewProfile {
        NewProfile {
            username: username.to_string(),
            display_name: None,
            password_hash: String::new(),
            points: 0.0,
            is_active: true,
        }
    }

    #[tokio::test]
    async fn test_members_and_count_follow_membership() {
        let repo = JsonlProfileRepository::new(Arc::new(JsonlDatabase::in_memory()));
        let mut alice = repo.insert(new_profile("alice")).await.unwrap();
        repo.insert(new_profile("bob")).await.unwrap();

        alice.organization = Some(OrganizationId(7));
        repo.save(&alice).await.unwrap();

        let members = repo.members(OrganizationId(7)).await.unwrap();
        assert_eq!(members.len(), 1);
        assert_eq!(members[0].username, "alice");
        assert_eq!(repo.count_members(OrganizationId(7)).await.unwrap(), 1);
        assert_eq!(repo.count_members(OrganizationId(8)).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_duplicate_username_rejected() {
        let repo = JsonlProfileRepository::new(Arc::new(JsonlDatabase::in_memory()));
        repo.insert(new_profile("alice")).await.unwrap();

        let err = repo.insert(new_profile("alice")).await.unwrap_err();
        assert!(matches!(err, RepositoryError::DuplicateUsername(_)));
    }

    #[tokio::test]
    async fn test_malformed_lines_are_skipped_on_open() {
        let dir = tempfile::tempdir().unwrap();
        {
            let db = Arc::new(JsonlDatabase::open(dir.path()).unwrap());
            JsonlProfileRepository::new(db)
                .insert(new_profile("alice"))
                .await
                .unwrap();
        }

        let path = dir.path().join(super::super::PROFILES_FILE);
        let mut contents = std::fs::read_to_string(&path).unwrap();
        contents.push_str("{not json\n");
        std::fs::write(&path, contents).unwrap();

        let db = Arc::new(JsonlDatabase::open(dir.path()).unwrap());
        let repo = JsonlProfileRepository::new(db);
        assert!(repo.get_by_username("alice").await.unwrap().is_some());
        assert!(repo.get(ProfileId(2)).await.unwrap().is_none());
    }
}
