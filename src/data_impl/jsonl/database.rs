use std::fs::{self, File};
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::data::{Organization, Profile, RepositoryError};

pub const ORGANIZATIONS_FILE: &str = "organizations.jsonl";
pub const PROFILES_FILE: &str = "profiles.jsonl";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Tables {
    pub organizations: Vec<Organization>,
    pub profiles: Vec<Profile>,
}

impl Tables {
    pub fn next_organization_id(&self) -> u64 {
        self.organizations.iter().map(|o| o.id.0).max().unwrap_or(0) + 1
    }

    pub fn next_profile_id(&self) -> u64 {
        self.profiles.iter().map(|p| p.id.0).max().unwrap_or(0) + 1
    }
}

#[derive(Debug)]
pub struct JsonlDatabase {
    dir: Option<PathBuf>,
    tables: RwLock<Tables>,
}

impl JsonlDatabase {
    /// Database that never touches the disk
    pub fn in_memory() -> Self {
        Self::with_tables(Tables::default())
    }

    pub fn with_tables(tables: Tables) -> Self {
        Self {
            dir: None,
            tables: RwLock::new(tables),
        }
    }

    /// Load every table from `dir`, creating the directory if needed
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, RepositoryError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;

        let tables = Tables {
            organizations: read_jsonl(&dir.join(ORGANIZATIONS_FILE))?,
            profiles: read_jsonl(&dir.join(PROFILES_FILE))?,
        };

        tracing::info!(
            dir = %dir.display(),
            organizations = tables.organizations.len(),
            profiles = tables.profiles.len(),
            "loaded judge data"
        );

        Ok(Self {
            dir: Some(dir),
            tables: RwLock::new(tables),
        })
    }

    pub async fn read(&self) -> RwLockReadGuard<'_, Tables> {
        self.tables.read().await
    }

    pub async fn write(&self) -> RwLockWriteGuard<'_, Tables> {
        self.tables.write().await
    }

    pub(crate) async fn flush_organizations(
        &self,
        organizations: &[Organization],
    ) -> Result<(), RepositoryError> {
        match &self.dir {
            Some(dir) => write_jsonl(&dir.join(ORGANIZATIONS_FILE), organizations).await,
            None => Ok(()),
        }
    }

    pub(crate) async fn flush_profiles(&self, profiles: &[Profile]) -> Result<(), RepositoryError> {
        match &self.dir {
            Some(dir) => write_jsonl(&dir.join(PROFILES_FILE), profiles).await,
            None => Ok(()),
        }
    }
}

/// Read all lines from a JSONL file and deserialize them
fn read_jsonl<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<Vec<T>, RepositoryError> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let reader = BufReader::new(File::open(path)?);
    let mut items = Vec::new();

    for (number, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str(&line) {
            Ok(item) => items.push(item),
            Err(e) => {
                // Skip malformed lines rather than refusing to start
                tracing::warn!(path = %path.display(), line = number + 1, error = %e, "skipping malformed record");
            }
        }
    }

    Ok(items)
}

/// Rewrite an entire JSONL file, swapping it in with a rename
async fn write_jsonl<T: Serialize>(path: &Path, items: &[T]) -> Result<(), RepositoryError> {
    let mut contents = String::new();
    for item in items {
        contents.push_str(&serde_json::to_string(item)?);
        contents.push('\n');
    }

    let tmp = path.with_extension("jsonl.tmp");
    tokio::fs::write(&tmp, contents).await?;
    tokio::fs::rename(&tmp, path).await?;

    Ok(())
}
