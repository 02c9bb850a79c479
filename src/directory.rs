//! User directory
//!
//! Flat keyed store of alias → {password hash, rank}, persisted as a
//! single JSON document. The in-memory copy is authoritative for the
//! running process; persistence failures are logged and swallowed.
//!
//! Password hashing and comparison are CPU-heavy and are meant to be
//! called from the blocking pool, never from the server actor itself.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::error::{AppError, DirectoryError};
use crate::types::Rank;

/// Stored record for one identity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityRecord {
    /// PHC-format argon2 hash; `None` means password login is impossible
    pub password_hash: Option<String>,
    pub rank: Rank,
}

/// Keyed identity store with optional file backing
#[derive(Debug)]
pub struct UserDirectory {
    records: BTreeMap<String, IdentityRecord>,
    path: Option<PathBuf>,
}

impl UserDirectory {
    /// Create an empty directory that never touches disk
    pub fn in_memory() -> Self {
        Self {
            records: BTreeMap::new(),
            path: None,
        }
    }

    /// Load the directory document at `path`
    ///
    /// A missing file is treated as an empty directory.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, DirectoryError> {
        let path = path.as_ref().to_path_buf();
        let records = match fs::read_to_string(&path) {
            Ok(contents) => serde_json::from_str(&contents)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("No directory at {}, starting empty", path.display());
                BTreeMap::new()
            }
            Err(e) => return Err(e.into()),
        };

        debug!("Loaded {} identities from {}", records.len(), path.display());
        Ok(Self {
            records,
            path: Some(path),
        })
    }

    /// Seed the administrator identity if the directory is empty
    ///
    /// The seeded account has no password hash. Returns true if seeded.
    pub fn bootstrap(&mut self, admin_alias: &str) -> bool {
        if !self.records.is_empty() {
            return false;
        }

        self.records.insert(
            admin_alias.to_string(),
            IdentityRecord {
                password_hash: None,
                rank: Rank::Architect,
            },
        );
        info!("Seeded administrator identity '{}'", admin_alias);
        self.persist();
        true
    }

    pub fn exists(&self, alias: &str) -> bool {
        self.records.contains_key(alias)
    }

    pub fn get(&self, alias: &str) -> Option<&IdentityRecord> {
        self.records.get(alias)
    }

    /// Insert or replace an identity record
    pub fn insert(&mut self, alias: String, password_hash: Option<String>, rank: Rank) {
        self.records.insert(
            alias,
            IdentityRecord {
                password_hash,
                rank,
            },
        );
    }

    /// Total number of identities
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// All identities in alias order
    pub fn iter(&self) -> impl Iterator<Item = (&String, &IdentityRecord)> {
        self.records.iter()
    }

    /// Flush to disk, logging any failure
    pub fn persist(&self) {
        if let Err(e) = self.try_persist() {
            error!("Failed to persist user directory: {}", e);
        }
    }

    /// Flush to disk via a temp file and rename
    ///
    /// Blocking file I/O: called from the server actor, it stalls every
    /// connection for the duration of one small write.
    pub fn try_persist(&self) -> Result<(), DirectoryError> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        let json = serde_json::to_string_pretty(&self.records)?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, path)?;

        debug!("Persisted {} identities to {}", self.records.len(), path.display());
        Ok(())
    }
}

/// Derive a salted argon2 hash for a password
pub fn hash_secret(plain: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(plain.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Hashing(e.to_string()))
}

/// Compare a password against a stored hash
///
/// A malformed stored hash never matches.
pub fn compare_secret(plain: &str, hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(plain.as_bytes(), &parsed)
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_compare() {
        let hash = hash_secret("hunter2").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(compare_secret("hunter2", &hash));
        assert!(!compare_secret("hunter3", &hash));
    }

    #[test]
    fn test_malformed_hash_never_matches() {
        assert!(!compare_secret("anything", "not-a-hash"));
        assert!(!compare_secret("", ""));
    }

    #[test]
    fn test_bootstrap_only_when_empty() {
        let mut directory = UserDirectory::in_memory();
        assert!(directory.bootstrap("Architect"));

        let admin = directory.get("Architect").unwrap();
        assert_eq!(admin.rank, Rank::Architect);
        assert!(admin.password_hash.is_none());

        assert!(!directory.bootstrap("Someone"));
        assert_eq!(directory.len(), 1);
    }

    #[test]
    fn test_alias_is_case_sensitive() {
        let mut directory = UserDirectory::in_memory();
        directory.insert("Neo".to_string(), None, Rank::Soldier);
        assert!(directory.exists("Neo"));
        assert!(!directory.exists("neo"));
    }

    #[test]
    fn test_persist_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("users.json");

        let mut directory = UserDirectory::load(&path).unwrap();
        assert!(directory.is_empty());
        directory.bootstrap("Architect");
        directory.insert("Trinity".to_string(), Some("h".to_string()), Rank::Enforcer);
        directory.try_persist().unwrap();

        let reloaded = UserDirectory::load(&path).unwrap();
        assert_eq!(reloaded.len(), 2);
        assert_eq!(reloaded.get("Trinity").unwrap().rank, Rank::Enforcer);
        assert_eq!(
            reloaded.get("Trinity").unwrap().password_hash.as_deref(),
            Some("h")
        );
        assert!(reloaded.get("Architect").unwrap().password_hash.is_none());
    }

    #[test]
    fn test_persist_failure_is_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("users.json");

        let mut directory = UserDirectory::load(&path).unwrap();
        directory.insert("Neo".to_string(), None, Rank::Soldier);

        assert!(directory.try_persist().is_err());
        directory.persist();
        assert!(directory.exists("Neo"));
    }

    #[test]
    fn test_load_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("users.json");
        fs::write(&path, "not json").unwrap();

        assert!(matches!(
            UserDirectory::load(&path),
            Err(DirectoryError::Json(_))
        ));
    }
}
