// restoretool/src/config/mod.rs
use std::path::PathBuf;

use tracing::warn;

pub const DEFAULT_BACKUP_DIR: &str = "./backups";
const TEMP_ROOT_NAME: &str = "restoretool";

#[derive(Debug, Clone, PartialEq)]
pub struct FirestoreConfig {
    pub project_id: String,
    pub access_token: Option<String>,
    pub emulator_host: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StorageConfig {
    pub endpoint_url: String,
    pub region: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    pub bucket_name: String,
    pub folder_prefix: Option<String>,
}

/// Everything the restore tool reads from its environment.
#[derive(Debug, Clone)]
pub struct RestoreSettings {
    pub firestore: Option<FirestoreConfig>,
    pub storage: Option<StorageConfig>,
    pub database_url: Option<String>,
    pub backup_dir: PathBuf,
    pub temp_root: PathBuf,
    pub target_dir: PathBuf,
}

impl RestoreSettings {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    #[cfg(test)]
    pub fn from_map(vars: &std::collections::HashMap<String, String>) -> Self {
        Self::from_lookup(|key| vars.get(key).cloned())
    }

    fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        // Empty values count as unset.
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let firestore = match get("FIRESTORE_PROJECT_ID") {
            Some(project_id) => {
                let access_token = get("FIRESTORE_ACCESS_TOKEN");
                let emulator_host = get("FIRESTORE_EMULATOR_HOST");
                if access_token.is_none() && emulator_host.is_none() {
                    warn!(
                        "FIRESTORE_PROJECT_ID is set but neither FIRESTORE_ACCESS_TOKEN nor FIRESTORE_EMULATOR_HOST is. Document store restore will be disabled."
                    );
                    None
                } else {
                    Some(FirestoreConfig { project_id, access_token, emulator_host })
                }
            }
            None => None,
        };

        let storage_fields = (
            get("STORAGE_BUCKET"),
            get("STORAGE_REGION"),
            get("STORAGE_ACCESS_KEY_ID"),
            get("STORAGE_SECRET_ACCESS_KEY"),
            get("STORAGE_ENDPOINT_URL"),
        );
        let storage = match storage_fields {
            (Some(bucket), Some(region), Some(key_id), Some(secret), Some(endpoint)) => {
                Some(StorageConfig {
                    bucket_name: bucket,
                    region,
                    access_key_id: key_id,
                    secret_access_key: secret,
                    endpoint_url: endpoint,
                    folder_prefix: get("STORAGE_FOLDER_PREFIX"),
                })
            }
            (None, None, None, None, None) => None,
            _ => {
                // Only warn when some storage fields were provided but the set is incomplete
                warn!(
                    "Storage configuration is partially set but some required variables (STORAGE_BUCKET, STORAGE_REGION, STORAGE_ACCESS_KEY_ID, STORAGE_SECRET_ACCESS_KEY, STORAGE_ENDPOINT_URL) are missing. Blob storage restore will be disabled."
                );
                None
            }
        };

        RestoreSettings {
            firestore,
            storage,
            database_url: get("DATABASE_URL"),
            backup_dir: get("BACKUP_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_BACKUP_DIR)),
            temp_root: get("RESTORE_TEMP_ROOT")
                .map(PathBuf::from)
                .unwrap_or_else(|| std::env::temp_dir().join(TEMP_ROOT_NAME)),
            target_dir: get("RESTORE_TARGET_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(".")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn test_defaults_when_environment_is_empty() {
        let settings = RestoreSettings::from_map(&HashMap::new());

        assert!(settings.firestore.is_none());
        assert!(settings.storage.is_none());
        assert!(settings.database_url.is_none());
        assert_eq!(settings.backup_dir, PathBuf::from("./backups"));
        assert_eq!(settings.target_dir, PathBuf::from("."));
        assert!(settings.temp_root.ends_with("restoretool"));
    }

    #[test]
    fn test_complete_storage_group_is_loaded() {
        let settings = RestoreSettings::from_map(&vars(&[
            ("STORAGE_BUCKET", "media"),
            ("STORAGE_REGION", "auto"),
            ("STORAGE_ACCESS_KEY_ID", "key"),
            ("STORAGE_SECRET_ACCESS_KEY", "secret"),
            ("STORAGE_ENDPOINT_URL", "https://storage.googleapis.com"),
            ("STORAGE_FOLDER_PREFIX", ""),
        ]));

        let storage = settings.storage.expect("storage should be configured");
        assert_eq!(storage.bucket_name, "media");
        assert_eq!(storage.folder_prefix, None);
    }

    #[test]
    fn test_partial_storage_group_is_disabled() {
        let settings = RestoreSettings::from_map(&vars(&[
            ("STORAGE_BUCKET", "media"),
            ("STORAGE_REGION", "auto"),
        ]));
        assert!(settings.storage.is_none());
    }

    #[test]
    fn test_firestore_needs_token_or_emulator() {
        let without_auth = RestoreSettings::from_map(&vars(&[("FIRESTORE_PROJECT_ID", "demo")]));
        assert!(without_auth.firestore.is_none());

        let emulator = RestoreSettings::from_map(&vars(&[
            ("FIRESTORE_PROJECT_ID", "demo"),
            ("FIRESTORE_EMULATOR_HOST", "localhost:8080"),
        ]));
        assert_eq!(
            emulator.firestore,
            Some(FirestoreConfig {
                project_id: "demo".into(),
                access_token: None,
                emulator_host: Some("localhost:8080".into()),
            })
        );
    }

    #[test]
    fn test_blank_database_url_counts_as_unset() {
        let settings = RestoreSettings::from_map(&vars(&[("DATABASE_URL", "   ")]));
        assert!(settings.database_url.is_none());
    }
}
