//! File store configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use supercsv::SerializeOptions;

use crate::lock::LockMode;

fn default_autosave() -> bool {
    true
}

/// Settings for a [`FileDocument`](crate::FileDocument).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Path of the `.scsv` file.
    pub path: PathBuf,

    /// Write the file after every successful mutation.
    #[serde(default = "default_autosave")]
    pub autosave: bool,

    #[serde(default)]
    pub lock: LockMode,

    #[serde(default)]
    pub serialize: SerializeOptions,
}

impl StoreConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            autosave: default_autosave(),
            lock: LockMode::default(),
            serialize: SerializeOptions::default(),
        }
    }

    pub fn with_autosave(mut self, autosave: bool) -> Self {
        self.autosave = autosave;
        self
    }

    pub fn with_lock_mode(mut self, lock: LockMode) -> Self {
        self.lock = lock;
        self
    }

    pub fn with_serialize_options(mut self, serialize: SerializeOptions) -> Self {
        self.serialize = serialize;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use supercsv::TypeCase;

    #[test]
    fn test_defaults() {
        let config = StoreConfig::new("people.scsv");
        assert!(config.autosave);
        assert_eq!(config.lock, LockMode::Blocking);
        assert_eq!(config.serialize.type_case, TypeCase::Lower);
    }

    #[test]
    fn test_deserialize_partial() {
        let config: StoreConfig =
            serde_json::from_str(r#"{"path": "/tmp/a.scsv", "lock": "try"}"#).unwrap();
        assert_eq!(
            config,
            StoreConfig::new("/tmp/a.scsv").with_lock_mode(LockMode::Try)
        );

        let config: StoreConfig = serde_json::from_str(
            r#"{"path": "b.scsv", "autosave": false, "serialize": {"type_case": "upper"}}"#,
        )
        .unwrap();
        assert!(!config.autosave);
        assert_eq!(config.serialize.type_case, TypeCase::Upper);
    }
}
