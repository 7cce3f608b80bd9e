use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use courier_logging::{courier_info, courier_warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::persist::{AtomicFileWriter, PersistError};

const STATE_FILENAME: &str = "preferences.ron";

/// Per-user settings that survive restarts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPreferences {
    pub kindle_email: Option<String>,
    #[serde(default)]
    pub preserve_image_links: bool,
    /// RFC 3339 timestamp of the last successful delivery.
    #[serde(default)]
    pub last_delivered_at: Option<String>,
}

#[derive(Debug, Error)]
pub enum PreferenceError {
    #[error("could not serialize preferences: {0}")]
    Serialize(String),
    #[error(transparent)]
    Persist(#[from] PersistError),
    #[error("preference store lock poisoned")]
    Poisoned,
}

pub trait PreferenceStore: Send + Sync {
    /// Stored preferences, or defaults for an unknown user.
    fn get_preferences(&self, user_id: i64) -> UserPreferences;

    fn set_kindle_email(&self, user_id: i64, email: &str) -> Result<(), PreferenceError>;

    fn set_preserve_image_links(&self, user_id: i64, enabled: bool) -> Result<(), PreferenceError>;

    fn record_delivery(&self, user_id: i64, delivered_at: &str) -> Result<(), PreferenceError>;
}

/// All users in one RON file, rewritten atomically on every change. The
/// in-memory map only changes after the file write succeeds.
#[derive(Debug)]
pub struct RonPreferenceStore {
    dir: PathBuf,
    users: Mutex<BTreeMap<i64, UserPreferences>>,
}

impl RonPreferenceStore {
    /// Loads `{dir}/preferences.ron`. A missing file means no users yet; an
    /// unparseable one is renamed to `preferences.ron.bad` and treated as empty.
    pub fn open(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        let users = load_users(&dir.join(STATE_FILENAME));
        Self {
            dir,
            users: Mutex::new(users),
        }
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(STATE_FILENAME)
    }

    fn update(
        &self,
        user_id: i64,
        change: impl FnOnce(&mut UserPreferences),
    ) -> Result<(), PreferenceError> {
        let mut users = self.users.lock().map_err(|_| PreferenceError::Poisoned)?;
        let mut next = users.clone();
        change(next.entry(user_id).or_default());

        let pretty = ron::ser::PrettyConfig::new();
        let content = ron::ser::to_string_pretty(&next, pretty)
            .map_err(|err| PreferenceError::Serialize(err.to_string()))?;
        AtomicFileWriter::new(self.dir.clone()).write(STATE_FILENAME, content.as_bytes())?;
        *users = next;
        Ok(())
    }
}

fn load_users(path: &Path) -> BTreeMap<i64, UserPreferences> {
    let content = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return BTreeMap::new(),
        Err(err) => {
            courier_warn!("Failed to read preferences from {:?}: {}", path, err);
            return BTreeMap::new();
        }
    };

    match ron::from_str::<BTreeMap<i64, UserPreferences>>(&content) {
        Ok(users) => {
            courier_info!("Loaded preferences for {} users from {:?}", users.len(), path);
            users
        }
        Err(err) => {
            courier_warn!("Failed to parse preferences from {:?}: {}", path, err);
            set_aside(path);
            BTreeMap::new()
        }
    }
}

/// Moves an unparseable store to `{name}.bad` so the next write cannot
/// overwrite it.
fn set_aside(path: &Path) {
    let mut aside = path.as_os_str().to_owned();
    aside.push(".bad");
    match fs::rename(path, &aside) {
        Ok(()) => courier_warn!("Moved unreadable preferences to {:?}", aside),
        Err(err) => courier_warn!("Failed to move unreadable preferences aside: {}", err),
    }
}

impl PreferenceStore for RonPreferenceStore {
    fn get_preferences(&self, user_id: i64) -> UserPreferences {
        match self.users.lock() {
            Ok(users) => users.get(&user_id).cloned().unwrap_or_default(),
            Err(_) => UserPreferences::default(),
        }
    }

    fn set_kindle_email(&self, user_id: i64, email: &str) -> Result<(), PreferenceError> {
        let email = email.trim().to_string();
        self.update(user_id, |prefs| prefs.kindle_email = Some(email))
    }

    fn set_preserve_image_links(&self, user_id: i64, enabled: bool) -> Result<(), PreferenceError> {
        self.update(user_id, |prefs| prefs.preserve_image_links = enabled)
    }

    fn record_delivery(&self, user_id: i64, delivered_at: &str) -> Result<(), PreferenceError> {
        let delivered_at = delivered_at.to_string();
        self.update(user_id, |prefs| prefs.last_delivered_at = Some(delivered_at))
    }
}
