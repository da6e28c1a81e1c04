//! Trivia settings: defaults, on-disk JSON loading and persisted mutations.

use std::{
    env, fs,
    io::ErrorKind,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::{Deserialize, Serialize};
use serde_with::{DurationSeconds, serde_as};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::dao::question_source::QuestionFilters;

/// Default location on disk where the server looks for the JSON settings.
const DEFAULT_CONFIG_PATH: &str = "config/trivia.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "TRIVIA_CONFIG_PATH";
/// Floor applied to the low-water mark and to the fetch batch size.
const MIN_FETCH_BATCH: u32 = 5;

/// Failures raised while persisting settings.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// Settings could not be serialised.
    #[error("failed to serialise settings")]
    Serialize(#[source] serde_json::Error),
    /// Settings could not be written to disk.
    #[error("failed to write settings to `{path}`")]
    Write {
        /// Destination file.
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Every tunable of the trivia loop.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TriviaSettings {
    /// Number of questions requested per refill.
    pub amount: u32,
    /// Upstream category identifier, empty for any.
    pub category: String,
    /// `easy`, `medium`, `hard`, or empty for any.
    pub difficulty: String,
    /// `multiple`, `boolean`, or empty for any.
    #[serde(rename = "type")]
    pub question_type: String,
    /// Text encoding requested from the upstream source.
    pub encode: String,
    /// Delay between asking a question and revealing its answer.
    #[serde_as(as = "DurationSeconds<u64>")]
    #[serde(rename = "answer_delay_seconds")]
    pub answer_delay: Duration,
    /// Pause after the answer before the next round.
    #[serde_as(as = "DurationSeconds<u64>")]
    #[serde(rename = "between_questions_delay_seconds")]
    pub between_delay: Duration,
    /// Batch size the low-water mark is derived from.
    pub fetch_batch_size: u32,
    /// Text prepended to every broadcast line.
    pub chat_prefix: String,
    /// Whether the loop runs right after boot.
    pub start_enabled: bool,
    /// Endpoint of the question source.
    pub api_url: String,
    /// Upper bound on a single refill request.
    #[serde_as(as = "DurationSeconds<u64>")]
    #[serde(rename = "fetch_timeout_seconds")]
    pub fetch_timeout: Duration,
}

impl Default for TriviaSettings {
    fn default() -> Self {
        Self {
            amount: 50,
            category: String::new(),
            difficulty: String::new(),
            question_type: String::new(),
            encode: "base64".into(),
            answer_delay: Duration::from_secs(15),
            between_delay: Duration::from_secs(10),
            fetch_batch_size: 50,
            chat_prefix: "Trivia: ".into(),
            start_enabled: true,
            api_url: "https://opentdb.com/api.php".into(),
            fetch_timeout: Duration::from_secs(20),
        }
    }
}

impl TriviaSettings {
    /// Clamp values into the ranges the loop relies on.
    pub fn clamped(mut self) -> Self {
        self.amount = self.amount.max(1);
        self.answer_delay = self.answer_delay.max(Duration::from_secs(1));
        self.fetch_batch_size = self.fetch_batch_size.max(MIN_FETCH_BATCH);
        self
    }

    /// Queue size under which a refill is requested.
    pub fn low_water_mark(&self) -> usize {
        (self.fetch_batch_size / 4).max(MIN_FETCH_BATCH) as usize
    }

    /// Number of questions asked from the source per refill.
    pub fn refill_amount(&self) -> u32 {
        self.amount.max(1)
    }

    /// Filters forwarded untouched to the question source.
    pub fn filters(&self) -> QuestionFilters {
        QuestionFilters {
            category: self.category.clone(),
            difficulty: self.difficulty.clone(),
            question_type: self.question_type.clone(),
            encode: self.encode.clone(),
        }
    }
}

/// Holds the current settings snapshot and the file it is persisted to.
#[derive(Debug)]
pub struct SettingsStore {
    path: PathBuf,
    current: RwLock<TriviaSettings>,
}

impl SettingsStore {
    /// Load settings from the configured path, falling back to defaults.
    pub fn load() -> Self {
        Self::open(resolve_config_path())
    }

    /// Load settings from `path`, falling back to defaults.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let current = read_settings(&path);
        Self {
            path,
            current: RwLock::new(current),
        }
    }

    /// File backing this store.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Copy of the current settings.
    pub async fn snapshot(&self) -> TriviaSettings {
        self.current.read().await.clone()
    }

    /// Re-read the settings file, replacing the in-memory snapshot.
    pub async fn reload(&self) -> TriviaSettings {
        let fresh = read_settings(&self.path);
        let mut guard = self.current.write().await;
        *guard = fresh.clone();
        fresh
    }

    /// Apply `change`, persist the result and return the new snapshot.
    ///
    /// The in-memory snapshot is only replaced once the file was written.
    pub async fn update<F>(&self, change: F) -> Result<TriviaSettings, SettingsError>
    where
        F: FnOnce(&mut TriviaSettings),
    {
        let mut guard = self.current.write().await;
        let mut next = guard.clone();
        change(&mut next);
        let next = next.clamped();

        write_settings(&self.path, &next).await?;
        *guard = next.clone();
        info!(path = %self.path.display(), "persisted trivia settings");
        Ok(next)
    }
}

/// Read and clamp the settings at `path`, logging why defaults were used if needed.
fn read_settings(path: &Path) -> TriviaSettings {
    match fs::read_to_string(path) {
        Ok(contents) => match serde_json::from_str::<TriviaSettings>(&contents) {
            Ok(settings) => {
                info!(path = %path.display(), "loaded trivia settings");
                settings.clamped()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to parse settings; falling back to defaults"
                );
                TriviaSettings::default()
            }
        },
        Err(err) if err.kind() == ErrorKind::NotFound => {
            info!(
                path = %path.display(),
                "settings file not found; using built-in defaults"
            );
            TriviaSettings::default()
        }
        Err(err) => {
            warn!(
                path = %path.display(),
                error = %err,
                "failed to read settings; falling back to defaults"
            );
            TriviaSettings::default()
        }
    }
}

async fn write_settings(path: &Path, settings: &TriviaSettings) -> Result<(), SettingsError> {
    let contents = serde_json::to_string_pretty(settings).map_err(SettingsError::Serialize)?;
    let io_error = |source| SettingsError::Write {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(io_error)?;
    }
    tokio::fs::write(path, contents).await.map_err(io_error)
}

/// Resolve the settings path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

#[cfg(test)]
mod tests {
    use std::time::{SystemTime, UNIX_EPOCH};

    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        let suffix = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos();
        env::temp_dir()
            .join(format!("trivia_back_{name}_{suffix}"))
            .join("trivia.json")
    }

    #[test]
    fn partial_file_keeps_defaults_and_clamps() {
        let settings: TriviaSettings = serde_json::from_str(
            r#"{"amount": 0, "answer_delay_seconds": 0, "fetch_batch_size": 2, "type": "boolean"}"#,
        )
        .unwrap();
        let settings = settings.clamped();

        assert_eq!(settings.amount, 1);
        assert_eq!(settings.answer_delay, Duration::from_secs(1));
        assert_eq!(settings.between_delay, Duration::from_secs(10));
        assert_eq!(settings.fetch_batch_size, 5);
        assert_eq!(settings.question_type, "boolean");
        assert_eq!(settings.encode, "base64");
    }

    #[test]
    fn low_water_mark_is_a_quarter_of_the_batch_with_a_floor() {
        let mut settings = TriviaSettings::default();
        assert_eq!(settings.low_water_mark(), 12);

        settings.fetch_batch_size = 8;
        assert_eq!(settings.low_water_mark(), 5);
    }

    #[test]
    fn malformed_file_falls_back_to_defaults() {
        let path = temp_path("malformed");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "{ not json").unwrap();

        assert_eq!(read_settings(&path), TriviaSettings::default());

        fs::remove_dir_all(path.parent().unwrap()).unwrap();
    }

    #[tokio::test]
    async fn update_persists_and_reload_reads_back() {
        let path = temp_path("update");
        let store = SettingsStore::open(&path);
        assert_eq!(store.snapshot().await, TriviaSettings::default());

        let updated = store
            .update(|settings| {
                settings.difficulty = "hard".into();
                settings.amount = 0;
            })
            .await
            .unwrap();
        assert_eq!(updated.difficulty, "hard");
        assert_eq!(updated.amount, 1);

        let reloaded = SettingsStore::open(&path).reload().await;
        assert_eq!(reloaded, updated);

        fs::remove_dir_all(path.parent().unwrap()).unwrap();
    }
}
