//! Flat JSON-file persistence for characters and game states.
//!
//! Each save is a direct pretty-printed serialization of the in-memory type.
//! There is no versioning; every persisted struct defaults missing fields on
//! load. Concurrent writers are not coordinated and the last write wins.

use crate::world::{Character, GameState};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;

/// Errors from persistence operations.
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Replace anything but ASCII letters and digits with `_`.
pub fn sanitize_id(id: &str) -> String {
    id.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

/// Path of the character file for `id` inside `dir`.
pub fn character_save_path(dir: impl AsRef<Path>, id: &str) -> PathBuf {
    dir.as_ref().join(format!("character_{}.json", sanitize_id(id)))
}

/// Path of the game state file for `id` inside `dir`.
pub fn game_state_save_path(dir: impl AsRef<Path>, id: &str) -> PathBuf {
    dir.as_ref().join(format!("gamestate_{}.json", sanitize_id(id)))
}

/// Older game state file name, still read when the current one is missing.
pub fn legacy_game_state_path(dir: impl AsRef<Path>, id: &str) -> PathBuf {
    dir.as_ref().join(format!("game_state_{}.json", sanitize_id(id)))
}

/// A save file found by [`SaveStore::list_characters`].
#[derive(Debug, Clone)]
pub struct CharacterSaveInfo {
    pub path: PathBuf,
    /// Id recovered from the file name (sanitized form).
    pub id: String,
    pub name: String,
    pub level: u32,
}

/// A directory of save files.
#[derive(Debug, Clone)]
pub struct SaveStore {
    dir: PathBuf,
}

impl SaveStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub async fn save_character(&self, id: &str, character: &Character) -> Result<(), PersistError> {
        let path = character_save_path(&self.dir, id);
        write_json(&path, character).await?;
        tracing::debug!(path = %path.display(), "character saved");
        Ok(())
    }

    /// Load a character, or `None` if it was never saved.
    pub async fn load_character(&self, id: &str) -> Result<Option<Character>, PersistError> {
        read_json(&character_save_path(&self.dir, id)).await
    }

    pub async fn save_game_state(&self, id: &str, state: &GameState) -> Result<(), PersistError> {
        let path = game_state_save_path(&self.dir, id);
        write_json(&path, state).await?;
        tracing::debug!(path = %path.display(), "game state saved");
        Ok(())
    }

    /// Load a game state, falling back to the legacy file name.
    pub async fn load_game_state(&self, id: &str) -> Result<Option<GameState>, PersistError> {
        if let Some(state) = read_json(&game_state_save_path(&self.dir, id)).await? {
            return Ok(Some(state));
        }
        let legacy = legacy_game_state_path(&self.dir, id);
        let state = read_json(&legacy).await?;
        if state.is_some() {
            tracing::info!(path = %legacy.display(), "loaded legacy game state");
        }
        Ok(state)
    }

    /// Remove every file saved for `id`. Missing files are not an error.
    pub async fn delete(&self, id: &str) -> Result<(), PersistError> {
        for path in [
            character_save_path(&self.dir, id),
            game_state_save_path(&self.dir, id),
            legacy_game_state_path(&self.dir, id),
        ] {
            match fs::remove_file(&path).await {
                Ok(()) => tracing::debug!(path = %path.display(), "save removed"),
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }

    /// Every readable character save in the directory, sorted by name.
    ///
    /// A missing directory is created and yields an empty list.
    pub async fn list_characters(&self) -> Result<Vec<CharacterSaveInfo>, PersistError> {
        let mut saves = Vec::new();
        if !fs::try_exists(&self.dir).await? {
            fs::create_dir_all(&self.dir).await?;
            return Ok(saves);
        }

        let mut entries = fs::read_dir(&self.dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let Some(id) = path
                .file_name()
                .and_then(|n| n.to_str())
                .and_then(|n| n.strip_prefix("character_"))
                .and_then(|n| n.strip_suffix(".json"))
                .map(str::to_string)
            else {
                continue;
            };
            match read_json::<Character>(&path).await {
                Ok(Some(character)) => saves.push(CharacterSaveInfo {
                    path,
                    id,
                    name: character.name,
                    level: character.level,
                }),
                Ok(None) => {}
                Err(e) => tracing::warn!(path = %path.display(), error = %e, "skipping unreadable save"),
            }
        }

        saves.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(saves)
    }
}

async fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), PersistError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }
    let content = serde_json::to_string_pretty(value)?;
    fs::write(path, content).await?;
    Ok(())
}

async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, PersistError> {
    let content = match fs::read_to_string(path).await {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    Ok(Some(serde_json::from_str(&content)?))
}
