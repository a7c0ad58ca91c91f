//! Resolved vault layout settings.
//!
//! These are created from the user-facing TOML sections via `From` and are
//! what `vault-tidy-resources` consumes.

use serde::{Deserialize, Serialize};

use super::settings::Settings;

/// Name of the folder that holds note attachments.
pub const DEFAULT_RESOURCES_DIR: &str = "_resources";

/// Extension (without the dot) that marks a file as a note.
pub const DEFAULT_NOTE_EXTENSION: &str = "md";

/// Read buffer size used when fingerprinting resources.
pub const DEFAULT_HASH_CHUNK_SIZE: usize = 64 * 1024;

/// Resolved layout settings (all values filled with defaults).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutSettings {
    #[serde(default = "default_resources_dir")]
    pub resources_dir: String,
    #[serde(default = "default_note_extension")]
    pub note_extension: String,
    #[serde(default = "default_hash_chunk_size")]
    pub hash_chunk_size: usize,
}

impl Default for LayoutSettings {
    fn default() -> Self {
        Self {
            resources_dir: default_resources_dir(),
            note_extension: default_note_extension(),
            hash_chunk_size: default_hash_chunk_size(),
        }
    }
}

impl LayoutSettings {
    /// Whether `extension` (as returned by `Path::extension`) marks a note.
    pub fn is_note_extension(&self, extension: &str) -> bool {
        extension.eq_ignore_ascii_case(&self.note_extension)
    }
}

fn default_resources_dir() -> String {
    DEFAULT_RESOURCES_DIR.to_string()
}

fn default_note_extension() -> String {
    DEFAULT_NOTE_EXTENSION.to_string()
}

fn default_hash_chunk_size() -> usize {
    DEFAULT_HASH_CHUNK_SIZE
}

impl From<&Settings> for LayoutSettings {
    fn from(value: &Settings) -> Self {
        let mut layout = LayoutSettings::default();
        if let Some(dir) = &value.layout.resources_dir {
            let dir = dir.trim().trim_matches('/');
            if !dir.is_empty() {
                layout.resources_dir = dir.to_string();
            }
        }
        if let Some(extension) = &value.layout.note_extension {
            let extension = extension.trim().trim_start_matches('.');
            if !extension.is_empty() {
                layout.note_extension = extension.to_string();
            }
        }
        if let Some(chunk_size) = value.hashing.chunk_size.filter(|size| *size > 0) {
            layout.hash_chunk_size = chunk_size;
        }
        layout
    }
}
