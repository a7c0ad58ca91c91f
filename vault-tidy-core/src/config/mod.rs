//! Configuration management for vault-tidy.
//!
//! Settings are non-sensitive and live in a TOML file. The engine itself only
//! ever sees the resolved [`LayoutSettings`], which has every value filled in.
//!
//! # Configuration Sources
//!
//! ## Environment
//! - `VAULT_TIDY_CONFIG_DIR` - directory holding `config.toml` (overrides XDG)
//! - `RUST_LOG` - tracing filter, takes precedence over `[logging] level`
//!
//! ## Settings (TOML File)
//! Located at `~/.config/vault-tidy/config.toml`:
//! ```toml
//! [layout]
//! resources_dir = "_resources"
//! note_extension = "md"
//!
//! [hashing]
//! chunk_size = 65536
//!
//! [logging]
//! level = "info"
//! ```

pub mod layout;
mod settings;

pub use layout::LayoutSettings;
pub use settings::{HashingSettings, LayoutSection, LoggingSettings, Settings, SettingsError};

/// Load a `.env` file from the working directory if one exists.
pub fn load_dotenv() {
    let _ = dotenvy::dotenv();
}
