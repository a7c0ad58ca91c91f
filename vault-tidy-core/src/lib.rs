pub mod config;

// Config re-exports
pub use config::{
    HashingSettings,
    LayoutSection,
    LayoutSettings,
    LoggingSettings,
    Settings,
    SettingsError,
    load_dotenv,
};
