//! Paragraph, indentation and hard-wrap formatter for mixed Chinese/English prose.

pub mod config;
pub mod files;
pub mod format;
pub mod watch;

pub use config::{AppConfig, FormatConfig, SplitMode, WatchConfig};
pub use format::format;
