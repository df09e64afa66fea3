//! Prose formatting engine.
//!
//! Pure functions only: text and a [`FormatConfig`] go in, new text comes
//! out. Nothing here touches the filesystem, logs, or fails.

mod engine;
mod segment;
mod split;
mod width;

pub use engine::format;
pub use segment::{segment, BoundaryStatistics, Paragraph};
pub use split::{split_by_columns, split_by_columns_at};
pub use width::{char_width, string_width, string_width_from};

use crate::config::FormatConfig;

const FULL_WIDTH_SPACE: char = '\u{3000}';

/// Indentation derived from a config: one repeated unit character plus the
/// first-line and continuation unit counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Indent {
    pub unit: char,
    pub first: usize,
    pub continuation: usize,
}

impl Indent {
    pub fn from_config(config: &FormatConfig) -> Self {
        let unit = if config.use_full_width_indent {
            FULL_WIDTH_SPACE
        } else {
            ' '
        };
        Self {
            unit,
            first: config.overall_indent.saturating_add(config.paragraph_indent),
            continuation: config.overall_indent,
        }
    }

    /// Number of leading unit characters on `line`.
    pub fn leading_units(&self, line: &str) -> usize {
        line.chars().take_while(|&c| c == self.unit).count()
    }

    pub fn render(&self, units: usize) -> String {
        std::iter::repeat(self.unit).take(units).collect()
    }

    /// Visual width of `units` indent characters.
    pub fn width(&self, units: usize) -> usize {
        units.saturating_mul(char_width(self.unit, 0, 1))
    }
}
