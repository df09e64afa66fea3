//! Paragraph segmentation.
//!
//! Decides once per call whether blank lines separate paragraphs, then folds
//! the lines into a list of [`Paragraph`]s.

use super::Indent;
use crate::config::{FormatConfig, SplitMode};

/// Trimmed, non-blank lines of one paragraph. Never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paragraph {
    lines: Vec<String>,
}

impl Paragraph {
    fn new(lines: Vec<String>) -> Option<Self> {
        if lines.is_empty() {
            None
        } else {
            Some(Self { lines })
        }
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// All lines glued together with no separator.
    pub fn merged(&self) -> String {
        self.lines.concat()
    }
}

/// How consistently blank lines sit between consecutive non-blank lines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BoundaryStatistics {
    /// Transitions from one non-blank line to the next
    pub boundaries: usize,
    /// Boundaries with at least one blank line in between
    pub blank_separated: usize,
}

impl BoundaryStatistics {
    pub fn scan<'a>(lines: impl IntoIterator<Item = &'a str>) -> Self {
        let mut stats = Self::default();
        let mut seen_content = false;
        let mut saw_blank = false;
        for line in lines {
            if is_blank(line) {
                saw_blank = true;
                continue;
            }
            if seen_content {
                stats.boundaries += 1;
                if saw_blank {
                    stats.blank_separated += 1;
                }
            }
            seen_content = true;
            saw_blank = false;
        }
        stats
    }

    /// Whether blank lines count as paragraph separators under `mode`.
    ///
    /// Blank lines before the first or after the last non-blank line never
    /// sit between two lines, so they do not count.
    pub fn blank_lines_separate(&self, mode: SplitMode) -> bool {
        if self.blank_separated == 0 {
            return false;
        }
        match mode {
            SplitMode::AnyBlankLine => true,
            SplitMode::RequireAll => {
                self.boundaries > 0 && self.blank_separated == self.boundaries
            }
            // blank_separated / boundaries >= 0.6
            SplitMode::Majority => {
                self.boundaries > 0 && self.blank_separated * 5 >= self.boundaries * 3
            }
        }
    }
}

fn is_blank(line: &str) -> bool {
    line.trim().is_empty()
}

/// Split raw text into lines: CRLF and lone CR become LF, and a single final
/// line terminator does not produce a trailing blank line.
fn split_lines(text: &str) -> Vec<String> {
    let normalized = text.replace("\r\n", "\n").replace('\r', "\n");
    if normalized.is_empty() {
        return Vec::new();
    }
    let body = normalized.strip_suffix('\n').unwrap_or(&normalized);
    body.split('\n').map(str::to_string).collect()
}

/// Group `text` into paragraphs according to `config`.
pub fn segment(text: &str, config: &FormatConfig) -> Vec<Paragraph> {
    let lines = split_lines(text);
    let stats = BoundaryStatistics::scan(lines.iter().map(String::as_str));

    if !stats.blank_lines_separate(config.paragraph_split_mode) {
        return lines
            .iter()
            .filter(|l| !is_blank(l))
            .filter_map(|l| Paragraph::new(vec![l.trim().to_string()]))
            .collect();
    }

    lines
        .iter()
        .fold(Accumulator::new(config), |acc, line| acc.push(line))
        .finish()
}

/// Fold state for blank-line separated segmentation.
struct Accumulator {
    indent: Indent,
    split_on_indented_line: bool,
    line_spacing: usize,
    intra_line_spacing: usize,
    paragraphs: Vec<Paragraph>,
    current: Vec<String>,
    blank_run: usize,
}

impl Accumulator {
    fn new(config: &FormatConfig) -> Self {
        Self {
            indent: Indent::from_config(config),
            split_on_indented_line: config.paragraph_split_on_indented_line,
            line_spacing: config.line_spacing,
            intra_line_spacing: config.intra_line_spacing,
            paragraphs: Vec::new(),
            current: Vec::new(),
            blank_run: 0,
        }
    }

    fn push(mut self, line: &str) -> Self {
        if is_blank(line) {
            self.blank_run += 1;
            return self;
        }

        let leading = self.indent.leading_units(line);
        if self.blank_run > 0 && !self.is_intra_spacing(self.blank_run, leading) {
            self.flush();
        }
        self.blank_run = 0;

        if self.split_on_indented_line
            && self.indent.first > self.indent.continuation
            && leading >= self.indent.first
        {
            self.flush();
        }

        self.current.push(line.trim().to_string());
        self
    }

    /// A blank run is our own intra-paragraph spacing when the next line
    /// carries only the continuation indent and the run length matches
    /// `intra_line_spacing`. With `line_spacing = 0` paragraphs are never
    /// blank-separated, so one extra blank line is read as intra spacing too.
    fn is_intra_spacing(&self, run: usize, leading: usize) -> bool {
        if self.current.is_empty() || leading != self.indent.continuation {
            return false;
        }
        run == self.intra_line_spacing
            || (self.line_spacing == 0 && run == self.intra_line_spacing + 1)
    }

    fn flush(&mut self) {
        if let Some(paragraph) = Paragraph::new(std::mem::take(&mut self.current)) {
            self.paragraphs.push(paragraph);
        }
    }

    fn finish(mut self) -> Vec<Paragraph> {
        self.flush();
        self.paragraphs
    }
}
