use super::segment::{segment, Paragraph};
use super::split::split_by_columns_at;
use super::width::string_width_from;
use super::Indent;
use crate::config::FormatConfig;

/// Reformat `text` under `config` and return the replacement text.
///
/// Paragraphs are re-indented, optionally merged and hard-wrapped, then
/// joined with `line_spacing` blank lines between paragraphs and
/// `intra_line_spacing` blank lines between lines of one paragraph.
/// Never fails; out-of-range settings are clamped.
pub fn format(text: &str, config: &FormatConfig) -> String {
    let config = config.sanitized();
    let layout = Layout::new(&config);

    let paragraph_sep = "\n".repeat(config.line_spacing.saturating_add(1));
    let line_sep = "\n".repeat(config.intra_line_spacing.saturating_add(1));

    segment(text, &config)
        .iter()
        .map(|paragraph| layout.paragraph(paragraph).join(&line_sep))
        .collect::<Vec<_>>()
        .join(&paragraph_sep)
}

/// Per-call layout settings derived from the config.
struct Layout {
    indent: Indent,
    merge: bool,
    /// 0 when hard wrapping is off
    limit: usize,
    tab_size: usize,
}

impl Layout {
    fn new(config: &FormatConfig) -> Self {
        Self {
            indent: Indent::from_config(config),
            merge: config.hard_wrap_on_format && config.merge_soft_wrapped_lines,
            limit: if config.hard_wrap_on_format {
                config.line_char_limit
            } else {
                0
            },
            tab_size: config.tab_size,
        }
    }

    /// Output lines of one paragraph, indent included.
    fn paragraph(&self, paragraph: &Paragraph) -> Vec<String> {
        let merged;
        let lines: Vec<&str> = if self.merge {
            merged = paragraph.merged();
            vec![merged.as_str()]
        } else {
            paragraph.lines().iter().map(String::as_str).collect()
        };

        let mut out = Vec::with_capacity(lines.len());
        for (i, content) in lines.into_iter().enumerate() {
            let units = if i == 0 {
                self.indent.first
            } else {
                self.indent.continuation
            };
            self.wrap_line(content, units, &mut out);
        }
        out
    }

    /// Emit `content` indented by `units`, hard-wrapping onto continuation
    /// lines when it overflows the limit.
    fn wrap_line(&self, content: &str, units: usize, out: &mut Vec<String>) {
        let start = self.indent.width(units);
        let budget = self.limit.saturating_sub(start);
        if self.limit == 0 || string_width_from(content, start, self.tab_size) <= budget {
            out.push(self.indented(units, content));
            return;
        }

        let mut fragments = split_by_columns_at(content, budget, start, self.tab_size).into_iter();
        let head = fragments.next().unwrap_or_default();
        out.push(self.indented(units, &head));

        let rest: String = fragments.collect();
        if rest.is_empty() {
            return;
        }
        let continuation = self.indent.continuation;
        let start = self.indent.width(continuation);
        let budget = self.limit.saturating_sub(start);
        for fragment in split_by_columns_at(&rest, budget, start, self.tab_size) {
            out.push(self.indented(continuation, &fragment));
        }
    }

    fn indented(&self, units: usize, content: &str) -> String {
        let mut line = self.indent.render(units);
        line.push_str(content);
        line
    }
}
