use super::width::{char_width, string_width_from};

/// Cut `s` into the longest fragments that each fit within `max_columns`.
///
/// Never splits a code point; a single character wider than the budget gets
/// a fragment of its own. A budget of 0, or a string that already fits,
/// comes back as one fragment. Each fragment is measured from column 0.
pub fn split_by_columns(s: &str, max_columns: usize, tab_size: usize) -> Vec<String> {
    split_by_columns_at(s, max_columns, 0, tab_size)
}

/// Like [`split_by_columns`], for fragments that are each drawn starting at
/// `start_column` (after an indent), so tab stops land where they render.
pub fn split_by_columns_at(
    s: &str,
    max_columns: usize,
    start_column: usize,
    tab_size: usize,
) -> Vec<String> {
    if max_columns == 0 || string_width_from(s, start_column, tab_size) <= max_columns {
        return vec![s.to_string()];
    }

    let limit = start_column + max_columns;
    let mut fragments = Vec::new();
    let mut current = String::new();
    let mut column = start_column;

    for c in s.chars() {
        let w = char_width(c, column, tab_size);
        // zero-width marks always ride along with the previous character
        if w > 0 && column + w > limit && !current.is_empty() {
            fragments.push(std::mem::take(&mut current));
            column = start_column;
            current.push(c);
            column += char_width(c, start_column, tab_size);
        } else {
            current.push(c);
            column += w;
        }
    }
    if !current.is_empty() {
        fragments.push(current);
    }
    fragments
}
