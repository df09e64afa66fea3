//! Visual column width of mixed-width text.
//!
//! East Asian wide characters and emoji presentation take two columns,
//! combining and zero-width marks take none, tabs advance to the next tab
//! stop. Everything else follows `unicode-width`.

use unicode_width::UnicodeWidthChar;

/// Columns `c` occupies when drawn at `column`.
///
/// `tab_size` of 0 is treated as 1.
pub fn char_width(c: char, column: usize, tab_size: usize) -> usize {
    if c == '\t' {
        let tab = tab_size.max(1);
        return tab - column % tab;
    }
    match c {
        // soft hyphen only shows up at a line break
        '\u{00AD}' => 0,
        _ => UnicodeWidthChar::width(c).unwrap_or(0),
    }
}

/// Width of `s` when it starts at `column`.
pub fn string_width_from(s: &str, column: usize, tab_size: usize) -> usize {
    s.chars()
        .fold(column, |col, c| col + char_width(c, col, tab_size))
        - column
}

/// Total visual width of `s`, starting at column 0.
pub fn string_width(s: &str, tab_size: usize) -> usize {
    string_width_from(s, 0, tab_size)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ascii_is_one_column() {
        assert_eq!(string_width("ab", 4), 2);
        assert_eq!(char_width('z', 7, 4), 1);
    }

    #[test]
    fn cjk_is_two_columns() {
        assert_eq!(string_width("中文", 4), 4);
        assert_eq!(string_width("한국어", 4), 6);
        assert_eq!(string_width("ｆｕｌｌ", 4), 8);
    }

    #[test]
    fn ideographic_space_is_wide() {
        assert_eq!(char_width('\u{3000}', 0, 4), 2);
    }

    #[test]
    fn tab_advances_to_next_stop() {
        // 'a' ends at column 1, tab fills to 4, 'b' lands at 4
        assert_eq!(string_width("a\tb", 4), 5);
        assert_eq!(string_width("\t", 4), 4);
        assert_eq!(string_width("abcd\t", 4), 8);
        assert_eq!(string_width("ab\t", 8), 8);
    }

    #[test]
    fn zero_tab_size_behaves_like_one() {
        assert_eq!(char_width('\t', 3, 0), 1);
    }

    #[test]
    fn combining_marks_are_zero_width() {
        assert_eq!(string_width("e\u{0301}", 4), 1);
        assert_eq!(string_width("a\u{200D}b", 4), 2);
        assert_eq!(string_width("soft\u{00AD}hyphen", 4), 10);
        assert_eq!(string_width("\u{FE0F}", 4), 0);
    }

    #[test]
    fn emoji_and_astral_cjk_are_wide() {
        assert_eq!(string_width("😀", 4), 2);
        assert_eq!(string_width("🚀", 4), 2);
        assert_eq!(string_width("𠀀", 4), 2);
    }

    #[test]
    fn empty_string_has_zero_width() {
        assert_eq!(string_width("", 4), 0);
    }

    #[test]
    fn emoji_presentation_symbols_are_wide() {
        for c in ['\u{26A1}', '\u{231A}', '\u{2614}', '\u{2B50}'] {
            assert_eq!(char_width(c, 0, 4), 2, "U+{:04X}", c as u32);
        }
    }

    #[test]
    fn non_latin_combining_marks_are_zero_width() {
        // Thai mai han-akat, Hebrew sheva
        assert_eq!(string_width("\u{0E01}\u{0E31}", 4), 1);
        assert_eq!(string_width("\u{05D1}\u{05B0}", 4), 1);
    }

    #[test]
    fn tab_width_depends_on_start_column() {
        assert_eq!(string_width_from("\tx", 2, 4), 3);
        assert_eq!(string_width_from("\tx", 4, 4), 5);
        assert_eq!(string_width_from("ab", 7, 4), 2);
    }
}
