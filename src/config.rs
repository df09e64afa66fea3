use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use std::path::{Path, PathBuf};

/// File name of the per-project config, looked up in the working directory.
pub const LOCAL_CONFIG: &str = ".prosefmt.toml";

/// Counts are capped here so every value stays representable in TOML.
const MAX_COUNT: i64 = u32::MAX as i64;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub format: FormatConfig,
    #[serde(default)]
    pub watch: WatchConfig,
}

/// How blank lines are judged as paragraph separators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum SplitMode {
    /// Any blank line in the text makes blank lines the separator
    #[default]
    AnyBlankLine,
    /// Every boundary between lines must be blank-separated
    RequireAll,
    /// At least 60% of boundaries must be blank-separated
    Majority,
}

/// [format] section: everything the engine needs for one pass.
///
/// Counts are in indent units or lines. Negative or NaN values in a config
/// file are clamped to 0 instead of being rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormatConfig {
    #[serde(default = "default_paragraph_indent", deserialize_with = "clamped")]
    pub paragraph_indent: usize,
    #[serde(default, deserialize_with = "clamped")]
    pub overall_indent: usize,
    #[serde(default = "default_line_spacing", deserialize_with = "clamped")]
    pub line_spacing: usize,
    #[serde(default, deserialize_with = "clamped")]
    pub intra_line_spacing: usize,
    #[serde(default)]
    pub paragraph_split_mode: SplitMode,
    #[serde(default = "default_true")]
    pub paragraph_split_on_indented_line: bool,
    #[serde(default = "default_true")]
    pub merge_soft_wrapped_lines: bool,
    #[serde(default)]
    pub hard_wrap_on_format: bool,
    #[serde(default)]
    pub use_full_width_indent: bool,
    /// 0 disables hard wrapping
    #[serde(default, deserialize_with = "clamped")]
    pub line_char_limit: usize,
    #[serde(default = "default_tab_size", deserialize_with = "clamped")]
    pub tab_size: usize,
}

/// [watch] section configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchConfig {
    /// Debounce window for file events, in milliseconds
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    /// Glob patterns (matched against file names) of files to format
    #[serde(default = "default_patterns")]
    pub patterns: Vec<String>,
}

fn default_true() -> bool {
    true
}

fn default_paragraph_indent() -> usize {
    2
}

fn default_line_spacing() -> usize {
    1
}

fn default_tab_size() -> usize {
    4
}

fn default_debounce_ms() -> u64 {
    300
}

fn default_patterns() -> Vec<String> {
    vec!["*.txt".into(), "*.md".into()]
}

impl Default for FormatConfig {
    fn default() -> Self {
        Self {
            paragraph_indent: default_paragraph_indent(),
            overall_indent: 0,
            line_spacing: default_line_spacing(),
            intra_line_spacing: 0,
            paragraph_split_mode: SplitMode::default(),
            paragraph_split_on_indented_line: true,
            merge_soft_wrapped_lines: true,
            hard_wrap_on_format: false,
            use_full_width_indent: false,
            line_char_limit: 0,
            tab_size: default_tab_size(),
        }
    }
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            patterns: default_patterns(),
        }
    }
}

impl FormatConfig {
    /// Copy with every field forced into its valid range.
    pub fn sanitized(&self) -> Self {
        Self {
            tab_size: self.tab_size.max(1),
            ..self.clone()
        }
    }
}

impl WatchConfig {
    /// Debounce window clamped into 200..=500 ms.
    pub fn debounce_ms(&self) -> u64 {
        self.debounce_ms.clamp(200, 500)
    }
}

/// Clamp a possibly negative count from the command line or a config file.
pub fn clamp_count(value: i64) -> usize {
    // non-negative and capped, so the cast is lossless
    value.clamp(0, MAX_COUNT) as usize
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Number {
    Int(i64),
    Float(f64),
}

fn clamped<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<usize, D::Error> {
    Ok(match Number::deserialize(deserializer)? {
        Number::Int(n) => clamp_count(n),
        // NaN.max(0.0) is 0.0; float-to-int casts saturate
        Number::Float(f) => clamp_count(f.max(0.0).min(MAX_COUNT as f64) as i64),
    })
}

/// Load config by merging global defaults with project and explicit overrides.
/// Priority: `--config` file > project `.prosefmt.toml` > global
/// `~/.config/prosefmt/config.toml` > built-in defaults.
/// Merging is deep: individual keys within `[format]` override independently.
pub fn load_config(project_dir: &Path, explicit: Option<&Path>) -> Result<AppConfig> {
    let global = dirs::config_dir().map(|d| d.join("prosefmt/config.toml"));
    load_layers(global.as_deref(), project_dir, explicit)
}

pub(crate) fn load_layers(
    global: Option<&Path>,
    project_dir: &Path,
    explicit: Option<&Path>,
) -> Result<AppConfig> {
    let local_path: PathBuf = project_dir.join(LOCAL_CONFIG);

    let mut merged = toml::Table::new();
    for path in global.into_iter().chain(std::iter::once(local_path.as_path())) {
        if let Some(table) = read_optional_table(path) {
            deep_merge(&mut merged, table);
        }
    }

    if let Some(path) = explicit {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let table = toml::from_str::<toml::Table>(&content)
            .with_context(|| format!("Failed to parse config {}", path.display()))?;
        deep_merge(&mut merged, table);
    }

    if merged.is_empty() {
        return Ok(AppConfig::default());
    }

    drop_invalid_keys::<FormatConfig>(&mut merged, "format");
    drop_invalid_keys::<WatchConfig>(&mut merged, "watch");

    match toml::Value::Table(merged).try_into::<AppConfig>() {
        Ok(config) => Ok(config),
        Err(e) => {
            log::warn!("Invalid configuration, using defaults: {}", e);
            Ok(AppConfig::default())
        }
    }
}

/// Remove keys of `[section]` whose value does not deserialize, so each one
/// falls back to its own default and the rest of the section still applies.
fn drop_invalid_keys<T: DeserializeOwned>(merged: &mut toml::Table, section: &str) {
    match merged.get(section) {
        None | Some(toml::Value::Table(_)) => {}
        Some(_) => {
            log::warn!("Ignoring [{}]: expected a table", section);
            merged.remove(section);
        }
    }
    let Some(toml::Value::Table(table)) = merged.get_mut(section) else {
        return;
    };

    let invalid: Vec<String> = table
        .iter()
        .filter_map(|(key, value)| {
            let mut single = toml::Table::new();
            single.insert(key.clone(), value.clone());
            match toml::Value::Table(single).try_into::<T>() {
                Ok(_) => None,
                Err(e) => {
                    log::warn!("Ignoring invalid {}.{}: {}", section, key, e);
                    Some(key.clone())
                }
            }
        })
        .collect();
    for key in invalid {
        table.remove(&key);
    }
}

/// Read a config layer that may legitimately be absent. Parse errors are
/// logged and the layer skipped.
fn read_optional_table(path: &Path) -> Option<toml::Table> {
    let content = std::fs::read_to_string(path).ok()?;
    match toml::from_str::<toml::Table>(&content) {
        Ok(table) => {
            log::debug!("Loaded config layer {}", path.display());
            Some(table)
        }
        Err(e) => {
            log::warn!("Skipping unparseable config {}: {}", path.display(), e);
            None
        }
    }
}

/// Recursively merge `overlay` into `base`. Overlay values win; nested tables are merged recursively.
fn deep_merge(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        match (base.get_mut(&key), value) {
            (Some(toml::Value::Table(base_table)), toml::Value::Table(overlay_table)) => {
                deep_merge(base_table, overlay_table);
            }
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn parse(src: &str) -> AppConfig {
        toml::from_str(src).unwrap()
    }

    #[test]
    fn empty_document_uses_defaults() {
        let config = parse("");
        assert_eq!(config.format, FormatConfig::default());
        assert_eq!(config.format.paragraph_indent, 2);
        assert_eq!(config.format.line_spacing, 1);
        assert_eq!(config.format.tab_size, 4);
        assert!(config.format.paragraph_split_on_indented_line);
        assert!(config.format.merge_soft_wrapped_lines);
        assert!(!config.format.hard_wrap_on_format);
        assert_eq!(config.watch.debounce_ms, 300);
    }

    #[test]
    fn partial_section_keeps_other_defaults() {
        let config = parse("[format]\nline_spacing = 0\nparagraph_split_mode = \"majority\"\n");
        assert_eq!(config.format.line_spacing, 0);
        assert_eq!(config.format.paragraph_split_mode, SplitMode::Majority);
        assert_eq!(config.format.paragraph_indent, 2);
    }

    #[test]
    fn negative_and_nan_counts_clamp_to_zero() {
        let config = parse("[format]\nparagraph_indent = -3\nline_char_limit = nan\noverall_indent = 2.7\n");
        assert_eq!(config.format.paragraph_indent, 0);
        assert_eq!(config.format.line_char_limit, 0);
        assert_eq!(config.format.overall_indent, 2);
    }

    #[test]
    fn zero_tab_size_is_sanitized_to_one() {
        let config = parse("[format]\ntab_size = 0\n");
        assert_eq!(config.format.tab_size, 0);
        assert_eq!(config.format.sanitized().tab_size, 1);
    }

    #[test]
    fn huge_counts_are_capped() {
        let config = parse("[format]\nline_char_limit = 1e300\n");
        assert_eq!(config.format.line_char_limit, u32::MAX as usize);
    }

    #[test]
    fn debounce_is_clamped() {
        let mut watch = WatchConfig::default();
        watch.debounce_ms = 10;
        assert_eq!(watch.debounce_ms(), 200);
        watch.debounce_ms = 10_000;
        assert_eq!(watch.debounce_ms(), 500);
    }

    #[test]
    fn clamp_count_handles_negatives() {
        assert_eq!(clamp_count(-1), 0);
        assert_eq!(clamp_count(7), 7);
    }

    #[test]
    fn layers_merge_key_by_key() {
        let dir = tempfile::tempdir().unwrap();
        let global = dir.path().join("global.toml");
        fs::write(&global, "[format]\nparagraph_indent = 4\nline_spacing = 2\n").unwrap();
        fs::write(dir.path().join(LOCAL_CONFIG), "[format]\nline_spacing = 0\n").unwrap();

        let config = load_layers(Some(&global), dir.path(), None).unwrap();
        assert_eq!(config.format.paragraph_indent, 4);
        assert_eq!(config.format.line_spacing, 0);
    }

    #[test]
    fn explicit_config_wins() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(LOCAL_CONFIG), "[format]\ntab_size = 8\n").unwrap();
        let explicit = dir.path().join("custom.toml");
        fs::write(&explicit, "[format]\ntab_size = 2\n[watch]\npatterns = [\"*.novel\"]\n").unwrap();

        let config = load_layers(None, dir.path(), Some(&explicit)).unwrap();
        assert_eq!(config.format.tab_size, 2);
        assert_eq!(config.watch.patterns, vec!["*.novel".to_string()]);
    }

    #[test]
    fn invalid_key_falls_back_alone() {
        let dir = tempfile::tempdir().unwrap();
        let explicit = dir.path().join("custom.toml");
        fs::write(
            &explicit,
            "[format]\nline_spacing = 0\nparagraph_indent = 3\nparagraph_split_mode = \"bogus\"\n\
             [watch]\ndebounce_ms = \"soon\"\npatterns = [\"*.novel\"]\n",
        )
        .unwrap();

        let config = load_layers(None, dir.path(), Some(&explicit)).unwrap();
        assert_eq!(config.format.line_spacing, 0);
        assert_eq!(config.format.paragraph_indent, 3);
        assert_eq!(config.format.paragraph_split_mode, SplitMode::AnyBlankLine);
        assert_eq!(config.watch.debounce_ms, 300);
        assert_eq!(config.watch.patterns, vec!["*.novel".to_string()]);
    }

    #[test]
    fn non_table_section_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(LOCAL_CONFIG), "format = 3
[watch]
debounce_ms = 250
").unwrap();
        let config = load_layers(None, dir.path(), None).unwrap();
        assert_eq!(config.format, FormatConfig::default());
        assert_eq!(config.watch.debounce_ms, 250);
    }

    #[test]
    fn missing_explicit_config_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        assert!(load_layers(None, dir.path(), Some(&missing)).is_err());
    }

    #[test]
    fn broken_project_config_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(LOCAL_CONFIG), "[format\nthis is not toml").unwrap();
        let config = load_layers(None, dir.path(), None).unwrap();
        assert_eq!(config.format, FormatConfig::default());
    }

    #[test]
    fn effective_config_round_trips_through_toml() {
        let config = AppConfig::default();
        let text = toml::to_string_pretty(&config).unwrap();
        assert!(text.contains("paragraph_split_mode = \"any_blank_line\""));
        let back: AppConfig = toml::from_str(&text).unwrap();
        assert_eq!(back.format, config.format);
    }
}
