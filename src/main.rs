use anyhow::{Context, Result};
use clap::Parser;
use glob::Pattern;
use prosefmt::config::{self, clamp_count, AppConfig, SplitMode};
use prosefmt::files::{self, CheckReport, FileStatus};
use prosefmt::watch::{self, FileWatcher, Reformatter};
use simplelog::{ColorChoice, LevelFilter, TermLogger, TerminalMode};
use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::sync::mpsc;

/// Re-indent, re-space and hard-wrap prose paragraphs
#[derive(Parser)]
#[command(name = "prosefmt", version, about)]
struct Cli {
    /// Files, directories or glob patterns (reads stdin when empty)
    paths: Vec<String>,

    /// Rewrite files in place
    #[arg(short, long)]
    write: bool,

    /// Exit with status 1 if any file is not formatted; writes nothing
    #[arg(long, conflicts_with = "write")]
    check: bool,

    /// Print the --check report as JSON
    #[arg(long, requires = "check")]
    json: bool,

    /// Keep watching the paths and re-format files when they change
    #[arg(long, conflicts_with = "check")]
    watch: bool,

    /// Extra config file, applied over global and project config
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Print the effective configuration as TOML and exit
    #[arg(long)]
    print_config: bool,

    /// More log output (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(flatten)]
    overrides: FormatOverrides,
}

/// Per-run overrides of the [format] config section
#[derive(clap::Args, Debug, Default)]
struct FormatOverrides {
    /// Extra indent units on a paragraph's first line
    #[arg(long, allow_negative_numbers = true)]
    paragraph_indent: Option<i64>,
    /// Indent units on every line
    #[arg(long, allow_negative_numbers = true)]
    overall_indent: Option<i64>,
    /// Blank lines between paragraphs
    #[arg(long, allow_negative_numbers = true)]
    line_spacing: Option<i64>,
    /// Blank lines between lines of one paragraph
    #[arg(long, allow_negative_numbers = true)]
    intra_line_spacing: Option<i64>,
    /// How blank lines are judged as paragraph separators
    #[arg(long, value_enum)]
    split_mode: Option<SplitMode>,
    /// Hard-wrap at this many columns (implies --hard-wrap; 0 disables)
    #[arg(long, allow_negative_numbers = true)]
    line_char_limit: Option<i64>,
    /// Enable hard wrapping at the configured limit
    #[arg(long)]
    hard_wrap: bool,
    /// Indent with U+3000 instead of ASCII spaces
    #[arg(long)]
    full_width_indent: bool,
    /// Columns per tab stop
    #[arg(long, allow_negative_numbers = true)]
    tab_size: Option<i64>,
    /// Keep soft-wrapped source lines separate when hard wrapping
    #[arg(long)]
    no_merge: bool,
    /// Do not start a new paragraph at an indented line
    #[arg(long)]
    no_split_on_indent: bool,
}

impl FormatOverrides {
    fn apply(&self, config: &mut AppConfig) {
        let f = &mut config.format;
        if let Some(v) = self.paragraph_indent {
            f.paragraph_indent = clamp_count(v);
        }
        if let Some(v) = self.overall_indent {
            f.overall_indent = clamp_count(v);
        }
        if let Some(v) = self.line_spacing {
            f.line_spacing = clamp_count(v);
        }
        if let Some(v) = self.intra_line_spacing {
            f.intra_line_spacing = clamp_count(v);
        }
        if let Some(mode) = self.split_mode {
            f.paragraph_split_mode = mode;
        }
        if let Some(v) = self.line_char_limit {
            f.line_char_limit = clamp_count(v);
            f.hard_wrap_on_format = true;
        }
        if self.hard_wrap {
            f.hard_wrap_on_format = true;
        }
        if self.full_width_indent {
            f.use_full_width_indent = true;
        }
        if let Some(v) = self.tab_size {
            f.tab_size = clamp_count(v);
        }
        if self.no_merge {
            f.merge_soft_wrapped_lines = false;
        }
        if self.no_split_on_indent {
            f.paragraph_split_on_indented_line = false;
        }
        let sanitized = f.sanitized();
        config.format = sanitized;
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logger(cli.verbose);

    if cli.paths.is_empty() && (cli.watch || cli.write) {
        anyhow::bail!("--write and --watch need at least one path");
    }

    let cwd = std::env::current_dir().context("Cannot determine working directory")?;
    let mut config = config::load_config(&cwd, cli.config.as_deref())?;
    cli.overrides.apply(&mut config);

    if cli.print_config {
        print!("{}", toml::to_string_pretty(&config)?);
        return Ok(());
    }

    if cli.paths.is_empty() {
        return format_stdin(&cli, &config);
    }

    let patterns = files::compile_patterns(&config.watch.patterns);
    let targets = files::expand_targets(&cli.paths, &patterns)?;
    log::debug!("{} file(s) to process", targets.len());

    if cli.check {
        let mut report = CheckReport::default();
        for path in &targets {
            report.push(files::process_file(path, &config.format, false)?.report);
        }
        print_check_report(&report, cli.json)?;
        if !report.is_clean() {
            std::process::exit(1);
        }
        return Ok(());
    }

    let write = cli.write || cli.watch;
    let mut stdout = io::stdout().lock();
    for path in &targets {
        let outcome = files::process_file(path, &config.format, write)?;
        if !write {
            stdout.write_all(outcome.formatted.as_bytes())?;
        } else if outcome.report.status == FileStatus::Reformatted {
            eprintln!("formatted {}", outcome.report.path);
        }
    }
    drop(stdout);

    if cli.watch {
        watch_paths(&cli.paths, &config)?;
    }
    Ok(())
}

fn init_logger(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    };
    // only fails if a logger is already set
    let _ = TermLogger::init(
        level,
        simplelog::Config::default(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    );
}

fn format_stdin(cli: &Cli, config: &AppConfig) -> Result<()> {
    let mut input = String::new();
    io::stdin()
        .read_to_string(&mut input)
        .context("Failed to read stdin")?;
    let formatted = files::format_document(&input, &config.format);

    if cli.check {
        let status = if formatted == input {
            FileStatus::Unchanged
        } else {
            FileStatus::NeedsFormatting
        };
        let mut report = CheckReport::default();
        report.push(files::FileReport {
            path: "<stdin>".into(),
            status,
        });
        print_check_report(&report, cli.json)?;
        if !report.is_clean() {
            std::process::exit(1);
        }
        return Ok(());
    }

    io::stdout().write_all(formatted.as_bytes())?;
    Ok(())
}

fn print_check_report(report: &CheckReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }
    for file in &report.files {
        if file.status == FileStatus::NeedsFormatting {
            println!("{}", file.path);
        }
    }
    if !report.is_clean() {
        eprintln!(
            "{} file{} need{} formatting",
            report.unformatted,
            if report.unformatted == 1 { "" } else { "s" },
            if report.unformatted == 1 { "s" } else { "" },
        );
    }
    Ok(())
}

fn watch_paths(args: &[String], config: &AppConfig) -> Result<()> {
    let roots: Vec<PathBuf> = args
        .iter()
        .map(PathBuf::from)
        .filter(|p| p.exists())
        .collect();
    if roots.is_empty() {
        anyhow::bail!("Nothing to watch: glob patterns are not watched, pass files or directories");
    }

    let (tx, rx) = mpsc::channel();
    let _watcher = FileWatcher::new(&roots, config.watch.debounce_ms(), tx)?;
    eprintln!("watching {} path(s), Ctrl-C to stop", roots.len());

    // explicitly named files are formatted whatever their extension
    let mut patterns = files::compile_patterns(&config.watch.patterns);
    patterns.extend(
        roots
            .iter()
            .filter(|p| p.is_file())
            .filter_map(|p| p.file_name()?.to_str().map(Pattern::escape))
            .filter_map(|p| Pattern::new(&p).ok()),
    );
    let mut reformatter = Reformatter::new(config.format.clone(), patterns);
    watch::run(rx, &mut reformatter)
}
