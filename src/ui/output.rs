use crate::error::{GeoManifestError, UserFriendlyError};
use crate::extractor::RunReport;
use crate::ui::progress::format_duration;
use console::{style, Emoji, StyledObject, Term};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OutputMode {
    Human,
    Json,
    Plain,
}

static CHECKMARK: Emoji = Emoji("✅ ", "✓ ");
static CROSS: Emoji = Emoji("❌ ", "✗ ");
static INFO: Emoji = Emoji("ℹ️  ", "i ");
static WARNING: Emoji = Emoji("⚠️  ", "! ");
static ROCKET: Emoji = Emoji("🚀 ", "> ");
static GLOBE: Emoji = Emoji("🌐 ", "# ");

#[derive(Debug, Clone, Copy, PartialEq)]
enum Level {
    Success,
    Error,
    Warning,
    Info,
    Debug,
    Step,
    Suggestion,
}

impl Level {
    /// Minimum verbosity at which the level is shown. Errors always are.
    fn min_verbosity(self) -> Option<u8> {
        match self {
            Level::Error | Level::Suggestion => None,
            Level::Success | Level::Warning | Level::Step => Some(0),
            Level::Info => Some(1),
            Level::Debug => Some(2),
        }
    }

    fn label(self) -> &'static str {
        match self {
            Level::Success => "SUCCESS",
            Level::Error => "ERROR",
            Level::Warning => "WARNING",
            Level::Info => "INFO",
            Level::Debug => "DEBUG",
            Level::Step => "STEP",
            Level::Suggestion => "SUGGESTION",
        }
    }

    fn emoji(self) -> &'static Emoji<'static, 'static> {
        match self {
            Level::Success => &CHECKMARK,
            Level::Error => &CROSS,
            Level::Warning => &WARNING,
            Level::Info | Level::Suggestion | Level::Debug => &INFO,
            Level::Step => &ROCKET,
        }
    }

    fn paint(self, message: &str) -> StyledObject<&str> {
        match self {
            Level::Success => style(message).green().bold(),
            Level::Error => style(message).red().bold(),
            Level::Warning => style(message).yellow().bold(),
            Level::Info | Level::Suggestion => style(message).cyan(),
            Level::Debug => style(message).dim(),
            Level::Step => style(message).bold(),
        }
    }

    fn to_stderr(self) -> bool {
        matches!(self, Level::Error | Level::Suggestion)
    }
}

/// Writes user-facing messages in the selected output mode.
///
/// JSON mode emits one object per line; the run report is a single
/// pretty-printed object.
pub struct OutputFormatter {
    mode: OutputMode,
    use_colors: bool,
    verbose_level: u8,
    quiet: bool,
}

impl OutputFormatter {
    pub fn new(mode: OutputMode, verbose: u8, quiet: bool) -> Self {
        let use_colors =
            mode == OutputMode::Human && !quiet && Term::stdout().features().colors_supported();

        Self {
            mode,
            use_colors,
            verbose_level: if quiet { 0 } else { verbose },
            quiet,
        }
    }

    pub fn mode(&self) -> OutputMode {
        self.mode
    }

    pub fn success(&self, message: &str) {
        self.emit(Level::Success, message);
    }

    pub fn error(&self, message: &str) {
        self.emit(Level::Error, message);
    }

    pub fn warning(&self, message: &str) {
        self.emit(Level::Warning, message);
    }

    pub fn info(&self, message: &str) {
        self.emit(Level::Info, message);
    }

    pub fn debug(&self, message: &str) {
        self.emit(Level::Debug, message);
    }

    pub fn start_operation(&self, operation: &str) {
        self.emit(Level::Step, operation);
    }

    pub fn print_user_friendly_error(&self, error: &GeoManifestError) {
        self.error(&error.user_message());
        if let Some(suggestion) = error.suggestion() {
            self.emit(Level::Suggestion, &suggestion);
        }
    }

    pub fn print_run_report(&self, report: &RunReport) {
        match self.mode {
            OutputMode::Json => {
                let json = serde_json::to_string_pretty(report).unwrap_or_else(|_| "{}".to_string());
                println!("{}", json);
            }
            _ if self.quiet => {}
            OutputMode::Human => self.print_human_report(report),
            OutputMode::Plain => self.print_plain_report(report),
        }
    }

    pub fn print_separator(&self) {
        if self.quiet || self.mode == OutputMode::Json {
            return;
        }
        if self.use_colors {
            println!("{}", style("─".repeat(60)).dim());
        } else {
            println!("{}", "-".repeat(60));
        }
    }

    fn is_visible(&self, level: Level) -> bool {
        match level.min_verbosity() {
            None => true,
            Some(min) => !self.quiet && self.verbose_level >= min,
        }
    }

    fn emit(&self, level: Level, message: &str) {
        if !self.is_visible(level) {
            return;
        }

        let line = match self.mode {
            OutputMode::Json => serde_json::json!({
                "type": "message",
                "level": level.label().to_lowercase(),
                "message": message,
                "timestamp": chrono::Utc::now().to_rfc3339(),
            })
            .to_string(),
            OutputMode::Plain => format!("{}: {}", level.label(), message),
            OutputMode::Human if self.use_colors => {
                format!("{}{}", level.emoji(), level.paint(message))
            }
            OutputMode::Human => format!("{}{}", level.emoji(), message),
        };

        if level.to_stderr() {
            eprintln!("{}", line);
        } else {
            println!("{}", line);
        }
    }

    fn print_human_report(&self, report: &RunReport) {
        println!();
        if self.use_colors {
            println!("{}{}", GLOBE, style("Manifest Update").bold().cyan());
        } else {
            println!("=== Manifest Update ===");
        }
        println!();

        print!("{}", report.display_summary());
        println!();

        self.success(&format!(
            "Wrote {} names across {} manifest(s) in {}",
            report.total_names(),
            report.sources.len(),
            format_duration(report.duration)
        ));
        self.print_separator();
    }

    fn print_plain_report(&self, report: &RunReport) {
        println!("REPORT: Manifest update completed");
        for source in &report.sources {
            println!(
                "{}: {} names -> {}",
                source.name,
                source.stats.names_written,
                report
                    .output_directory
                    .join(source.manifest.file_name().unwrap_or_default())
                    .display()
            );
        }
        for skipped in &report.relocation.skipped {
            println!("Skipped: {}", skipped.display());
        }
        println!("Duration: {}", format_duration(report.duration));
    }
}
