use clap::{CommandFactory, Parser};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::Result;
use crate::models::{ProductCatalog, SegmentColumn, DEFAULT_WEEKLY_PRODUCT, DEFAULT_YEARLY_PRODUCT};

/// Largest accepted `--top-n`.
pub const MAX_TOP_N: u32 = 1000;

const CHART_FORMATS: [&str; 2] = ["svg", "png"];

// ── Settings (CLI) ─────────────────────────────────────────────────────────────

/// Lifetime value analytics for subscription exports
#[derive(Parser, Debug, Clone)]
#[command(
    name = "subscription-ltv",
    about = "Lifetime value analytics for subscription exports",
    version
)]
pub struct Settings {
    /// Subscription export (CSV file, or a directory of CSV files)
    #[arg(short, long, default_value = "subscriptions.csv")]
    pub input: PathBuf,

    /// Product identifier of the yearly subscription
    #[arg(long, default_value = DEFAULT_YEARLY_PRODUCT)]
    pub yearly_product: String,

    /// Product identifier of the weekly subscription
    #[arg(long, default_value = DEFAULT_WEEKLY_PRODUCT)]
    pub weekly_product: String,

    /// Column used for the distribution report and LTV charts
    #[arg(long, default_value = "ip_country", value_parser = ["status", "product", "ip_country"])]
    pub segment_column: String,

    /// Number of top segments used for country LTV and charts
    #[arg(long, default_value = "10", value_parser = clap::value_parser!(u32).range(1..=i64::from(MAX_TOP_N)))]
    pub top_n: u32,

    /// Directory charts are written to
    #[arg(long, default_value = "charts")]
    pub output_dir: PathBuf,

    /// Chart file format
    #[arg(long, default_value = "svg", value_parser = CHART_FORMATS)]
    pub chart_format: String,

    /// Skip chart rendering
    #[arg(long)]
    pub no_charts: bool,

    /// Timezone used to display dates (auto-detected if not specified)
    #[arg(long, default_value = "auto")]
    pub timezone: String,

    /// Also write the computed report as JSON to this path
    #[arg(long)]
    pub report_json: Option<PathBuf>,

    /// Drop invalid rows with a warning instead of failing
    #[arg(long)]
    pub skip_invalid: bool,

    /// Logging level
    #[arg(long, default_value = "INFO", value_parser = ["DEBUG", "INFO", "WARNING", "ERROR"])]
    pub log_level: String,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,

    /// Clear saved configuration
    #[arg(long)]
    pub clear: bool,
}

// ── LastUsedParams ─────────────────────────────────────────────────────────────

/// Persisted last-used parameters saved to `~/.subscription-ltv/last_used.json`.
#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq)]
pub struct LastUsedParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub yearly_product: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weekly_product: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub segment_column: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_n: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chart_format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
}

impl LastUsedParams {
    /// Default path of the persisted config file.
    pub fn config_path() -> PathBuf {
        Self::config_path_in(&dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")))
    }

    /// Config path rooted at `base_dir`.
    pub fn config_path_in(base_dir: &std::path::Path) -> PathBuf {
        base_dir.join(".subscription-ltv").join("last_used.json")
    }

    /// Load persisted params from an explicit path.
    /// Returns `Default` when the file is absent or cannot be parsed.
    pub fn load_from(path: &std::path::Path) -> Self {
        let Ok(content) = std::fs::read_to_string(path) else {
            return Self::default();
        };
        serde_json::from_str(&content).unwrap_or_default()
    }

    /// Atomically write params to `path`, creating parent directories if
    /// needed.
    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(self)?;

        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, &json)?;
        std::fs::rename(&tmp, path)?;

        Ok(())
    }

    /// Delete the config file at `path` if it exists.
    pub fn clear_at(path: &std::path::Path) -> Result<()> {
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        Ok(())
    }
}

// ── Settings impl ──────────────────────────────────────────────────────────────

impl Settings {
    /// Parse CLI arguments and merge with last-used params where no explicit
    /// CLI value was provided, then persist the result.
    pub fn load_with_last_used() -> Self {
        Self::load_with_last_used_impl(
            std::env::args_os().collect(),
            &LastUsedParams::config_path(),
        )
    }

    /// Same as [`Settings::load_with_last_used`] with an explicit argument
    /// list and config path.
    pub fn load_with_last_used_impl(
        args: Vec<std::ffi::OsString>,
        config_path: &std::path::Path,
    ) -> Self {
        let matches = Settings::command().get_matches_from(args.clone());
        let mut settings = Settings::parse_from(args);

        if settings.clear {
            if let Err(e) = LastUsedParams::clear_at(config_path) {
                tracing::warn!("Could not clear {}: {}", config_path.display(), e);
            }
            return settings.apply_debug_flag();
        }

        let last = LastUsedParams::load_from(config_path);

        // CLI always wins over persisted values. Field ids use underscores.
        if !is_arg_explicitly_set(&matches, "yearly_product") {
            if let Some(v) = last.yearly_product {
                settings.yearly_product = v;
            }
        }
        if !is_arg_explicitly_set(&matches, "weekly_product") {
            if let Some(v) = last.weekly_product {
                settings.weekly_product = v;
            }
        }
        if !is_arg_explicitly_set(&matches, "segment_column") {
            if let Some(v) = last
                .segment_column
                .filter(|v| v.parse::<SegmentColumn>().is_ok())
            {
                settings.segment_column = v;
            }
        }
        if !is_arg_explicitly_set(&matches, "top_n") {
            if let Some(v) = last.top_n.filter(|n| (1..=MAX_TOP_N).contains(n)) {
                settings.top_n = v;
            }
        }
        if !is_arg_explicitly_set(&matches, "output_dir") {
            if let Some(v) = last.output_dir {
                settings.output_dir = v;
            }
        }
        if !is_arg_explicitly_set(&matches, "chart_format") {
            if let Some(v) = last
                .chart_format
                .filter(|v| CHART_FORMATS.contains(&v.as_str()))
            {
                settings.chart_format = v;
            }
        }
        if !is_arg_explicitly_set(&matches, "timezone") {
            if let Some(v) = last.timezone {
                settings.timezone = v;
            }
        }

        let params = LastUsedParams::from(&settings);
        if let Err(e) = params.save_to(config_path) {
            tracing::debug!("Could not persist last-used params: {}", e);
        }

        settings.apply_debug_flag()
    }

    /// The product catalog described by the product flags.
    pub fn catalog(&self) -> ProductCatalog {
        ProductCatalog::new(self.yearly_product.clone(), self.weekly_product.clone())
    }

    /// The configured segment column.
    pub fn segment(&self) -> Result<SegmentColumn> {
        self.segment_column.parse()
    }

    /// `--debug` overrides the log level.
    fn apply_debug_flag(mut self) -> Self {
        if self.debug {
            self.log_level = "DEBUG".to_string();
        }
        self
    }
}

// ── Conversion ─────────────────────────────────────────────────────────────────

impl From<&Settings> for LastUsedParams {
    fn from(s: &Settings) -> Self {
        LastUsedParams {
            yearly_product: Some(s.yearly_product.clone()),
            weekly_product: Some(s.weekly_product.clone()),
            segment_column: Some(s.segment_column.clone()),
            top_n: Some(s.top_n),
            output_dir: Some(s.output_dir.clone()),
            chart_format: Some(s.chart_format.clone()),
            timezone: Some(s.timezone.clone()),
        }
    }
}

/// Returns `true` when `name` was supplied explicitly on the command line
/// (not via default value or environment variable).
fn is_arg_explicitly_set(matches: &clap::ArgMatches, name: &str) -> bool {
    matches.value_source(name) == Some(clap::parser::ValueSource::CommandLine)
}

// ── Tests ──────────────────────────────────────────────────────────────────────
