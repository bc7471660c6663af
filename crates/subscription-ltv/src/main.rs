mod bootstrap;

use anyhow::{Context, Result};
use ltv_core::settings::Settings;
use ltv_core::time_utils::resolve_timezone;
use ltv_data::analysis::{analyze, AnalysisOptions};
use ltv_report::charts::{render_profile_charts, ChartFormat};
use ltv_report::console::{has_completed_users, render_report};
use ltv_report::export::write_json_report;

fn main() -> Result<()> {
    let settings = Settings::load_with_last_used();

    bootstrap::setup_logging(&settings.log_level)?;

    tracing::info!("subscription-ltv v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        "Input: {}, segment: {}, top: {}",
        settings.input.display(),
        settings.segment_column,
        settings.top_n
    );

    let tz = resolve_timezone(&settings.timezone);
    let chart_format: ChartFormat = settings.chart_format.parse()?;

    let options = AnalysisOptions {
        input: settings.input.clone(),
        catalog: settings.catalog(),
        segment_column: settings.segment()?,
        top_n: settings.top_n as usize,
        skip_invalid: settings.skip_invalid,
    };

    let result = analyze(&options)
        .with_context(|| format!("Failed to analyse {}", settings.input.display()))?;

    if !has_completed_users(&result.sampling) {
        tracing::warn!("No completed users in the export; lifetimes and LTV are undefined");
    }

    println!("{}", render_report(&result, tz));

    if settings.no_charts {
        tracing::info!("Chart rendering disabled");
    } else {
        let written = render_profile_charts(
            &result.ltv_profiles,
            options.segment_column,
            &settings.output_dir,
            chart_format,
        )?;
        for path in &written {
            tracing::debug!("Chart written to {}", path.display());
        }
    }

    if let Some(path) = &settings.report_json {
        write_json_report(&result, path)
            .with_context(|| format!("Failed to write {}", path.display()))?;
    }

    tracing::info!(
        "Done in {:.3}s",
        result.metadata.load_time_seconds + result.metadata.compute_time_seconds
    );
    Ok(())
}
