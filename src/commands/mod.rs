pub mod apply;
pub mod plan;
pub mod validate;

use crate::Context;
use crate::cli::TargetArgs;
use crate::config::{self, Batch};
use crate::engine::ValidationReport;
use crate::ui;
use anyhow::{Result, bail};
use realmkit::HttpBackend;

/// Load the definitions named by `args` and report what was found
pub(crate) fn load(ctx: &Context, args: &TargetArgs) -> Result<Batch> {
    let batch = config::load_batch(&args.paths)?;
    if batch.sources.is_empty() {
        bail!("No definition files found");
    }
    if !ctx.quiet {
        ui::info(&format!(
            "Loaded {} ({}) from {}",
            ui::plural(batch.realms.len(), "realm"),
            ui::plural(batch.flow_count(), "flow"),
            ui::plural(batch.sources.len(), "file")
        ));
    }
    Ok(batch)
}

pub(crate) fn connect(args: &TargetArgs) -> HttpBackend {
    log::debug!("Connecting to {}", args.url);
    HttpBackend::new(args.url.as_str(), &args.token)
}

/// Print validation findings, errors first
pub(crate) fn print_report(report: &ValidationReport) {
    for issue in &report.errors {
        ui::error(&issue.to_string());
    }
    for issue in &report.warnings {
        ui::warn(&issue.to_string());
    }
}
