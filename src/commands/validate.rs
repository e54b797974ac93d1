use anyhow::{Context as _, Result, bail};

use crate::Context;
use crate::cli::TargetArgs;
use crate::engine;
use crate::ui;

pub fn run(ctx: &Context, args: &TargetArgs) -> Result<()> {
    let batch = super::load(ctx, args)?;
    let backend = super::connect(args);

    let report = engine::validate(&backend, &batch.realms)
        .context("Could not read live flows and bindings")?;
    super::print_report(&report);

    if !report.is_ok() {
        bail!(
            "Validation failed with {}",
            ui::plural(report.errors.len(), "error")
        );
    }
    if !ctx.quiet {
        ui::success("All flow bindings resolve");
    }
    Ok(())
}
