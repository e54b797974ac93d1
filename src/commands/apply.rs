use anyhow::{Result, bail};
use declarative::RemovalPolicy;

use crate::Context;
use crate::cli::ApplyArgs;
use crate::engine::{self, BatchOutcome, BatchSummary};
use crate::ui;

pub fn run(ctx: &Context, args: &ApplyArgs) -> Result<()> {
    let batch = super::load(ctx, &args.target)?;
    let backend = super::connect(&args.target);
    let policy = RemovalPolicy::new(args.delete_removed);

    match engine::run_batch(&backend, &batch.realms, policy) {
        Ok(BatchOutcome::Completed(summary)) => {
            show_summary(ctx, &summary);
            Ok(())
        }
        Ok(BatchOutcome::Aborted(report)) => {
            super::print_report(&report);
            bail!(
                "Aborted: validation failed with {}; nothing was changed",
                ui::plural(report.errors.len(), "error")
            );
        }
        Err(err) => {
            ui::error(&err.to_string());
            ui::dim(err.advice());
            bail!("Aborted: changes made before the failure were kept");
        }
    }
}

fn show_summary(ctx: &Context, summary: &BatchSummary) {
    for issue in &summary.warnings {
        ui::warn(&issue.to_string());
    }
    if ctx.quiet {
        return;
    }
    ui::header("Completed");
    for realm in &summary.realms {
        ui::kv(&realm.realm, &ui::summary_line(&realm.summary));
    }
    let total = summary.total();
    if total.has_changes() {
        ui::success(&format!("{} applied", ui::plural(total.total_changes(), "change")));
    } else {
        ui::success("Already up to date");
    }
}
