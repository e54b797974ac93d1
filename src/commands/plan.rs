use anyhow::{Context as _, Result};
use colored::Colorize;
use declarative::RemovalPolicy;

use crate::Context;
use crate::cli::PlanArgs;
use crate::engine::{self, RealmPlan, driver::PlannedAction};
use crate::ui;

pub fn run(ctx: &Context, args: &PlanArgs) -> Result<()> {
    let batch = super::load(ctx, &args.target)?;
    let backend = super::connect(&args.target);
    let policy = RemovalPolicy::new(args.delete_removed);

    let report = engine::validate(&backend, &batch.realms)
        .context("Could not read live flows and bindings")?;
    super::print_report(&report);
    if !report.is_ok() {
        ui::warn("apply would abort: fix the validation errors above first");
    }

    let mut pending = 0;
    for definition in &batch.realms {
        let plan = engine::plan_realm(&backend, definition, policy)
            .with_context(|| format!("Could not plan realm '{}'", definition.realm))?;
        if plan.has_changes() {
            pending += 1;
        }
        show_plan(ctx, &plan);
    }

    println!();
    if pending == 0 {
        ui::success("Everything is up to date");
    } else {
        ui::info(&format!(
            "{} with pending changes; run `realmsync apply` to reconcile",
            ui::plural(pending, "realm")
        ));
    }
    Ok(())
}

fn show_plan(ctx: &Context, plan: &RealmPlan) {
    ui::section(&format!("Realm {}", plan.realm));
    for flow in &plan.flows {
        match &flow.action {
            PlannedAction::Create => println!("  {} {}", "+".green(), flow.alias),
            PlannedAction::Update(lines) => {
                println!("  {} {}", "~".yellow(), flow.alias);
                for line in lines {
                    ui::dim(&format!("  {line}"));
                }
            }
            PlannedAction::Remove(decision) if decision.is_mutation() => {
                println!("  {} {}", "-".red(), flow.alias);
            }
            PlannedAction::Remove(decision) => {
                if ctx.verbose > 0 {
                    ui::dim(&format!("{} (undeclared, {})", flow.alias, decision.label()));
                }
            }
            PlannedAction::SkipUnmanaged => {
                ui::dim(&format!("{} (exists, not managed; will be skipped)", flow.alias));
            }
            PlannedAction::Unchanged => {
                if ctx.verbose > 0 {
                    ui::dim(&format!("{} (unchanged)", flow.alias));
                }
            }
        }
    }
}
