use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;

#[derive(Parser)]
#[command(name = "realmsync")]
#[command(author = "Alberto Cavalcante")]
#[command(version)]
#[command(
    about = "Reconcile declared authentication flows against an identity platform",
    long_about = None
)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Check flow bindings in the definitions against the live platform
    Validate(TargetArgs),

    /// Show what apply would change, without changing anything
    Plan(PlanArgs),

    /// Validate, then reconcile every declared realm
    Apply(ApplyArgs),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

// ============================================================================
// Shared Args
// ============================================================================

#[derive(Args, Debug, Clone)]
pub struct TargetArgs {
    /// Definition files or directories (default: <config dir>/realms)
    pub paths: Vec<String>,

    /// Base URL of the platform, e.g. https://sso.example.com
    #[arg(long, env = "REALMSYNC_URL")]
    pub url: String,

    /// Admin bearer token
    #[arg(long, env = "REALMSYNC_TOKEN", hide_env_values = true)]
    pub token: String,
}

#[derive(Args, Debug, Clone)]
pub struct PlanArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Plan removals as deletions of undeclared managed flows
    #[arg(long, env = "REALMSYNC_DELETE_REMOVED")]
    pub delete_removed: bool,
}

#[derive(Args, Debug, Clone)]
pub struct ApplyArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Delete managed flows that are no longer declared (default: keep them)
    #[arg(long, env = "REALMSYNC_DELETE_REMOVED")]
    pub delete_removed: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_apply_flags() {
        let cli = Cli::try_parse_from([
            "realmsync",
            "-vv",
            "apply",
            "--url",
            "https://sso.example.com",
            "--token",
            "t",
            "--delete-removed",
            "realms/",
            "extra.toml",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        let Command::Apply(args) = cli.command else {
            panic!("expected apply");
        };
        assert!(args.delete_removed);
        assert_eq!(args.target.paths, vec!["realms/", "extra.toml"]);
    }
}
