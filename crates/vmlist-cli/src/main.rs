use std::path::PathBuf;

use anyhow::bail;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use vmlist_core::BulkAction;
use vmlist_view::scenario;
use vmlist_view::Config;

#[derive(Parser)]
#[command(name = "vmlist", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Write a default vmlist.toml
    Init {
        #[arg(long)]
        path: Option<PathBuf>,
    },

    /// Replay a fixture scenario through the list engine and check its expectations
    Replay {
        /// Directory holding scenario.yaml
        dir: PathBuf,
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

fn init_tracing(cfg: &Config) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cfg.logging.filter));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cwd = std::env::current_dir()?;

    match cli.cmd {
        Command::Init { path } => {
            let path = path.unwrap_or_else(|| Config::config_path(&cwd));
            let cfg = Config::default();
            init_tracing(&cfg);
            if path.exists() {
                bail!("{} already exists", path.display());
            }
            cfg.save_to(&path)?;
            println!("Wrote {}", path.display());
        }
        Command::Replay { dir, config } => {
            let cfg = Config::load_or_default(&config.unwrap_or_else(|| Config::config_path(&cwd)))?;
            init_tracing(&cfg);

            let sc = scenario::load_scenario(&dir)?;
            let res = scenario::run(&sc, &cfg)?;
            info!(name = %sc.name, calls = res.calls.len(), "replay finished");

            println!("Scenario: {}", sc.name);
            println!("Tracked: {}", res.tracked.len());
            for id in &res.tracked {
                println!("- {}", id);
            }
            for (kind, ids) in &res.sets {
                let ids: Vec<&str> = ids.iter().map(|i| i.as_str()).collect();
                println!("{:?}: [{}]", kind, ids.join(", "));
            }
            for action in BulkAction::ALL {
                if let Some(title) = res.title(action) {
                    let state = if title.enabled { "enabled" } else { "disabled" };
                    println!("[{}] {} ({})", action, title.summary.replace('\n', " / "), state);
                }
            }
            for report in &res.reports {
                println!("{}: {}", report.action, report.summary().replace('\n', "; "));
            }

            let mismatches = scenario::check(&sc.expected, &res)?;
            if !mismatches.is_empty() {
                for m in &mismatches {
                    println!("MISMATCH {}", m);
                }
                bail!("{} expectation(s) did not hold", mismatches.len());
            }
            println!("OK");
        }
    }

    Ok(())
}
