use crate::config::Config;
use crate::services::{EntityOutcome, JsonFileStore, RollupService, RollupStore, RunSummary};
use crate::types::RollupState;
use anyhow::Context;
use clap::{Parser, Subcommand};
use std::fmt::Write as _;
use std::path::PathBuf;

/// Incremental month/year rollups of marketing performance exports
#[derive(Parser)]
#[command(name = "perfrollup")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Directory holding entity subdirectories and export files
    #[arg(long, global = true, env = "PERFROLLUP_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Directory where rollup artifacts are written
    #[arg(long, global = true, env = "PERFROLLUP_OUTPUT_DIR")]
    output_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Aggregate new exports for every entity (default)
    Run {
        /// Only aggregate this entity (repeatable)
        #[arg(long = "entity", value_name = "CODE")]
        entities: Vec<String>,

        /// Ignore the stored index and rollup and aggregate every file again
        #[arg(long)]
        reprocess: bool,

        /// Year for the year-to-date view (default: current year)
        #[arg(long)]
        year: Option<i32>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show an entity's stored rollup
    Show {
        entity: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Delete an entity's stored rollup and index
    Reset { entity: String },
}

impl Cli {
    pub fn run(self) -> anyhow::Result<()> {
        let config = Config::resolve(self.data_dir, self.output_dir)?;

        match self.command {
            None => run_rollup(config, false),
            Some(Commands::Run {
                entities,
                reprocess,
                year,
                json,
            }) => {
                let config = config
                    .with_entities(&entities)?
                    .with_year(year)?
                    .with_reprocess(reprocess);
                run_rollup(config, json)
            }
            Some(Commands::Show { entity, json }) => {
                let entity = entity_code(&entity)?;
                let store = JsonFileStore::new(config.output_dir);
                let state = store
                    .get(&entity)?
                    .with_context(|| format!("no rollup stored for {}", entity))?;
                if json {
                    println!("{}", serde_json::to_string_pretty(&state)?);
                } else {
                    print!("{}", render_rollup(&state));
                }
                Ok(())
            }
            Some(Commands::Reset { entity }) => {
                let entity = entity_code(&entity)?;
                JsonFileStore::new(config.output_dir).clear(&entity)?;
                println!("Cleared rollup for {}", entity);
                Ok(())
            }
        }
    }
}

fn entity_code(entity: &str) -> anyhow::Result<String> {
    let config = Config::with_dirs(PathBuf::new(), PathBuf::new()).with_entities([entity])?;
    Ok(config.entities.into_iter().next().unwrap_or_default())
}

fn run_rollup(config: Config, json: bool) -> anyhow::Result<()> {
    let data_dir = config.data_dir.clone();
    let summary = RollupService::new(config)
        .run()
        .with_context(|| format!("cannot scan data directory {}", data_dir.display()))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print!("{}", render_summary(&summary));
    }
    Ok(())
}

/// One line per entity: processed, skipped, failed, records
fn render_summary(summary: &RunSummary) -> String {
    let mut out = String::new();
    if summary.outcomes.is_empty() {
        out.push_str("No entities found\n");
        return out;
    }

    for outcome in &summary.outcomes {
        match outcome {
            EntityOutcome::Completed(report) => {
                let _ = writeln!(
                    out,
                    "{:<4} {} new, {} already processed, {} failed, {} rows dropped, {} records in {} periods",
                    report.entity,
                    report.files_processed,
                    report.files_already_processed,
                    report.files_failed.len(),
                    report.rows_dropped,
                    report.total_records,
                    report.periods,
                );
                for failure in &report.files_failed {
                    let _ = writeln!(out, "     failed {}: {}", failure.file, failure.error);
                }
            }
            EntityOutcome::Failed { entity, error } => {
                let _ = writeln!(out, "{:<4} FAILED: {}", entity, error);
            }
        }
    }
    out
}

/// Period table, YTD line and latest month-over-month change
fn render_rollup(state: &RollupState) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Rollup for {}", state.entity);
    if let Some(updated) = state.last_updated {
        let _ = writeln!(out, "Last updated {}", updated.format("%Y-%m-%d %H:%M:%S UTC"));
    }
    let _ = writeln!(
        out,
        "{:<10} {:>14} {:>14} {:>10} {:>8} {:>8} {:>8} {:>8} {:>8}",
        "Month", "Media Spend", "Impressions", "Clicks", "CTR", "CPM", "CPC", "CP IV", "Cp NVWR"
    );
    for row in state.summary_rows() {
        let _ = writeln!(
            out,
            "{:<10} {:>14.2} {:>14.0} {:>10.0} {:>8.2} {:>8.2} {:>8.2} {:>8.2} {:>8.2}",
            row.label,
            row.media_spend,
            row.impressions,
            row.clicks,
            row.ctr,
            row.cpm,
            row.cpc,
            row.cp_iv,
            row.cp_nvwr,
        );
    }

    if let Some(cmp) = &state.monthly_comparison {
        let c = &cmp.changes;
        let _ = writeln!(
            out,
            "{} vs {}: spend {:+.1}%, impressions {:+.1}%, clicks {:+.1}%, CPM {:+.1}%, CPC {:+.1}%",
            cmp.current_period,
            cmp.previous_period,
            c.media_spend,
            c.impressions,
            c.clicks,
            c.cpm,
            c.cpc,
        );
    }
    out
}
