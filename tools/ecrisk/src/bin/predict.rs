use std::path::PathBuf;

use clap::{ArgAction, Parser};
use ecrisk::{
    init_logging, report_error, run_predict, warn_skipped, Context, Overrides, PredictConfig,
    PredictOptions,
};
use ecrisk_model::Grouping;

#[derive(Debug, Parser)]
#[command(
    name = "predict",
    version,
    about = "Score esophageal cancer patients with a pre-fitted Cox model",
    long_about = "predict reads a patient table (CSV, TSV or spreadsheet), validates every \
        row against the model artifact, computes the Cox risk score and writes \
        one Low/Medium/High risk group per patient.\n\n\
        Exit codes: 0 success, 2 configuration, 3 model artifact, 4 input, \
        5 validation, 6 output."
)]
struct Cli {
    /// Patient table to score (.csv, .tsv, .xlsx, .xls, .ods)
    #[arg(short, long, value_name = "FILE")]
    input: PathBuf,

    /// Model artifact JSON [default: final_result/model_artifact.json]
    #[arg(short, long, value_name = "FILE")]
    model: Option<PathBuf>,

    /// Output file, or directory for predictions_with_risk.csv [default: prediction_results]
    #[arg(short, long, value_name = "PATH")]
    output: Option<PathBuf>,

    /// Column carried to the output as the patient identifier
    #[arg(long, value_name = "NAME")]
    id_column: Option<String>,

    /// Worksheet to read from a spreadsheet (first sheet by default)
    #[arg(long, value_name = "NAME")]
    sheet: Option<String>,

    /// Risk grouping: `cutpoints` (artifact thresholds) or `cohort` (tertiles)
    #[arg(long, value_name = "MODE")]
    grouping: Option<Grouping>,

    /// Score valid rows and report rejected ones instead of aborting
    #[arg(long)]
    skip_invalid: bool,

    /// Run configuration TOML; flags override its values
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    quiet: bool,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);
    let ctx = Context::new(cli.verbose > 0, cli.quiet);
    std::process::exit(run(&ctx, cli));
}

fn run(ctx: &Context, cli: Cli) -> i32 {
    let config = match &cli.config {
        Some(path) => match PredictConfig::load(path) {
            Ok(config) => config,
            Err(e) => {
                report_error(&e, 0);
                return e.exit_code();
            }
        },
        None => PredictConfig::default(),
    };
    let overrides = Overrides {
        model: cli.model,
        output: cli.output,
        id_column: cli.id_column,
        sheet: cli.sheet,
        grouping: cli.grouping,
        skip_invalid: cli.skip_invalid,
    };
    let opts = PredictOptions::resolve(cli.input, config, overrides);

    ctx.info(&format!("Predicting risk for {}", opts.input.display()));
    match run_predict(ctx, &opts) {
        Ok(summary) => {
            warn_skipped(&summary.skipped, opts.max_reported_errors);
            ctx.info("Risk group distribution:");
            for (group, count) in &summary.counts {
                ctx.info(&format!("  {group}: {count}"));
            }
            if let Some(report) = &summary.error_report {
                ctx.info(&format!(
                    "Skipped {} invalid row(s); details in {}",
                    summary.rejected_rows,
                    report.display()
                ));
            }
            ctx.success(&format!(
                "Wrote {} of {} prediction(s) to {}",
                summary.written,
                summary.total_rows,
                summary.output.display()
            ));
            0
        }
        Err(e) => {
            report_error(&e, opts.max_reported_errors);
            e.exit_code()
        }
    }
}
