use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};
use ecrisk::{
    build_artifact, describe, init_logging, load_coefficients, report_error, ArtifactSpec, Context,
};
use ecrisk_model::{ModelArtifact, PredictError};

#[derive(Debug, Parser)]
#[command(
    name = "ecrisk-artifact",
    version,
    about = "Build and inspect Cox model artifacts for `predict`",
    long_about = "ecrisk-artifact converts a fitted Cox model into the JSON artifact \
        read by `predict`.\n\n\
        Commands:\n  \
        build    Assemble an artifact from a feature TOML and a coefficient CSV\n  \
        inspect  Validate an artifact and print its contents"
)]
struct Cli {
    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Assemble an artifact from a feature description and fitted coefficients
    Build(BuildArgs),
    /// Validate an artifact and print its features, coefficients and cut-points
    Inspect(InspectArgs),
}

#[derive(Debug, Args)]
struct BuildArgs {
    /// Feature description TOML (encodings, cut-points, offset or baseline means)
    #[arg(long, value_name = "FILE")]
    spec: PathBuf,

    /// Coefficient table with `covariate,coef` columns
    #[arg(long, value_name = "FILE")]
    coefficients: PathBuf,

    /// Destination artifact JSON
    #[arg(long, value_name = "FILE")]
    out: PathBuf,

    /// Overwrite an existing artifact
    #[arg(long)]
    force: bool,
}

#[derive(Debug, Args)]
struct InspectArgs {
    /// Artifact JSON to inspect
    model: PathBuf,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);
    let ctx = Context::new(cli.verbose > 0, cli.quiet);
    let result = match cli.command {
        Command::Build(args) => run_build(&ctx, &args),
        Command::Inspect(args) => run_inspect(&ctx, &args),
    };
    let rc = match result {
        Ok(()) => 0,
        Err(e) => {
            report_error(&e, 0);
            e.exit_code()
        }
    };
    std::process::exit(rc);
}

fn run_build(ctx: &Context, args: &BuildArgs) -> Result<(), PredictError> {
    if args.out.exists() && !args.force {
        return Err(PredictError::OutputWrite {
            origin: args.out.display().to_string(),
            reason: "file exists (use --force to overwrite)".into(),
        });
    }
    let spec = ArtifactSpec::load(&args.spec)?;
    ctx.verbose(&format!(
        "Read {} feature(s) from {}",
        spec.features.len(),
        args.spec.display()
    ));
    let coefficients = load_coefficients(&args.coefficients)?;
    let artifact = build_artifact(spec, coefficients, &args.spec.display().to_string())?;
    artifact.save(&args.out)?;
    ctx.success(&format!("Wrote model artifact {}", args.out.display()));
    Ok(())
}

fn run_inspect(ctx: &Context, args: &InspectArgs) -> Result<(), PredictError> {
    let artifact = ModelArtifact::load(&args.model)?;
    if !ctx.quiet {
        print!("{}", describe(&artifact));
    }
    Ok(())
}
