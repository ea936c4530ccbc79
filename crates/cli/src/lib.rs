use anyhow::{Context as AnyhowContext, Result};
use clap::{Args, Parser, Subcommand};
use command::{
    AllocatePayload, CommandAction, CommandHandler, CommandRequest, PayloadError, ValidatePayload,
};
use funding_protocol::{response_schema, serialize_json, Response};
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

pub mod command;
pub mod input;
pub mod output;
pub mod report;
pub mod settings;
pub mod warnings;

fn print_stdout(text: &str) -> Result<()> {
    use std::io::Write;

    let mut stdout = io::stdout().lock();
    if let Err(err) = stdout
        .write_all(text.as_bytes())
        .and_then(|_| stdout.write_all(b"\n"))
        .and_then(|_| stdout.flush())
    {
        if err.kind() == io::ErrorKind::BrokenPipe {
            return Ok(());
        }
        return Err(err.into());
    }
    Ok(())
}

#[derive(Parser)]
#[command(name = "funding-allocator")]
#[command(about = "Allocate a funding pool across centers at one capped per-person rate", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode: log only warnings/errors (stdout is reserved for JSON)
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Settings file (TOML or JSON); defaults to $FUNDING_ALLOCATOR_CONFIG, then ./funding.toml
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Pretty-print JSON response
    #[arg(long, global = true)]
    pretty: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Solve for the per-person rate and write the allocation CSV
    #[command(allow_negative_numbers = true)]
    Allocate(AllocateArgs),

    /// Check an input CSV without solving
    Validate(ValidateArgs),

    /// Execute a JSON Command API request
    Command(CommandArgs),

    /// Print the JSON Schema of the response envelope
    Schema,
}

#[derive(Args)]
struct AllocateArgs {
    /// Center table (CSV with people_served and incentive columns)
    #[arg(short, long)]
    input: PathBuf,

    /// Total funding to distribute
    #[arg(long)]
    total_funding: f64,

    /// Flat amount every center receives
    #[arg(long, default_value_t = 0.0)]
    base_funding: f64,

    /// Extra amount for centers with incentive = 1
    #[arg(long, default_value_t = 0.0)]
    unincorporated_funding: f64,

    /// Global per-center cap (0 = no cap)
    #[arg(long, default_value_t = 0.0)]
    cap: f64,

    /// Output CSV path (default: <output-dir>/optimized_<timestamp>.csv)
    #[arg(short, long, conflicts_with = "output_dir")]
    output: Option<PathBuf>,

    /// Directory for the timestamped output CSV (overrides [report].output_dir)
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Also write a Markdown report to this path
    #[arg(long)]
    report: Option<PathBuf>,

    /// Treat saturation or an overshooting floor as an error and write nothing
    #[arg(long)]
    strict: bool,
}

#[derive(Args)]
struct ValidateArgs {
    /// Center table to check
    #[arg(short, long)]
    input: PathBuf,
}

#[derive(Args)]
struct CommandArgs {
    /// Inline JSON request (mutually exclusive with --file)
    #[arg(long, conflicts_with = "file")]
    json: Option<String>,

    /// Path to file containing the JSON request
    #[arg(long)]
    file: Option<PathBuf>,
}

pub fn main_entry() -> Result<()> {
    let cli = Cli::parse();

    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if cli.quiet {
        builder.filter_level(log::LevelFilter::Warn);
    } else if cli.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.target(env_logger::Target::Stderr).init();

    let config = cli.config.as_deref();
    let pretty = cli.pretty;
    match cli.command {
        Commands::Allocate(args) => dispatch(config, pretty, |h| run_allocate(h, args)),
        Commands::Validate(args) => dispatch(config, pretty, |h| run_validate(h, args)),
        Commands::Command(args) => dispatch(config, pretty, |h| Ok(run_command(h, &args))),
        Commands::Schema => print_stdout(&response_schema()?),
    }
}

fn dispatch(
    config: Option<&Path>,
    pretty: bool,
    run: impl FnOnce(&CommandHandler) -> Result<Response>,
) -> Result<()> {
    let loaded = match settings::load_settings(config) {
        Ok(loaded) => loaded,
        Err(err) => return emit(&command::config_error_response(&err), pretty),
    };
    let handler = CommandHandler::new(loaded);
    let response = run(&handler)?;
    emit(&response, pretty)
}

fn emit(response: &Response, pretty: bool) -> Result<()> {
    let output = if pretty {
        serde_json::to_string_pretty(response)?
    } else {
        serialize_json(response)?
    };
    print_stdout(&output)?;

    if response.is_error() {
        std::process::exit(1);
    }
    Ok(())
}

fn run_allocate(handler: &CommandHandler, args: AllocateArgs) -> Result<Response> {
    let payload = AllocatePayload {
        input: args.input,
        total_funding: args.total_funding,
        base_funding: args.base_funding,
        unincorporated_funding: args.unincorporated_funding,
        cap: args.cap,
        output: args.output,
        output_dir: args.output_dir,
        report: args.report,
        strict: args.strict,
    };
    Ok(handler.execute(CommandRequest {
        action: CommandAction::Allocate,
        payload: serde_json::to_value(payload)?,
    }))
}

fn run_validate(handler: &CommandHandler, args: ValidateArgs) -> Result<Response> {
    let payload = ValidatePayload { input: args.input };
    Ok(handler.execute(CommandRequest {
        action: CommandAction::Validate,
        payload: serde_json::to_value(payload)?,
    }))
}

fn run_command(handler: &CommandHandler, args: &CommandArgs) -> Response {
    let request = read_payload(args).and_then(|raw| {
        serde_json::from_str::<CommandRequest>(&raw).map_err(|err| {
            PayloadError(format!("Invalid JSON passed to --json/--file: {err}")).into()
        })
    });
    match request {
        Ok(request) => handler.execute(request),
        Err(err) => command::error_response(&err),
    }
}

fn read_payload(args: &CommandArgs) -> Result<String> {
    if let Some(raw) = &args.json {
        return Ok(raw.clone());
    }
    if let Some(path) = &args.file {
        return fs::read_to_string(path)
            .with_context(|| format!("Failed to read JSON from {}", path.display()));
    }

    let mut buffer = String::new();
    io::stdin()
        .read_to_string(&mut buffer)
        .context("Failed to read JSON from stdin")?;

    if buffer.trim().is_empty() {
        return Err(PayloadError(
            "Command request is empty. Provide --json, --file, or pipe JSON via stdin."
                .to_string(),
        )
        .into());
    }

    Ok(buffer)
}
