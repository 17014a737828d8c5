//! Command-line interface for `treesync`.
//!
//! `treesync diff` prints the one-level change list between two documents.
//! `treesync patch` loads the first document into an in-memory shared tree
//! or state store, patches it towards the second, and prints the result.

use std::fs;
use std::io::{self, IsTerminal, Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;
use treesync_core::{
    patch_shared_tree_with, patch_store_with, CallablePolicy, MemoryContainer, MemoryStore,
    PatchOptions, PatchStats, Value,
};

const LOG_ENV: &str = "TREESYNC_LOG";

#[derive(Debug, Parser)]
#[command(
    name = "treesync",
    version,
    about = "Diff JSON and YAML documents one level at a time and patch them into \
             shared trees or stores."
)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Write logs to STDERR as JSON lines.
    #[arg(long = "log-json", action = ArgAction::SetTrue, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the change list turning OLD into NEW.
    Diff(DiffArgs),
    /// Load OLD into a target, patch it to NEW and print the result.
    Patch(PatchArgs),
}

#[derive(Debug, Args)]
struct IoArgs {
    /// Document to start from.
    old: PathBuf,

    /// Document to move towards. Read from STDIN when omitted.
    new: Option<PathBuf>,

    /// Read and write YAML instead of JSON.
    #[arg(long = "yaml", action = ArgAction::SetTrue)]
    yaml: bool,

    /// Write to FILE instead of STDOUT.
    #[arg(short = 'o', long = "output", value_name = "FILE")]
    output: Option<PathBuf>,
}

#[derive(Debug, Args)]
struct DiffArgs {
    #[command(flatten)]
    io: IoArgs,
}

#[derive(Debug, Args)]
struct PatchArgs {
    #[command(flatten)]
    io: IoArgs,

    /// Which kind of target to patch.
    #[arg(long = "target", value_enum, default_value = "tree")]
    target: Target,

    /// What to do with callable values in a shared tree.
    #[arg(long = "callables", value_enum, default_value = "skip")]
    callables: CallableArg,

    /// Maximum nesting depth a patch may descend.
    #[arg(long = "max-depth", value_name = "N")]
    max_depth: Option<usize>,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, ValueEnum)]
enum Target {
    /// A live shared container mutated in place.
    #[default]
    Tree,
    /// An immutable snapshot replaced wholesale.
    Store,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
enum CallableArg {
    Skip,
    Reject,
}

impl From<CallableArg> for CallablePolicy {
    fn from(value: CallableArg) -> Self {
        match value {
            CallableArg::Skip => CallablePolicy::Skip,
            CallableArg::Reject => CallablePolicy::Reject,
        }
    }
}

fn main() {
    match try_main() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            let _ = writeln!(io::stderr(), "{err:#}");
            std::process::exit(2);
        }
    }
}

fn try_main() -> Result<i32> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.log_json)?;

    match &cli.command {
        Command::Diff(args) => run_diff(args),
        Command::Patch(args) => run_patch(args),
    }
}

fn init_logging(verbose: u8, json: bool) -> Result<()> {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbose)));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_ansi(io::stderr().is_terminal())
        .with_target(false);
    let installed = if json { builder.json().try_init() } else { builder.try_init() };
    installed.map_err(|err| anyhow!(err)).context("failed to install log subscriber")
}

fn default_directive(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

fn run_diff(args: &DiffArgs) -> Result<i32> {
    let (old, new) = load_pair(&args.io)?;
    let changes = old.diff(&new).context("failed to diff inputs")?;
    debug!(shape = %changes.shape(), records = changes.len(), "computed change list");

    let rendered = render_json(&changes.to_json_value(), args.io.yaml)?;
    emit(args.io.output.as_deref(), &rendered)?;

    // `pending` records do not imply a difference; compare whole documents.
    Ok(if old == new { 0 } else { 1 })
}

fn run_patch(args: &PatchArgs) -> Result<i32> {
    let options = build_options(args)?;
    let (old, new) = load_pair(&args.io)?;

    let (result, stats) = match args.target {
        Target::Tree => {
            let tree = MemoryContainer::from_value(&old)
                .context("first input cannot be loaded into a shared tree")?;
            let stats = patch_shared_tree_with(&tree, &new, &options)
                .context("failed to patch shared tree")?;
            (tree.to_value(), stats)
        }
        Target::Store => {
            let store = MemoryStore::new(old);
            let stats =
                patch_store_with(&store, &new, &options).context("failed to patch store")?;
            ((*store.state()).clone(), stats)
        }
    };
    log_stats(args.target, &stats);

    let json = result
        .to_json_value()
        .ok_or_else(|| anyhow!("patched value has no JSON representation"))?;
    let rendered = render_json(&json, args.io.yaml)?;
    emit(args.io.output.as_deref(), &rendered)?;
    Ok(0)
}

fn build_options(args: &PatchArgs) -> Result<PatchOptions> {
    let mut options = PatchOptions::default().with_callables(args.callables.into());
    if let Some(depth) = args.max_depth {
        options = options.with_max_depth(depth).map_err(|err| anyhow!(err))?;
    }
    Ok(options)
}

fn log_stats(target: Target, stats: &PatchStats) {
    info!(
        kind = ?target,
        added = stats.added,
        updated = stats.updated,
        deleted = stats.deleted,
        descended = stats.descended,
        skipped = stats.skipped,
        "patch applied"
    );
}

#[derive(Debug)]
enum InputSource {
    File(PathBuf),
    Stdin,
}

fn load_pair(inputs: &IoArgs) -> Result<(Value, Value)> {
    let first = InputSource::File(inputs.old.clone());
    let second = inputs.new.clone().map_or(InputSource::Stdin, InputSource::File);

    let old_text = read_input(&first)?;
    let new_text = read_input(&second)?;
    let old = parse_value(&old_text, inputs.yaml).context("failed to parse first input")?;
    let new = parse_value(&new_text, inputs.yaml).context("failed to parse second input")?;
    Ok((old, new))
}

fn read_input(source: &InputSource) -> Result<String> {
    match source {
        InputSource::File(path) => {
            fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
        }
        InputSource::Stdin => {
            let mut buffer = String::new();
            io::stdin().read_to_string(&mut buffer)?;
            Ok(buffer)
        }
    }
}

fn parse_value(input: &str, yaml: bool) -> Result<Value> {
    if yaml {
        Value::from_yaml_str(input).map_err(|err| anyhow!(err))
    } else {
        Value::from_json_str(input).map_err(|err| anyhow!(err))
    }
}

fn render_json(value: &serde_json::Value, yaml: bool) -> Result<String> {
    if yaml {
        serde_yaml::to_string(value).context("failed to serialize YAML output")
    } else {
        let mut rendered = serde_json::to_string(value).context("failed to serialize JSON output")?;
        rendered.push('\n');
        Ok(rendered)
    }
}

fn emit(output: Option<&Path>, rendered: &str) -> Result<()> {
    if let Some(path) = output {
        fs::write(path, rendered.as_bytes())
            .with_context(|| format!("failed to write output to {}", path.display()))?;
    } else {
        print!("{rendered}");
        io::stdout().flush().ok();
    }
    Ok(())
}
