use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use tracing::Level;

use relsql::dialect::Dialect;
use relsql::provider::ProviderRef;
use relsql::translator::check_syntax;
use relsql::{Config, QueryPipeline};

/// Compile a relational provider tree (JSON) into dialect SQL
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Provider tree as JSON, `-` for stdin
    plan: PathBuf,

    /// Target dialect, e.g. `postgresql:9.3`, `sqlserver`, `mysql:5.6`
    #[arg(short, long)]
    dialect: Option<Dialect>,

    /// Configuration file (default: <config dir>/relsql/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Fail when an Apply cannot be rewritten into a join
    #[arg(long)]
    strict: bool,

    /// Skip the index selection pass
    #[arg(long)]
    no_index_selection: bool,

    /// Bind literals in predicates as parameters
    #[arg(long)]
    parameterize: bool,

    /// Parse the emitted SQL with the dialect's parser
    #[arg(long)]
    check: bool,

    /// Print the command as JSON instead of plain SQL
    #[arg(long)]
    json: bool,

    /// Print the provider tree after pre-compilation and stop
    #[arg(long)]
    show_plan: bool,

    /// More logging (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    let mut config = match &cli.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("loading configuration from {}", path.display()))?,
        None => Config::load_or_default().context("loading default configuration")?,
    };
    if let Some(dialect) = cli.dialect {
        config.dialect.target = dialect;
    }
    config.precompile.strict_apply_correction |= cli.strict;
    if cli.no_index_selection {
        config.precompile.index_selection = false;
    }
    config.compiler.parameterize_literals |= cli.parameterize;

    let plan = read_plan(&cli.plan)?;
    let pipeline = QueryPipeline::new(&config)?;

    if cli.show_plan {
        let rewritten = pipeline.precompile(&plan)?;
        println!("{}", serde_json::to_string_pretty(&rewritten)?);
        return Ok(());
    }

    let command = match pipeline.compile(&plan) {
        Ok(command) => command,
        // the plan itself cannot be expressed; show the whole cause chain
        Err(err) if err.is_fatal_for_query() => anyhow::bail!(
            "cannot compile plan for {}\n{}",
            pipeline.dialect(),
            err.format_detailed()
        ),
        Err(err) => return Err(err.into()),
    };
    if cli.check {
        check_syntax(pipeline.dialect(), &command.sql)
            .with_context(|| format!("checking emitted SQL:\n{}", command.sql))?;
    }

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&command)?);
    } else {
        println!("{}", command.sql);
        for (i, value) in command.parameters.iter().enumerate() {
            println!("-- param {}: {}", i, value);
        }
    }
    Ok(())
}

fn read_plan(path: &Path) -> Result<ProviderRef> {
    let text = if path.as_os_str() == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?
    };
    serde_json::from_str(&text).with_context(|| format!("parsing provider tree {}", path.display()))
}
