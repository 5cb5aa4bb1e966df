//! KEYSTONE CLI
//!
//! Validates infrastructure declarations and prints the order a
//! provisioning engine should apply them in.

#![warn(missing_docs)]
#![warn(clippy::all)]

use clap::{Parser, Subcommand, ValueEnum};
use color_eyre::Result;
use keystone_core::ResourceId;
use keystone_plan::{Declaration, Plan, PlanError, Planner, RunConfig, SchemaCatalog};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "keystone")]
#[command(about = "KEYSTONE - validate declarative infrastructure before provisioning", long_about = None)]
struct Cli {
    /// Output format
    #[arg(long, value_enum, global = true, default_value_t = Format::Text)]
    format: Format,
    /// Region overriding the declaration's provider block
    #[arg(long, global = true)]
    region: Option<String>,
    /// Reject attributes the schema does not declare
    #[arg(long, global = true)]
    strict: bool,
    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check a declaration and report the first problem
    Validate {
        /// Declaration file (`.json` or text syntax)
        file: PathBuf,
    },
    /// Print the creation order
    Order {
        /// Declaration file
        file: PathBuf,
        /// Print the deletion order instead
        #[arg(long)]
        destroy: bool,
    },
    /// Print dependency edges
    Graph {
        /// Declaration file
        file: PathBuf,
        /// Emit Graphviz DOT
        #[arg(long)]
        dot: bool,
    },
    /// List resource kinds and their schemas
    Kinds,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Text,
    Json,
}

const EXIT_INVALID: u8 = 1;
const EXIT_UNREADABLE: u8 = 2;

fn main() -> Result<ExitCode> {
    color_eyre::install()?;
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = RunConfig::new().with_strict_attributes(cli.strict);
    let config = match &cli.region {
        Some(region) => config.with_region(region),
        None => config,
    };

    let code = match &cli.command {
        Commands::Kinds => {
            print_kinds(cli.format)?;
            0
        }
        Commands::Validate { file } => run(file, &config, cli.format, |plan| {
            let summary = format!(
                "ok: {} resources, {} dependencies",
                plan.create_order.len(),
                plan.edges.len()
            );
            Ok((summary, serde_json::to_value(plan)?))
        })?,
        Commands::Order { file, destroy } => run(file, &config, cli.format, |plan| {
            let order = if *destroy {
                plan.destroy_order()
            } else {
                plan.create_order.clone()
            };
            Ok((render_order(&order), serde_json::to_value(&order)?))
        })?,
        Commands::Graph { file, dot } => run(file, &config, cli.format, |plan| {
            let text = if *dot {
                plan.graph().to_dot().trim_end().to_string()
            } else {
                plan.edges
                    .iter()
                    .map(|e| format!("{} -> {} ({})", e.from, e.to, e.attribute))
                    .collect::<Vec<_>>()
                    .join("\n")
            };
            Ok((text, serde_json::to_value(&plan.edges)?))
        })?,
    };
    Ok(ExitCode::from(code))
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "keystone=debug" } else { "keystone=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Plan `file`, then print either `render`'s text or its JSON value.
fn run(
    file: &Path,
    config: &RunConfig,
    format: Format,
    render: impl FnOnce(&Plan) -> Result<(String, serde_json::Value)>,
) -> Result<u8> {
    tracing::debug!(file = %file.display(), "loading declaration");
    let outcome = Declaration::load(file).and_then(|decl| Planner::new(config.clone()).plan(&decl));
    match outcome {
        Ok(plan) => {
            let (text, json) = render(&plan)?;
            match format {
                Format::Text => println!("{}", text),
                Format::Json => println!("{}", serde_json::to_string_pretty(&json)?),
            }
            Ok(0)
        }
        Err(err) => {
            report(&err, format)?;
            Ok(exit_code(&err))
        }
    }
}

fn exit_code(err: &PlanError) -> u8 {
    if err.is_validation() {
        EXIT_INVALID
    } else {
        EXIT_UNREADABLE
    }
}

fn report(err: &PlanError, format: Format) -> Result<()> {
    let diagnostic = err.diagnostic();
    match format {
        Format::Text => eprintln!("{}", diagnostic),
        Format::Json => println!("{}", serde_json::to_string_pretty(&diagnostic)?),
    }
    Ok(())
}

fn render_order(order: &[ResourceId]) -> String {
    order
        .iter()
        .enumerate()
        .map(|(i, id)| format!("{:>3}. {}", i + 1, id))
        .collect::<Vec<_>>()
        .join("\n")
}

#[derive(Serialize)]
struct KindRow<'a> {
    kind: &'a str,
    provider_type: &'a str,
    required: Vec<&'a str>,
    optional: Vec<&'a str>,
    outputs: Vec<&'a str>,
}

fn kind_rows(catalog: &SchemaCatalog) -> Vec<KindRow<'_>> {
    catalog
        .iter()
        .map(|schema| KindRow {
            kind: schema.kind.as_str(),
            provider_type: schema.kind.provider_type(),
            required: schema.required_attributes().map(|(n, _)| n).collect(),
            optional: schema
                .attributes
                .iter()
                .filter(|(_, a)| !a.required)
                .map(|(n, _)| n.as_str())
                .collect(),
            outputs: schema.outputs.iter().map(String::as_str).collect(),
        })
        .collect()
}

fn print_kinds(format: Format) -> Result<()> {
    let rows = kind_rows(SchemaCatalog::builtin());
    match format {
        Format::Json => println!("{}", serde_json::to_string_pretty(&rows)?),
        Format::Text => {
            for row in rows {
                println!("{} ({})", row.kind, row.provider_type);
                println!("    required: {}", row.required.join(", "));
                println!("    optional: {}", row.optional.join(", "));
                println!("    outputs:  {}", row.outputs.join(", "));
            }
        }
    }
    Ok(())
}
