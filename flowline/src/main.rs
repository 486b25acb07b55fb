//! Route table tooling for flowline deployments.
//!
//! Validates route manifests before they ship and answers "which view does
//! this URL reach" against the frozen table a server would build.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use flowline::core::route_registry::RouteTable;
use flowline::core::route_target::RouteTarget;
use flowline::exit_codes;
use flowline::io::config::load_config;
use flowline::io::manifest::{load_manifest, load_route_table};
use serde_json::{Value, json};

#[derive(Parser)]
#[command(
    name = "flowline",
    version,
    about = "Route manifest checks and lookups for flowline"
)]
struct Cli {
    /// Config file naming the route manifest (`routes = "..."`).
    #[arg(long, global = true, default_value = "flowline.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Register every route and report all conflicts.
    Check {
        /// Route manifest; defaults to the one named in the config.
        manifest: Option<PathBuf>,
    },
    /// Print the route a URL path resolves to.
    Resolve {
        path: String,
        #[arg(long)]
        manifest: Option<PathBuf>,
    },
    /// Print the frozen route table as JSON.
    Table {
        manifest: Option<PathBuf>,
    },
}

fn main() {
    flowline::logging::init();
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("{:#}", err);
            std::process::exit(exit_codes::INVALID);
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    match cli.command {
        Command::Check { manifest } => cmd_check(&manifest_path(&cli.config, manifest)?),
        Command::Resolve { path, manifest } => {
            cmd_resolve(&manifest_path(&cli.config, manifest)?, &path)
        }
        Command::Table { manifest } => cmd_table(&manifest_path(&cli.config, manifest)?),
    }
}

fn manifest_path(config_path: &Path, explicit: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        return Ok(path);
    }
    let cfg = load_config(config_path)?;
    cfg.routes_path(config_path).ok_or_else(|| {
        anyhow!(
            "no manifest given and {} does not set `routes`",
            config_path.display()
        )
    })
}

fn cmd_check(manifest_path: &Path) -> Result<i32> {
    let manifest = load_manifest(manifest_path)?;
    match manifest.build_table() {
        Ok(table) => {
            println!("ok: {} routes", table.len());
            Ok(exit_codes::OK)
        }
        Err(errors) => {
            for err in &errors {
                println!("{}", err);
            }
            Ok(exit_codes::INVALID)
        }
    }
}

fn cmd_resolve(manifest_path: &Path, path: &str) -> Result<i32> {
    let table = load_route_table(manifest_path)?;
    let Some(hit) = table.resolve(path) else {
        eprintln!("no route for '{}'", path);
        return Ok(exit_codes::NOT_FOUND);
    };
    let mut value = entry_json(hit.pattern, hit.entry);
    value["parameters"] = json!(hit.parameters);
    print_json(&value)?;
    Ok(exit_codes::OK)
}

fn cmd_table(manifest_path: &Path) -> Result<i32> {
    let table = load_route_table(manifest_path)?;
    print_json(&table_json(&table))?;
    Ok(exit_codes::OK)
}

fn table_json(table: &RouteTable) -> Value {
    Value::Array(
        table
            .routes()
            .into_iter()
            .map(|(pattern, entry)| entry_json(pattern, entry))
            .collect(),
    )
}

fn entry_json(pattern: &str, entry: &RouteTarget) -> Value {
    json!({
        "pattern": pattern,
        "target": entry.target(),
        "layouts": entry.parent_layouts(),
    })
}

fn print_json(value: &Value) -> Result<()> {
    let payload = serde_json::to_string_pretty(value).context("serialize json")?;
    println!("{}", payload);
    Ok(())
}
