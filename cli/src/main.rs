//! CLI tool to build a demo wiring spec and inspect the resulting IR.
//!
//! The demos come from the conformance suite, so what this binary prints is
//! exactly what the test suite asserts against.  A failed build still prints
//! the partially-constructed IR before exiting non-zero, since the partial
//! tree is usually the fastest way to see what went wrong.

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;

use loom_conformance::demos::{self, Demo};
use loom_ir::{Application, NodeRef};

#[derive(Parser, Debug)]
#[command(name = "loom")]
#[command(about = "Build a demo wiring spec and print the resulting IR")]
struct Cli {
    /// Name of the demo wiring spec to build.  Omit to list available demos.
    #[arg(short, long)]
    spec: Option<String>,

    /// Roots to instantiate, overriding the demo's defaults.
    #[arg(short, long, num_args = 0..)]
    roots: Vec<String>,

    /// Write a JSON build report to this path.
    #[arg(long)]
    report: Option<PathBuf>,

    /// Print the wiring spec registry before building.
    #[arg(long)]
    dump_spec: bool,
}

#[derive(Serialize)]
struct BuildReport {
    spec: String,
    roots: Vec<String>,
    succeeded: bool,
    node_count: usize,
    ir: String,
    error: Option<String>,
}

fn list_demos() {
    println!("available demos:");
    for demo in demos::all() {
        println!("  {:<18} {}", demo.name, demo.description);
    }
}

fn find_demo(name: &str) -> Result<Demo> {
    demos::all()
        .into_iter()
        .find(|demo| demo.name == name)
        .with_context(|| format!("no demo named {name:?}; run without --spec to list demos"))
}

fn top_level_count(app: &NodeRef) -> usize {
    app.downcast_ref::<Application>()
        .map(|a| a.children.len())
        .unwrap_or_default()
}

fn run(cli: &Cli) -> Result<bool> {
    let Some(name) = &cli.spec else {
        list_demos();
        return Ok(true);
    };

    let demo = find_demo(name)?;
    if cli.dump_spec {
        println!("{}", demo.spec);
    }

    let roots: Vec<String> = if cli.roots.is_empty() {
        demo.roots.clone()
    } else {
        cli.roots.clone()
    };
    let root_refs: Vec<&str> = roots.iter().map(String::as_str).collect();

    let (app, error) = match demo.spec.build_ir(&root_refs) {
        Ok(app) => (app, None),
        Err(err) => {
            let message = format!("{err:#}");
            (err.app, Some(message))
        }
    };

    println!("{}", app.render());
    if let Some(message) = &error {
        eprintln!("build failed: {message}");
    }

    if let Some(path) = &cli.report {
        let report = BuildReport {
            spec: demo.name.to_string(),
            roots,
            succeeded: error.is_none(),
            node_count: top_level_count(&app),
            ir: app.render(),
            error,
        };
        let json = serde_json::to_string_pretty(&report)?;
        fs::write(path, json).with_context(|| format!("writing report to {}", path.display()))?;
        log::info!("wrote build report to {}", path.display());
        return Ok(report.succeeded);
    }

    Ok(error.is_none())
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();
    match run(&cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}
