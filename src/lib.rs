// src/lib.rs

pub mod activity;
pub mod cli;
pub mod errors;
pub mod graph;
pub mod handler;
pub mod logging;
pub mod manager;
pub mod plan;
pub mod resource;

use std::sync::Arc;

use anyhow::Result;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::activity::Activity;
use crate::cli::CliArgs;
use crate::graph::Graph;
use crate::handler::HandlerRegistry;
use crate::manager::DeploymentManager;
use crate::plan::{load_and_validate, PlanFile};
use crate::resource::DeploymentContext;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - plan loading
/// - the built-in handler registry
/// - the deployment manager
/// - Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<()> {
    let plan = load_and_validate(&args.plan)?;
    let resources = plan.resources();

    let registry = HandlerRegistry::with_builtin_handlers()?;
    let parallel = plan.parallel() && !args.sequential;
    let context = DeploymentContext::new(Arc::new(registry)).with_parallel(parallel);

    let manager = DeploymentManager::new();
    let cancel = CancellationToken::new();

    if let Some(kind) = args.dot {
        let graph = manager.plan(&context, &resources, &cancel)?;
        print!("{}", graph.to_dot(kind));
        return Ok(());
    }

    if args.dry_run {
        let graph = manager.plan(&context, &resources, &cancel)?;
        print_dry_run(&plan, &graph, parallel);
        return Ok(());
    }

    // Ctrl-C → ask handlers to stop.
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                eprintln!("failed to listen for Ctrl+C: {e}");
                return;
            }
            info!("Ctrl-C received; cancelling deployment");
            cancel.cancel();
        });
    }

    match manager.deploy(&context, &resources, cancel).await {
        Ok(()) => Ok(()),
        Err(err) if err.is_cancelled() => {
            warn!("deployment cancelled before completion");
            Err(err.into())
        }
        Err(err) => Err(err.into()),
    }
}

/// Print the plan and the order resources would be applied in.
fn print_dry_run(plan: &PlanFile, graph: &Graph<Activity>, parallel: bool) {
    println!("deploydag dry-run");
    println!("  deploy.parallel = {parallel}");
    println!();

    let configs = plan.resource_configs();
    println!("resources ({}), dependencies first:", graph.len());
    for activity in graph.sort(false) {
        println!("  {}. {}", activity.order(), activity.key());
        if let Some(cfg) = configs.get(activity.key()) {
            println!("      type: {}", cfg.resource_type);
            if let Some(ref cmd) = cfg.cmd {
                println!("      cmd: {cmd}");
            }
            if let Some(ms) = cfg.duration_ms {
                println!("      duration_ms: {ms}");
            }
            if !cfg.after.is_empty() {
                println!("      after: {:?}", cfg.after);
            }
        }
    }

    debug!("dry-run complete (nothing applied)");
}
