//! `handwheel`: run or check the handwheel controller.

mod cli;
mod error_fmt;
mod logging;
mod rt;
mod run;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::Parser;

use crate::cli::{Cli, Commands, JSON_MODE};
use crate::error_fmt::{exit_code_for_error, format_error_json, humanize};
use crate::run::{RunOpts, RunReport};

fn main() {
    if let Err(e) = color_eyre::install() {
        eprintln!("Warning: error report hook not installed: {e}");
    }
    let cli = Cli::parse();
    let _ = JSON_MODE.set(cli.json);

    if let Err(err) = real_main(cli) {
        tracing::debug!(error = ?err, "command failed");
        if JSON_MODE.get().copied().unwrap_or(false) {
            eprintln!("{}", format_error_json(&err));
        } else {
            eprintln!("{}", humanize(&err));
        }
        std::process::exit(exit_code_for_error(&err));
    }
}

fn real_main(cli: Cli) -> eyre::Result<()> {
    let loaded = handwheel_config::load_file(&cli.config);
    logging::init(
        cli.json,
        cli.log_level.as_deref(),
        loaded.as_ref().ok().map(|c| &c.logging),
    )?;
    let cfg = loaded?;
    tracing::debug!(config = %cli.config.display(), "config loaded");

    match cli.cmd {
        Commands::Run {
            duration_ms,
            stats,
            rt,
            rt_prio,
            rt_lock,
        } => {
            let shutdown = Arc::new(AtomicBool::new(false));
            {
                let flag = Arc::clone(&shutdown);
                if let Err(e) = ctrlc::set_handler(move || flag.store(true, Ordering::Relaxed)) {
                    tracing::warn!(error = %e, "Ctrl-C handler not installed");
                }
            }
            let opts = RunOpts {
                duration_ms,
                rt,
                rt_prio,
                rt_lock,
            };
            let report = run::run(&cfg, &opts, shutdown)?;
            print_report(&report, stats, cli.json);
            Ok(())
        }
        Commands::SelfCheck => {
            run::self_check(&cfg)?;
            if cli.json {
                println!("{}", serde_json::json!({ "status": "ok" }));
            } else {
                println!("OK");
            }
            Ok(())
        }
    }
}

fn print_report(report: &RunReport, stats: bool, json: bool) {
    let s = &report.stats;
    if json {
        let mut v = serde_json::json!({
            "status": "stopped",
            "iterations": s.iterations,
            "elapsed_us": report.elapsed_us,
        });
        if stats {
            v["stats"] = serde_json::json!({
                "bus_polls": s.bus_polls,
                "bus_served": s.bus_served,
                "bus_ignored": s.bus_ignored,
                "bus_errors": s.bus_errors,
                "redraws": s.redraws,
                "redraw_failures": s.redraw_failures,
                "heartbeat_toggles": s.heartbeat_toggles,
                "heartbeat_failures": s.heartbeat_failures,
                "max_iteration_us": s.max_iteration_us,
                "iterations_per_sec": s.iterations_per_sec(report.elapsed_us),
                "master_replies": report.master_replies,
            });
        }
        println!("{v}");
        return;
    }

    println!("stopped after {} iterations", s.iterations);
    if stats {
        eprintln!("Stats:");
        eprintln!(
            "  iterations={} ({:.0}/s) max_iteration_us={}",
            s.iterations,
            s.iterations_per_sec(report.elapsed_us),
            s.max_iteration_us
        );
        eprintln!(
            "  bus polls={} served={} ignored={} errors={}",
            s.bus_polls, s.bus_served, s.bus_ignored, s.bus_errors
        );
        eprintln!(
            "  redraws={} failed={} heartbeat toggles={} failed={}",
            s.redraws, s.redraw_failures, s.heartbeat_toggles, s.heartbeat_failures
        );
        if let Some(n) = report.master_replies {
            eprintln!("  master replies={n}");
        }
    }
}
