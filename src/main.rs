use blockanim::config::Config;
use blockanim::daemon::AnimationEngine;
use blockanim::domain::{Loop, MapId, NEVER};
use blockanim::host::{BlockChange, BlockSink, ViewerId};
use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use log::info;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

mod cli;

use cli::Cli;
use cli::commands::Commands;

fn setup_logging() -> Result<()> {
    // Create log directory
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("blockanim")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    let log_file = log_dir.join("blockanim.log");

    // Setup env_logger with file output
    let target = Box::new(
        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)
            .context("Failed to open log file")?,
    );

    env_logger::Builder::from_default_env()
        .target(env_logger::Target::Pipe(target))
        .init();

    info!("Logging initialized, writing to: {}", log_file.display());
    Ok(())
}

/// Prints every batch the engine hands out
struct ConsoleSink;

impl BlockSink for ConsoleSink {
    fn broadcast(&self, map: &MapId, changes: &[BlockChange]) {
        for change in changes {
            println!("{} {} -> {}", map.to_string().cyan(), change.position, change.block.to_string().green());
        }
    }

    fn send_to_viewer(&self, viewer: &ViewerId, changes: &[BlockChange]) {
        for change in changes {
            println!("{} {} -> {}", viewer.to_string().magenta(), change.position, change.block);
        }
    }
}

/// Engine over a flat world that prints broadcasts, with `map` loaded
fn open_map(config: &Config, map: &str) -> Result<(AnimationEngine, MapId)> {
    let map = MapId::new(map).context("Invalid map name")?;
    let engine = AnimationEngine::new(config, Arc::new(config.flat_world()), Arc::new(ConsoleSink));
    engine.map_loaded(&map)?;
    Ok((engine, map))
}

fn run_application(cli: &Cli, config: &Config) -> Result<()> {
    info!("Starting application");

    if cli.is_verbose() {
        println!("{}", "Verbose mode enabled".yellow());
    }

    match &cli.command {
        None | Some(Commands::List) => handle_list_command(config),
        Some(Commands::Show { map, json }) => handle_show_command(map, *json, config),
        Some(Commands::Place {
            map,
            at,
            interval,
            duration,
            start,
            end,
            block,
            placement,
        }) => {
            let lp = Loop::new(*interval, *duration, *start, end.unwrap_or(NEVER), *block)?;
            edit(config, map, |engine, map| {
                engine.editor().place(map, at.position(), placement.placement(), lp)?;
                Ok(format!("Placed {} at {}", describe(&lp), at.position()))
            })
        }
        Some(Commands::Sequence {
            map,
            at,
            frames,
            start,
            end,
            placement,
        }) => {
            let loops = Loop::sequence(*start, end.unwrap_or(NEVER), frames)?;
            let count = loops.len();
            edit(config, map, |engine, map| {
                engine.editor().place_many(map, at.position(), placement.placement(), loops)?;
                Ok(format!("Placed {} frames at {}", count, at.position()))
            })
        }
        Some(Commands::Delete { map, at, index, block }) => {
            let selector = Commands::delete_selector(*index, *block);
            edit(config, map, |engine, map| {
                let removed = engine.editor().delete(map, at.position(), selector)?;
                Ok(format!("Removed {} loops at {}", removed, at.position()))
            })
        }
        Some(Commands::Swap {
            map,
            at,
            first,
            second,
        }) => edit(config, map, |engine, map| {
            let swapped = engine.editor().swap(map, at.position(), *first, *second)?;
            Ok(if swapped {
                format!("Swapped {} and {} at {}", first, second, at.position())
            } else {
                "Nothing to swap".to_string()
            })
        }),
        Some(Commands::Shift { map, at, delay }) => edit(config, map, |engine, map| {
            let shifted = engine.editor().shift(map, at.position(), *delay)?;
            Ok(if shifted {
                format!("Shifted {} by {} ticks", at.position(), delay)
            } else {
                format!("No animation at {}", at.position())
            })
        }),
        Some(Commands::Reverse { map, at }) => edit(config, map, |engine, map| {
            Ok(match engine.editor().reverse(map, at.position())? {
                Some(mode) => format!("Reversed {} ({})", at.position(), mode),
                None => format!("No animation at {}", at.position()),
            })
        }),
        Some(Commands::Run { map, ticks, realtime }) => handle_run_command(map, *ticks, *realtime, config),
    }
}

/// Load a map, apply one edit and save the result
fn edit(config: &Config, map: &str, f: impl FnOnce(&AnimationEngine, &MapId) -> Result<String>) -> Result<()> {
    let (engine, map) = open_map(config, map)?;
    let message = f(&engine, &map)?;
    let report = engine.save_all();
    if let Some(failed) = report.failed.first() {
        eyre::bail!("Failed to save animations for {}", failed);
    }
    println!("{} {}", "Done:".green(), message);
    Ok(())
}

fn describe(lp: &Loop) -> String {
    let end = if lp.is_endless() { "never".to_string() } else { lp.end.to_string() };
    format!(
        "block {} every {} ticks for {} (start {}, end {})",
        lp.block, lp.interval, lp.duration, lp.start, end
    )
}

fn handle_list_command(config: &Config) -> Result<()> {
    let engine = AnimationEngine::new(config, Arc::new(config.flat_world()), Arc::new(ConsoleSink));
    let maps = engine.store().list()?;
    if maps.is_empty() {
        println!("{}", "No stored animations".yellow());
    }
    for map in maps {
        println!("{}", map);
    }
    Ok(())
}

fn handle_show_command(map: &str, json: bool, config: &Config) -> Result<()> {
    let (engine, map) = open_map(config, map)?;
    let Some(state) = engine.registry().snapshot(&map)? else {
        println!("{} {}", "No animations on".yellow(), map);
        return Ok(());
    };

    if json {
        let cells: Vec<_> = state.cells().collect();
        let doc = serde_json::json!({
            "map": map,
            "loop_count": state.loop_count(),
            "cells": cells,
        });
        println!("{}", serde_json::to_string_pretty(&doc)?);
        return Ok(());
    }

    println!("{} {} ({} loops)", "Map:".green(), map, state.loop_count());
    for cell in state.cells() {
        println!("  {}", cell.position().to_string().cyan());
        for (index, lp) in cell.loops() {
            println!("    [{}] {}", index, describe(lp));
        }
    }
    Ok(())
}

fn handle_run_command(map: &str, ticks: u32, realtime: bool, config: &Config) -> Result<()> {
    let (engine, map) = open_map(config, map)?;
    if !engine.registry().is_active(&map)? {
        println!("{} {}", "No animations on".yellow(), map);
        return Ok(());
    }

    if realtime {
        let runtime = tokio::runtime::Runtime::new().context("Failed to start runtime")?;
        let period = engine.scheduler().config().tick_interval;
        runtime.block_on(async {
            engine.scheduler().start()?;
            tokio::time::sleep(period * ticks).await;
            engine.scheduler().stop();
            Ok::<_, eyre::Report>(())
        })?;
    } else {
        for tick in 0..ticks {
            println!("{} {}", "tick".dimmed(), tick);
            engine.scheduler().tick_once();
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    // Setup logging first
    setup_logging().context("Failed to setup logging")?;

    // Parse CLI arguments
    let cli = Cli::parse();

    // Load configuration
    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    info!("Starting with config from: {:?}", cli.config);

    // Run the main application logic
    run_application(&cli, &config).context("Application failed")?;

    Ok(())
}
