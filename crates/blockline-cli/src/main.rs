use anyhow::{Context, Result};
use blockline_config::Config;
use blockline_engine::SyncOptions;
use relative_path::RelativePathBuf;
use std::{env, path::PathBuf, process};

mod script;

use script::{Replay, Script};

/// Resolve a script argument: as given if it exists, otherwise relative to
/// the configured scripts directory
fn resolve_script(arg: &str, config: &Config) -> Result<PathBuf> {
    let path = PathBuf::from(arg);
    if path.exists() || path.is_absolute() {
        return Ok(path);
    }
    match &config.scripts_path {
        Some(scripts_path) => {
            let relative = RelativePathBuf::from_path(&path)
                .with_context(|| format!("Script path '{arg}' is not a relative path"))?;
            Ok(relative.to_path(scripts_path))
        }
        None => Ok(path),
    }
}

fn sync_options(config: &Config) -> SyncOptions {
    SyncOptions {
        defer_until_render: config.sync.defer_until_render,
        notify_on_failed_edit: config.sync.notify_on_failed_edit,
    }
}

fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();
    if args.len() != 2 {
        eprintln!("Usage: {} <script.toml>", args[0]);
        process::exit(1);
    }

    let config = match Config::load_or_default() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: Failed to load config file: {e}");
            eprintln!("Fix or remove {}", Config::config_path().display());
            process::exit(1);
        }
    };

    // RUST_LOG overrides the configured level
    env_logger::Builder::new()
        .parse_filters(&config.log.level)
        .parse_default_env()
        .init();

    let script_path = resolve_script(&args[1], &config)?;
    let content = std::fs::read_to_string(&script_path)
        .with_context(|| format!("Failed to read script '{}'", script_path.display()))?;
    let script = Script::parse(&content)?;
    log::debug!(
        "replaying {} events from {}",
        script.events.len(),
        script_path.display()
    );

    let replay = Replay::run(&script, sync_options(&config))?;
    print!("{}", replay.report());

    Ok(())
}
