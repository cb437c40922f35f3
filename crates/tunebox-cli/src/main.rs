//! tunebox - playlists for a local music library

mod cli;
mod commands;
mod library_file;

use anyhow::Result;
use clap::Parser;
use tunebox_core::config::{default_config_path, load_config, TuneboxConfig};

use cli::CliArgs;
use commands::Session;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let args = CliArgs::parse();
    if let Err(e) = run(args) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(args: CliArgs) -> Result<()> {
    let config_path = args.config.unwrap_or_else(default_config_path);
    let mut config: TuneboxConfig = load_config(&config_path);
    if let Some(data_dir) = args.data_dir {
        config.data_dir = Some(data_dir);
    }
    log::debug!("Using data directory {:?}", config.data_dir());

    let mut session = Session::open(&config, &config_path)?;
    let message = session.run(args.action, &mut std::io::stdout().lock())?;
    println!("{}", message);
    Ok(())
}
