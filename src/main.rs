// mgit-rs: Multi-repository Git batch tool
//
// SPDX-FileCopyrightText: 2026 The mgit-rs authors
// SPDX-License-Identifier: GPL-3.0-or-later

//! Entry point.
//!
//! ```text
//! cli::parse() --> Logging --> Command Dispatch
//!   Clone | Exec | Options | Configs | Version
//! ```

use std::process::ExitCode;

use mgit_rs::cli::global::GlobalOptions;
use mgit_rs::cli::{self, Command};
use mgit_rs::cmd::clone::run_clone_command;
use mgit_rs::cmd::config::{run_configs_command, run_options_command};
use mgit_rs::cmd::exec::run_exec_command;
use mgit_rs::config::Config;
use mgit_rs::logging::init_logging;
use mgit_rs::logging::{LogConfig, LogLevel};

use mimalloc::MiMalloc;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = cli::parse();

    let log_config = build_log_config(&cli.global);
    let _log_guard = match init_logging(&log_config) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {e}");
            return ExitCode::FAILURE;
        }
    };

    dispatch_command(&cli).await
}

fn build_log_config(global: &GlobalOptions) -> LogConfig {
    let console_level = global
        .log_level
        .and_then(LogLevel::from_u8)
        .unwrap_or(LogLevel::INFO);

    let file_level = global
        .file_log_level
        .and_then(LogLevel::from_u8)
        .unwrap_or(console_level);

    LogConfig::builder()
        .with_console_level(console_level)
        .with_file_level(file_level)
        .maybe_with_log_file(global.log_file.as_ref().map(|p| p.display().to_string()))
        .build()
}

async fn dispatch_command(cli: &cli::Cli) -> ExitCode {
    let result = match &cli.command {
        Some(Command::Version) => {
            handle_version_command();
            Ok(())
        }
        Some(Command::Options) => {
            load_config(&cli.global).map(|config| run_options_command(&config))
        }
        Some(Command::Configs) => match cli.global.config_loader() {
            Ok(loader) => {
                run_configs_command(&loader.format_sources());
                Ok(())
            }
            Err(e) => Err(e),
        },
        Some(Command::Clone(args)) => match load_config(&cli.global) {
            Ok(config) => {
                let dry = cli.global.dry || config.global.dry;
                run_clone_command(args, &config, dry).await
            }
            Err(e) => Err(e),
        },
        Some(Command::Exec(args)) => match load_config(&cli.global) {
            Ok(config) => {
                let dry = cli.global.dry || config.global.dry;
                run_exec_command(args, &config, dry).await
            }
            Err(e) => Err(e),
        },
        None => {
            eprintln!("No command specified. Use --help for usage information.");
            Err(anyhow::anyhow!("No command specified"))
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn handle_version_command() {
    println!("{}", env!("CARGO_PKG_VERSION"));
}

fn load_config(global: &GlobalOptions) -> mgit_rs::error::Result<Config> {
    let loader = global.config_loader()?;
    loader.build().map_err(|e| {
        eprintln!("Failed to load config: {e}");
        e
    })
}
