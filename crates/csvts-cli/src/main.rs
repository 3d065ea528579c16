//! `csvts` command-line tool.

use std::io::{self, IsTerminal};

use anyhow::{Context, Result};
use clap::{ColorChoice, Parser};
use csvts_cli::commands::{
    config_json, parse_window, run_aggregate, run_export, run_ingest, run_list, run_query,
};
use csvts_cli::logging::{LogConfig, LogFormat, init_logging};
use csvts_core::{ServiceConfig, ServiceError};
use tracing::level_filters::LevelFilter;

mod cli;
mod summary;

use crate::cli::{Cli, Command, LogFormatArg, LogLevelArg, WindowArgs};
use crate::summary::{print_aggregate, print_ingest_summary, print_rows, print_uploads};

fn main() {
    let cli = Cli::parse();
    cli.color.write_global();
    let log_config = log_config_from_cli(&cli);
    if let Err(error) = init_logging(&log_config) {
        eprintln!("error: failed to initialize logging: {error}");
        std::process::exit(1);
    }
    let exit_code = match run(cli) {
        Ok(()) => 0,
        Err(error) => {
            report_error(&error);
            1
        }
    };
    std::process::exit(exit_code);
}

fn run(cli: Cli) -> Result<()> {
    let config = config_from_cli(&cli)?;
    match cli.command {
        Command::ShowConfig => println!("{}", config_json(&config)?),
        Command::Ingest(args) => {
            let store = config.open_store().context("failed to open data directory")?;
            let report = run_ingest(&config, &store, &args.file, &args.client_address)?;
            print_ingest_summary(&report);
        }
        Command::Query(args) => {
            let store = config.open_store().context("failed to open data directory")?;
            let window = window_from_args(&args.window)?;
            print_rows(&run_query(&store, args.upload_id, &window)?);
        }
        Command::Export(args) => {
            let store = config.open_store().context("failed to open data directory")?;
            let window = window_from_args(&args.window)?;
            run_export(&store, args.upload_id, &window, args.output.as_deref())?;
        }
        Command::Aggregate(args) => {
            let store = config.open_store().context("failed to open data directory")?;
            let window = window_from_args(&args.window)?;
            let points = run_aggregate(
                &store,
                args.upload_id,
                &window,
                &args.field,
                args.kind,
                args.bucket,
            )?;
            print_aggregate(&points);
        }
        Command::List => {
            let store = config.open_store().context("failed to open data directory")?;
            print_uploads(&run_list(&store)?);
        }
    }
    Ok(())
}

fn window_from_args(args: &WindowArgs) -> Result<csvts_model::TimeWindow> {
    parse_window(args.start.as_deref(), args.end.as_deref())
}

/// Config file (or defaults) with flag and environment overrides applied.
fn config_from_cli(cli: &Cli) -> Result<ServiceConfig> {
    let mut config = ServiceConfig::load_or_default(cli.config.as_deref())?;
    if let Some(dir) = &cli.data_dir {
        config.data_dir.clone_from(dir);
    }
    if let Some(kind) = cli.storage_kind {
        config.storage_kind = kind;
    }
    if let Some(path) = &cli.local_storage_path {
        config.local_storage_path.clone_from(path);
    }
    if let Some(size) = cli.max_file_size {
        config.max_file_size = size;
    }
    if cli.no_archive {
        config.archive_uploads = false;
    }
    Ok(config)
}

fn report_error(error: &anyhow::Error) {
    if let Some(service) = error.downcast_ref::<ServiceError>() {
        eprintln!("error: {}", service.user_message());
        if let Some(hint) = service.suggestion() {
            eprintln!("hint: {hint}");
        }
    } else {
        eprintln!("error: {error:#}");
    }
}

/// Build logging configuration from CLI flags with consistent precedence.
fn log_config_from_cli(cli: &Cli) -> LogConfig {
    let mut config = LogConfig {
        level_filter: cli.verbosity.tracing_level_filter(),
        ..LogConfig::default()
    };
    config.use_env_filter = !(cli.verbosity.is_present() || cli.log_level.is_some());
    if let Some(level) = cli.log_level {
        config.level_filter = match level {
            LogLevelArg::Error => LevelFilter::ERROR,
            LogLevelArg::Warn => LevelFilter::WARN,
            LogLevelArg::Info => LevelFilter::INFO,
            LogLevelArg::Debug => LevelFilter::DEBUG,
            LogLevelArg::Trace => LevelFilter::TRACE,
        };
    }
    config.format = match cli.log_format {
        LogFormatArg::Pretty => LogFormat::Pretty,
        LogFormatArg::Compact => LogFormat::Compact,
        LogFormatArg::Json => LogFormat::Json,
    };
    config.log_file = cli.log_file.clone();
    config.log_data = cli.log_data;
    config.with_ansi = match cli.color.color {
        ColorChoice::Always => true,
        ColorChoice::Never => false,
        ColorChoice::Auto => cli.log_file.is_none() && io::stderr().is_terminal(),
    };
    config
}
