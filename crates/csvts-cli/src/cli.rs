//! Argument definitions for `csvts`.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;
use csvts_core::{AggregationKind, Bucket, StorageKind};
use csvts_model::UploadId;

#[derive(Parser)]
#[command(
    name = "csvts",
    version,
    about = "Ingest time-series CSV files and query them by time window",
    long_about = "Ingest time-series CSV files and query them by time window.\n\n\
                  Each file gets its timestamp column detected and its other columns typed.\n\
                  Rows are stored sparsely and rebuilt into tables on query."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Adjust log verbosity (-v for info, -vv for debug, -q for errors only).
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Control ANSI color output (auto, always, never).
    #[command(flatten)]
    pub color: Color,

    /// Explicit log level (overrides -v/-q flags).
    #[arg(long = "log-level", value_enum, global = true)]
    pub log_level: Option<LogLevelArg>,

    /// Log output format (pretty for human, json for machine parsing).
    #[arg(
        long = "log-format",
        value_enum,
        default_value = "pretty",
        global = true
    )]
    pub log_format: LogFormatArg,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,

    /// Allow cell values to appear in trace logs.
    #[arg(long = "log-data", global = true)]
    pub log_data: bool,

    /// JSON configuration file.
    #[arg(long = "config", value_name = "PATH", env = "CSVTS_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Directory of the observation store (overrides the config file).
    #[arg(long = "data-dir", value_name = "DIR", env = "CSVTS_DATA_DIR", global = true)]
    pub data_dir: Option<PathBuf>,

    /// Blob backend for archived uploads: local or remote.
    #[arg(long = "storage-kind", env = "CSVTS_STORAGE_KIND", global = true)]
    pub storage_kind: Option<StorageKind>,

    /// Directory for archived uploads.
    #[arg(
        long = "local-storage-path",
        value_name = "DIR",
        env = "CSVTS_LOCAL_STORAGE_PATH",
        global = true
    )]
    pub local_storage_path: Option<PathBuf>,

    /// Largest accepted upload in bytes.
    #[arg(
        long = "max-file-size",
        value_name = "BYTES",
        env = "CSVTS_MAX_FILE_SIZE",
        global = true
    )]
    pub max_file_size: Option<u64>,

    /// Do not archive raw uploads.
    #[arg(long = "no-archive", global = true)]
    pub no_archive: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Ingest a CSV file and print its inferred schema.
    Ingest(IngestArgs),

    /// Show an upload's records as a table.
    Query(QueryArgs),

    /// Write an upload's records as CSV.
    Export(ExportArgs),

    /// Aggregate a numeric column per day, week, or month.
    Aggregate(AggregateArgs),

    /// List stored uploads.
    List,

    /// Print the effective configuration as JSON.
    ShowConfig,
}

#[derive(Args)]
pub struct IngestArgs {
    /// CSV file to ingest.
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Address recorded as the upload's origin.
    #[arg(long = "client-address", value_name = "ADDR", default_value = "127.0.0.1")]
    pub client_address: String,
}

/// Optional inclusive time bounds.
#[derive(Args)]
pub struct WindowArgs {
    /// Earliest observation time to include.
    #[arg(long = "start", value_name = "TIME")]
    pub start: Option<String>,

    /// Latest observation time to include.
    #[arg(long = "end", value_name = "TIME")]
    pub end: Option<String>,
}

#[derive(Args)]
pub struct QueryArgs {
    #[arg(value_name = "UPLOAD_ID")]
    pub upload_id: UploadId,

    #[command(flatten)]
    pub window: WindowArgs,
}

#[derive(Args)]
pub struct ExportArgs {
    #[arg(value_name = "UPLOAD_ID")]
    pub upload_id: UploadId,

    #[command(flatten)]
    pub window: WindowArgs,

    /// Output file (default: stdout).
    #[arg(long = "output", short = 'o', value_name = "PATH")]
    pub output: Option<PathBuf>,
}

#[derive(Args)]
pub struct AggregateArgs {
    #[arg(value_name = "UPLOAD_ID")]
    pub upload_id: UploadId,

    #[command(flatten)]
    pub window: WindowArgs,

    /// Column to aggregate.
    #[arg(long = "field", value_name = "COLUMN")]
    pub field: String,

    /// Statistic per period: sum, mean, or median.
    #[arg(long = "kind", default_value = "sum")]
    pub kind: AggregationKind,

    /// Period length: daily, weekly, or monthly.
    #[arg(long = "bucket", default_value = "daily")]
    pub bucket: Bucket,
}

/// CLI log level choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// CLI log format choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}
