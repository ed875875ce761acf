//! CLI argument definitions for cloud-sweep.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use cs_cli_common::LogLevel;
use cs_provider::{
    AliyunConfig, DEFAULT_ALIYUN_ENDPOINT, DEFAULT_TENCENT_REGION, DEFAULT_TENCENT_SCHEME,
    ProviderConfig, SessionSettings, TencentConfig,
};
use cs_types::{MAX_BATCH_SIZE, ProviderKind};

/// Delete stale objects from cloud storage buckets.
///
/// Selects buckets by regular expression and objects by glob pattern and
/// modification date, shows what would be removed, and deletes it in
/// rate-limited batches.
///
/// ## Examples
///
/// Preview a cleanup:
///   cloud-sweep clean tencent "test-.*" "*.log" 2024-01-01 --dry-run
///
/// Delete with an explicit timezone and no prompt:
///   cloud-sweep clean aliyun "^prod-logs$" "app/*.gz" 2024-06-01 \
///       --timezone Asia/Shanghai --yes
///
/// Extension breakdown of everything older than a week:
///   cloud-sweep stat tencent ".*" -7d
#[derive(Parser, Debug)]
#[command(name = "cloud-sweep")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Log level
    #[arg(long, value_enum, default_value = "info", global = true)]
    pub log_level: LogLevel,

    /// Also append JSON log lines to this file
    #[arg(long, env = "LOG_FILE", global = true)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Delete objects matching the patterns that are older than the cutoff
    Clean(CleanArgs),

    /// List accessible buckets
    ListBuckets(ListBucketsArgs),

    /// List objects that a clean would delete
    ListFiles(ListFilesArgs),

    /// Show per-bucket file type statistics for objects older than the cutoff
    Stat(StatArgs),
}

/// Storage provider argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ProviderArg {
    /// Tencent Cloud COS
    #[value(alias = "cos")]
    Tencent,
    /// Alibaba Cloud OSS
    #[value(alias = "oss")]
    Aliyun,
}

impl From<ProviderArg> for ProviderKind {
    fn from(arg: ProviderArg) -> Self {
        match arg {
            ProviderArg::Tencent => ProviderKind::Tencent,
            ProviderArg::Aliyun => ProviderKind::Aliyun,
        }
    }
}

/// Provider credentials and connection settings.
#[derive(Args, Debug, Clone)]
pub struct ConnectionArgs {
    /// Tencent SecretId
    #[arg(long, env = "TENCENT_SECRET_ID", hide_env_values = true)]
    pub tencent_secret_id: Option<String>,

    /// Tencent SecretKey
    #[arg(long, env = "TENCENT_SECRET_KEY", hide_env_values = true)]
    pub tencent_secret_key: Option<String>,

    /// Tencent default region
    #[arg(long, env = "TENCENT_REGION", default_value = DEFAULT_TENCENT_REGION)]
    pub tencent_region: String,

    /// Tencent endpoint scheme (https or http)
    #[arg(long, env = "TENCENT_SCHEME", default_value = DEFAULT_TENCENT_SCHEME)]
    pub tencent_scheme: String,

    /// Aliyun AccessKey ID
    #[arg(long, env = "ALIYUN_ACCESS_KEY_ID", hide_env_values = true)]
    pub aliyun_access_key_id: Option<String>,

    /// Aliyun AccessKey secret
    #[arg(long, env = "ALIYUN_ACCESS_KEY_SECRET", hide_env_values = true)]
    pub aliyun_access_key_secret: Option<String>,

    /// Aliyun endpoint
    #[arg(long, env = "ALIYUN_ENDPOINT", default_value = DEFAULT_ALIYUN_ENDPOINT)]
    pub aliyun_endpoint: String,

    /// Per-request timeout in seconds
    #[arg(long, default_value = "60", value_parser = parse_positive_u64)]
    pub timeout: u64,

    /// Attempts per request, including the first
    #[arg(long, default_value = "3", value_parser = parse_positive_u32)]
    pub max_attempts: u32,

    /// Maximum API calls per second
    #[arg(long, env = "RATE_LIMIT", default_value = "100", value_parser = parse_positive_u32)]
    pub rate_limit: u32,

    /// Burst capacity (defaults to the rate limit)
    #[arg(long, value_parser = parse_positive_u32)]
    pub burst: Option<u32>,
}

impl ConnectionArgs {
    /// Build the provider config for `provider` from these arguments.
    pub fn provider_config(&self, provider: ProviderArg) -> ProviderConfig {
        match provider {
            ProviderArg::Tencent => ProviderConfig::Tencent(
                TencentConfig::new(
                    self.tencent_secret_id.clone().unwrap_or_default(),
                    self.tencent_secret_key.clone().unwrap_or_default(),
                )
                .with_region(&self.tencent_region)
                .with_scheme(&self.tencent_scheme),
            ),
            ProviderArg::Aliyun => ProviderConfig::Aliyun(
                AliyunConfig::new(
                    self.aliyun_access_key_id.clone().unwrap_or_default(),
                    self.aliyun_access_key_secret.clone().unwrap_or_default(),
                )
                .with_endpoint(&self.aliyun_endpoint),
            ),
        }
    }

    /// SDK session settings.
    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings::default()
            .with_timeout(self.timeout)
            .with_max_attempts(self.max_attempts)
    }
}

#[derive(Args, Debug)]
pub struct CleanArgs {
    /// Storage provider
    #[arg(value_enum)]
    pub provider: ProviderArg,

    /// Regular expression selecting bucket names (unanchored)
    pub bucket_pattern: String,

    /// Glob pattern matched against full object keys
    pub file_pattern: String,

    /// Delete objects modified before this date (YYYY-MM-DD, RFC 3339, or -7d)
    #[arg(allow_hyphen_values = true)]
    pub before: String,

    /// Timezone for the date (IANA name such as Asia/Shanghai, UTC, or local)
    #[arg(long, visible_alias = "tz")]
    pub timezone: Option<String>,

    /// Only list keys under this prefix
    #[arg(long)]
    pub prefix: Option<String>,

    /// Show what would be deleted without deleting anything
    #[arg(long)]
    pub dry_run: bool,

    /// Skip the confirmation prompt
    #[arg(long, short = 'y', visible_alias = "no-confirm")]
    pub yes: bool,

    /// Keys per delete call (1-1000)
    #[arg(long, env = "BATCH_SIZE", default_value = "100", value_parser = parse_batch_size)]
    pub batch_size: usize,

    #[command(flatten)]
    pub connection: ConnectionArgs,
}

#[derive(Args, Debug)]
pub struct ListBucketsArgs {
    /// Storage provider
    #[arg(value_enum)]
    pub provider: ProviderArg,

    /// Only show buckets whose names match this regular expression
    #[arg(long)]
    pub pattern: Option<String>,

    #[command(flatten)]
    pub connection: ConnectionArgs,
}

#[derive(Args, Debug)]
pub struct ListFilesArgs {
    /// Storage provider
    #[arg(value_enum)]
    pub provider: ProviderArg,

    /// Regular expression selecting bucket names (unanchored)
    pub bucket_pattern: String,

    /// Glob pattern matched against full object keys
    pub file_pattern: String,

    /// List objects modified before this date (YYYY-MM-DD, RFC 3339, or -7d)
    #[arg(allow_hyphen_values = true)]
    pub before: String,

    /// Timezone for the date (IANA name such as Asia/Shanghai, UTC, or local)
    #[arg(long, visible_alias = "tz")]
    pub timezone: Option<String>,

    /// Only list keys under this prefix
    #[arg(long)]
    pub prefix: Option<String>,

    /// Output format
    #[arg(long, value_enum, default_value = "text")]
    pub format: ListFormat,

    #[command(flatten)]
    pub connection: ConnectionArgs,
}

#[derive(Args, Debug)]
pub struct StatArgs {
    /// Storage provider
    #[arg(value_enum)]
    pub provider: ProviderArg,

    /// Regular expression selecting bucket names (unanchored)
    pub bucket_pattern: String,

    /// Count objects modified before this date (YYYY-MM-DD, RFC 3339, or -7d)
    #[arg(allow_hyphen_values = true)]
    pub before: String,

    /// Timezone for the date (IANA name such as Asia/Shanghai, UTC, or local)
    #[arg(long, visible_alias = "tz")]
    pub timezone: Option<String>,

    /// Only list keys under this prefix
    #[arg(long)]
    pub prefix: Option<String>,

    #[command(flatten)]
    pub connection: ConnectionArgs,
}

/// Output format for `list-files`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ListFormat {
    /// Table per bucket with totals
    Text,
    /// One JSON object per line
    Jsonl,
}

/// Parse a positive u32 (>= 1).
fn parse_positive_u32(s: &str) -> Result<u32, String> {
    let value: u32 = s
        .parse()
        .map_err(|_| format!("'{s}' is not a valid number"))?;
    if value < 1 {
        return Err(format!("{value} is not in 1.."));
    }
    Ok(value)
}

/// Parse a positive u64 (>= 1).
fn parse_positive_u64(s: &str) -> Result<u64, String> {
    let value: u64 = s
        .parse()
        .map_err(|_| format!("'{s}' is not a valid number"))?;
    if value < 1 {
        return Err(format!("{value} is not in 1.."));
    }
    Ok(value)
}

/// Parse a delete batch size (1-1000).
fn parse_batch_size(s: &str) -> Result<usize, String> {
    let value: usize = s
        .parse()
        .map_err(|_| format!("'{s}' is not a valid number"))?;
    if !(1..=MAX_BATCH_SIZE).contains(&value) {
        return Err(format!("{value} is not in 1..={MAX_BATCH_SIZE}"));
    }
    Ok(value)
}
