//! Main execution logic for cloud-sweep.

use std::collections::BTreeMap;
use std::io::{self, Write};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use cs_cli_common::{format_bytes, format_number, render_table};
use cs_provider::{Backend, RateLimitedProvider};
use cs_ratelimit::RateLimiter;
use cs_sweeper::{
    CompiledPatterns, DeletionStats, SafeDeleter, Scanner, SweepConfig, parse_cutoff, summarize,
};
use cs_traits::StorageProvider;
use cs_types::{BucketDescriptor, DeletionSummary, FileDescriptor, FileTypeSummary};
use futures::{StreamExt, TryStreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::args::{
    CleanArgs, Cli, Command, ConnectionArgs, ListBucketsArgs, ListFilesArgs, ListFormat,
    ProviderArg, StatArgs,
};

type Provider = RateLimitedProvider<Backend>;

/// Execute the selected command.
///
/// Returns run statistics for `clean`, `None` for the read-only commands.
pub async fn execute(cli: Cli) -> Result<Option<DeletionStats>> {
    match cli.command {
        Command::Clean(args) => clean(args).await.map(Some),
        Command::ListBuckets(args) => list_buckets(args).await.map(|()| None),
        Command::ListFiles(args) => list_files(args).await.map(|()| None),
        Command::Stat(args) => stat(args).await.map(|()| None),
    }
}

/// Connect to the provider behind one shared rate limiter.
async fn connect(provider: ProviderArg, connection: &ConnectionArgs) -> Result<Arc<Provider>> {
    let burst = connection.burst.unwrap_or(connection.rate_limit);
    let limiter = Arc::new(RateLimiter::with_burst(connection.rate_limit, burst));

    let config = connection.provider_config(provider);
    let kind = config.kind();

    let provider = cs_provider::connect(config, &connection.session_settings(), limiter)
        .await
        .with_context(|| format!("Failed to connect to {kind}"))?;

    info!(provider = %kind, rate_limit = connection.rate_limit, burst, "Provider ready");
    Ok(Arc::new(provider))
}

fn scanner(
    provider: Arc<Provider>,
    patterns: CompiledPatterns,
    cutoff: DateTime<Utc>,
    prefix: Option<&str>,
) -> Scanner<Provider> {
    let scanner = Scanner::new(provider, patterns, cutoff);
    match prefix {
        Some(prefix) => scanner.with_prefix(prefix),
        None => scanner,
    }
}

async fn clean(args: CleanArgs) -> Result<DeletionStats> {
    let cutoff = parse_cutoff(&args.before, args.timezone.as_deref())?;

    let mut config = SweepConfig::new(&args.bucket_pattern, &args.file_pattern, cutoff)
        .with_batch_size(args.batch_size)
        .with_rate_limit(args.connection.rate_limit)
        .with_dry_run(args.dry_run);
    if let Some(burst) = args.connection.burst {
        config = config.with_burst(burst);
    }
    if let Some(prefix) = &args.prefix {
        config = config.with_prefix(prefix);
    }
    let patterns = config.validate()?;

    info!(
        bucket_pattern = %config.bucket_pattern,
        file_pattern = %config.file_pattern,
        cutoff = %cutoff,
        dry_run = config.dry_run,
        batch_size = config.batch_size,
        "Starting clean"
    );

    let provider = connect(args.provider, &args.connection).await?;
    let scanner = scanner(
        Arc::clone(&provider),
        patterns,
        cutoff,
        config.prefix.as_deref(),
    );

    eprintln!("Scanning for files...");
    let summary = summarize(provider.kind(), scanner.scan())
        .await
        .context("Scan failed")?;

    let mut stats = DeletionStats::new();
    if summary.is_empty() {
        println!("No files found matching criteria.");
        stats.complete();
        return Ok(stats);
    }

    print!("{}", render_summary(&summary, cutoff));

    if !args.yes && !confirm(summary.total_files, config.dry_run).await? {
        println!("Aborted, nothing was deleted.");
        stats.complete();
        return Ok(stats);
    }

    let token = CancellationToken::new();
    let deleter = SafeDeleter::new(Arc::clone(&provider), config.batch_size)
        .with_cancellation(token.clone());

    // The summary already holds everything a dry run reports
    if config.dry_run {
        stats.record_dry_run(&summary, deleter.batch_size());
        stats.complete();
        return Ok(stats);
    }

    let watcher = tokio::spawn({
        let token = token.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_err() {
                return;
            }
            warn!("Interrupt received, stopping after the current batch");
            token.cancel();

            if tokio::signal::ctrl_c().await.is_ok() {
                eprintln!("Second interrupt received, exiting immediately.");
                std::process::exit(130);
            }
        }
    });

    // Second pass: the scan is repeated rather than buffered
    let mut outcomes = deleter.run(scanner.scan());
    let mut failure = None;
    while let Some(outcome) = outcomes.next().await {
        match outcome {
            Ok(outcome) => stats.record(&outcome),
            Err(e) => {
                failure = Some(e);
                break;
            }
        }
    }
    drop(outcomes);
    watcher.abort();

    stats.batches = deleter.batches_flushed();
    stats.complete();

    if token.is_cancelled() {
        eprintln!("Interrupted: remaining files were not attempted.");
    }

    if let Some(e) = failure {
        report(&stats);
        return Err(e).context("Deletion stopped");
    }

    info!(
        deleted = stats.deleted,
        failed = stats.failed,
        simulated = stats.simulated,
        "Clean completed"
    );

    Ok(stats)
}

async fn list_buckets(args: ListBucketsArgs) -> Result<()> {
    let patterns = CompiledPatterns::new(args.pattern.as_deref().unwrap_or(""), "*")?;
    let provider = connect(args.provider, &args.connection).await?;
    let scanner = scanner(Arc::clone(&provider), patterns, Utc::now(), None);

    let mut buckets: Vec<BucketDescriptor> = scanner
        .matching_buckets()
        .try_collect()
        .await
        .context("Failed to list buckets")?;

    for bucket in buckets.iter_mut().filter(|b| b.region.is_none()) {
        match provider.bucket_location(&bucket.name).await {
            Ok(location) => bucket.region = location,
            Err(e) => debug!(bucket = %bucket.name, error = %e, "Bucket location unavailable"),
        }
    }

    if buckets.is_empty() {
        println!("No buckets found.");
        return Ok(());
    }

    let rows: Vec<Vec<String>> = buckets.iter().map(bucket_row).collect();
    print!("{}", render_table(&["Bucket", "Region", "Created"], &rows));
    println!("\nTotal: {} bucket{}", buckets.len(), plural(buckets.len() as u64));

    Ok(())
}

async fn list_files(args: ListFilesArgs) -> Result<()> {
    let cutoff = parse_cutoff(&args.before, args.timezone.as_deref())?;
    let patterns = CompiledPatterns::new(&args.bucket_pattern, &args.file_pattern)?;
    let provider = connect(args.provider, &args.connection).await?;
    let scanner = scanner(provider, patterns, cutoff, args.prefix.as_deref());

    let mut files = scanner.scan();
    let mut current: Option<(String, u64, u64)> = None;
    let mut total_files = 0u64;
    let mut total_bytes = 0u64;
    let mut buckets = 0u64;

    while let Some(file) = files.next().await {
        let file = file.context("Scan failed")?;
        total_files += 1;
        total_bytes += file.size;

        if args.format == ListFormat::Jsonl {
            println!("{}", serde_json::to_string(&file)?);
            continue;
        }

        if current.as_ref().is_none_or(|(bucket, _, _)| *bucket != file.bucket) {
            if let Some(done) = current.take() {
                print_bucket_footer(&done);
            }
            buckets += 1;
            println!("Bucket: {}", file.bucket);
            current = Some((file.bucket.clone(), 0, 0));
        }
        if let Some((_, count, bytes)) = current.as_mut() {
            *count += 1;
            *bytes += file.size;
        }
        println!("{}", file_line(&file));
    }

    if args.format == ListFormat::Text {
        if let Some(done) = current {
            print_bucket_footer(&done);
        }
        if total_files == 0 {
            println!("No files found matching criteria.");
        } else {
            println!(
                "Total: {} file{}, {} across {} bucket{}",
                format_number(total_files),
                plural(total_files),
                format_bytes(total_bytes),
                buckets,
                plural(buckets)
            );
        }
    }

    info!(files = total_files, bytes = total_bytes, "Listing completed");
    Ok(())
}

async fn stat(args: StatArgs) -> Result<()> {
    let cutoff = parse_cutoff(&args.before, args.timezone.as_deref())?;
    let patterns = CompiledPatterns::new(&args.bucket_pattern, "*")?;
    let provider = connect(args.provider, &args.connection).await?;
    let scanner = scanner(provider, patterns, cutoff, args.prefix.as_deref());

    eprintln!("Scanning for file type statistics...");

    let mut summaries = scanner.file_types();
    let mut bucket_rows: Vec<FileTypeSummary> = Vec::new();
    let mut by_extension: BTreeMap<String, (u64, u64)> = BTreeMap::new();
    let mut buckets = 0u64;

    while let Some(summary) = summaries.next().await {
        let summary = summary.context("Scan failed")?;

        if bucket_rows
            .first()
            .is_some_and(|first| first.bucket != summary.bucket)
        {
            print_file_types(&bucket_rows);
            bucket_rows.clear();
        }
        if bucket_rows.is_empty() {
            buckets += 1;
        }

        let totals = by_extension.entry(summary.extension.clone()).or_default();
        totals.0 += summary.file_count;
        totals.1 += summary.total_size;
        bucket_rows.push(summary);
    }

    if buckets == 0 {
        println!("No files found matching criteria.");
        return Ok(());
    }
    print_file_types(&bucket_rows);

    let rows: Vec<Vec<String>> = by_extension
        .iter()
        .map(|(extension, (count, size))| {
            vec![extension.clone(), format_number(*count), format_bytes(*size)]
        })
        .collect();
    println!("Total (all buckets)");
    print!("{}", render_table(&["Extension", "Files", "Size"], &rows));

    let files: u64 = by_extension.values().map(|(count, _)| count).sum();
    let bytes: u64 = by_extension.values().map(|(_, size)| size).sum();
    println!(
        "\nTotal: {} file{}, {} across {} bucket{}",
        format_number(files),
        plural(files),
        format_bytes(bytes),
        buckets,
        plural(buckets)
    );

    Ok(())
}

/// Print the final report for a clean run to stderr.
pub fn report(stats: &DeletionStats) {
    eprintln!();
    if stats.simulated > 0 {
        eprintln!("Dry run completed:");
        eprintln!(
            "  Would delete:  {} ({})",
            format_number(stats.simulated),
            format_bytes(stats.bytes_simulated)
        );
    } else {
        eprintln!("Clean completed:");
        eprintln!(
            "  Deleted:       {} ({})",
            format_number(stats.deleted),
            format_bytes(stats.bytes_deleted)
        );
        eprintln!("  Failed:        {}", format_number(stats.failed));
    }
    eprintln!("  Batches:       {}", stats.batches);

    if let Some(duration) = stats.duration() {
        eprintln!(
            "  Duration:      {:.2}s",
            duration.num_milliseconds() as f64 / 1000.0
        );
        if let Some(rate) = stats.objects_per_second() {
            eprintln!("  Throughput:    {rate:.1} objects/sec");
        }
    }

    for error in &stats.errors {
        eprintln!("  Error: {error}");
    }
    let unlisted = stats.failed.saturating_sub(stats.errors.len() as u64);
    if unlisted > 0 {
        eprintln!("  ... and {} more failures", format_number(unlisted));
    }
}

fn render_summary(summary: &DeletionSummary, cutoff: DateTime<Utc>) -> String {
    let rows: Vec<Vec<String>> = summary
        .buckets
        .iter()
        .map(|(bucket, totals)| {
            vec![
                bucket.clone(),
                format_number(totals.files),
                format_bytes(totals.bytes),
            ]
        })
        .collect();

    let buckets = summary.buckets.len() as u64;
    format!(
        "Provider: {}\nModified before: {}\n\n{}\nTotal: {} file{}, {} across {} bucket{}\n",
        summary.provider,
        cutoff.to_rfc3339(),
        render_table(&["Bucket", "Files", "Size"], &rows),
        format_number(summary.total_files),
        plural(summary.total_files),
        format_bytes(summary.total_bytes),
        buckets,
        plural(buckets)
    )
}

/// Ask the user to confirm on the terminal.
async fn confirm(files: u64, dry_run: bool) -> Result<bool> {
    let prompt = confirmation_prompt(files, dry_run);

    tokio::task::spawn_blocking(move || -> Result<bool> {
        eprint!("{prompt}");
        io::stderr().flush()?;

        let mut answer = String::new();
        io::stdin()
            .read_line(&mut answer)
            .context("Failed to read confirmation")?;
        Ok(is_confirmation(&answer))
    })
    .await
    .context("Confirmation prompt failed")?
}

fn confirmation_prompt(files: u64, dry_run: bool) -> String {
    let count = format!("{} file{}", format_number(files), plural(files));
    if dry_run {
        format!("Simulate deletion of {count}? [y/N]: ")
    } else {
        format!("Delete {count}? This cannot be undone. [y/N]: ")
    }
}

fn is_confirmation(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

fn bucket_row(bucket: &BucketDescriptor) -> Vec<String> {
    vec![
        bucket.name.clone(),
        bucket.region.clone().unwrap_or_else(|| "-".to_string()),
        bucket
            .created_at
            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| "-".to_string()),
    ]
}

fn file_line(file: &FileDescriptor) -> String {
    format!(
        "  {}  {:>10}  {}",
        file.last_modified.format("%Y-%m-%d %H:%M:%S"),
        format_bytes(file.size),
        file.key
    )
}

fn print_bucket_footer((bucket, count, bytes): &(String, u64, u64)) {
    println!(
        "  {} file{}, {} in {bucket}\n",
        format_number(*count),
        plural(*count),
        format_bytes(*bytes)
    );
}

fn print_file_types(rows: &[FileTypeSummary]) {
    let Some(first) = rows.first() else {
        return;
    };

    let table: Vec<Vec<String>> = rows
        .iter()
        .map(|s| {
            vec![
                s.extension.clone(),
                format_number(s.file_count),
                format_bytes(s.total_size),
            ]
        })
        .collect();

    println!("Bucket: {}", first.bucket);
    print!("{}", render_table(&["Extension", "Files", "Size"], &table));
    println!();
}

fn plural(n: u64) -> &'static str {
    if n == 1 { "" } else { "s" }
}
