use std::fs::File;
use std::io::{self, Write};
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use daylog_kernel::adapters::jsonl::JsonLinesSource;
use daylog_kernel::calendar::DayCalendar;
use daylog_kernel::export::{LogExport, DEFAULT_FILE_NAME};
use daylog_kernel::index::GroupedLogIndex;
use daylog_kernel::invariants::InvariantEngine;
use daylog_kernel::log::{LogRecord, LogSource};
use daylog_kernel::metadata::MetadataOptions;
use daylog_kernel::summary::summarize;
use daylog_kernel::tail::{read_all, Tail};

/// Daylog CLI
#[derive(Parser, Debug)]
#[command(name = "daylog")]
#[command(about = "Browse JSON-lines log records grouped by day", long_about = None)]
struct Cli {
    /// Day boundary offset east of UTC, in seconds
    #[arg(long, env = "DAYLOG_UTC_OFFSET", default_value_t = 0, allow_hyphen_values = true)]
    utc_offset: i32,

    /// Use the local time zone for day boundaries (overrides --utc-offset)
    #[arg(long)]
    local: bool,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print records grouped by day
    Show {
        #[command(flatten)]
        source: SourceArgs,

        /// Latest day and record first
        #[arg(long)]
        reverse: bool,

        /// Only show these metadata fields
        #[arg(long, value_delimiter = ',', conflicts_with = "hide")]
        show: Vec<MetadataOptions>,

        /// Show every metadata field except these
        #[arg(long, value_delimiter = ',')]
        hide: Vec<MetadataOptions>,
    },

    /// Print per-day counts as JSON
    Summary {
        #[command(flatten)]
        source: SourceArgs,

        #[arg(long)]
        reverse: bool,
    },

    /// Write records as plain text
    Export {
        #[command(flatten)]
        source: SourceArgs,

        /// Output file, or `-` for stdout
        #[arg(long, default_value = DEFAULT_FILE_NAME)]
        out: PathBuf,
    },

    /// Verify the grouped index invariants
    Check {
        #[command(flatten)]
        source: SourceArgs,
    },

    /// Print records, then keep polling the file for new ones
    Follow {
        #[command(flatten)]
        source: SourceArgs,

        /// Seconds between polls
        #[arg(long, default_value_t = 5)]
        interval: u64,

        /// Stop after this many polls
        #[arg(long)]
        max_polls: Option<u64>,
    },
}

#[derive(Args, Debug)]
struct SourceArgs {
    /// Path to JSON-lines log file
    #[arg(long, env = "DAYLOG_LOG")]
    log: PathBuf,

    /// Only include records from this process id
    #[arg(long)]
    pid: Option<i32>,
}

impl SourceArgs {
    fn open(&self) -> JsonLinesSource {
        let source = JsonLinesSource::new(&self.log);
        match self.pid {
            Some(pid) => source.with_process_id(pid),
            None => source,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level)),
        )
        .with_writer(io::stderr)
        .init();

    let calendar = if cli.local {
        DayCalendar::local()
    } else {
        DayCalendar::from_offset_seconds(cli.utc_offset)
            .with_context(|| format!("utc offset {} out of range", cli.utc_offset))?
    };

    let stdout = io::stdout();

    match cli.command {
        Command::Show {
            source,
            reverse,
            show,
            hide,
        } => {
            let index = load(&source, calendar, reverse)?;
            let options = if show.is_empty() {
                MetadataOptions::hide(&hide)
            } else {
                MetadataOptions::show(&show)
            };
            render_index(&index, options, &mut stdout.lock())?;
        }

        Command::Summary { source, reverse } => {
            let index = load(&source, calendar, reverse)?;
            let summary = summarize(&index.view());
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }

        Command::Export { source, out } => {
            let index = load(&source, calendar, false)?;
            let export = LogExport::from_index(&index);

            if out.as_os_str() == "-" {
                export.write_to(stdout.lock())?;
            } else {
                let file = File::create(&out)
                    .with_context(|| format!("creating {}", out.display()))?;
                export.write_to(file)?;
                info!(records = export.len(), path = %out.display(), "exported");
            }
        }

        Command::Check { source } => {
            let index = load(&source, calendar, false)?;
            index.check(&InvariantEngine::standard())?;
            println!(
                "ok: {} records over {} days",
                index.record_count(),
                index.len()
            );
        }

        Command::Follow {
            source,
            interval,
            max_polls,
        } => {
            let mut index = load(&source, calendar, false)?;
            let options = MetadataOptions::ALL;
            render_index(&index, options, &mut stdout.lock())?;

            let mut tail = Tail::starting_after(source.open(), index.last_timestamp());
            let mut polls = 0;

            while max_polls.map_or(true, |max| polls < max) {
                thread::sleep(Duration::from_secs(interval));
                polls += 1;

                poll_and_print(&mut tail, &mut index, options, &mut stdout.lock())
                    .with_context(|| format!("polling {}", source.log.display()))?;
            }
        }
    }

    Ok(())
}

fn load(source: &SourceArgs, calendar: DayCalendar, reverse: bool) -> Result<GroupedLogIndex> {
    let index = read_all(&mut source.open(), calendar, reverse)
        .with_context(|| format!("loading {}", source.log.display()))?;
    info!(
        records = index.record_count(),
        days = index.len(),
        "loaded log"
    );
    Ok(index)
}

/// Poll once and print only the records that poll appended.
fn poll_and_print<S: LogSource, W: Write>(
    tail: &mut Tail<S>,
    index: &mut GroupedLogIndex,
    options: MetadataOptions,
    out: &mut W,
) -> Result<usize> {
    let before = index.record_count();
    let appended = tail.poll(index)?;

    for record in &index.records()[before..] {
        writeln!(out, "{}", render_record(record, options, index.calendar()))?;
    }
    Ok(appended)
}

fn render_record(record: &LogRecord, options: MetadataOptions, calendar: &DayCalendar) -> String {
    let metadata = options.format(record, calendar);
    if metadata.is_empty() {
        record.message.clone()
    } else {
        format!("{metadata} {}", record.message)
    }
}

fn render_index<W: Write>(
    index: &GroupedLogIndex,
    options: MetadataOptions,
    out: &mut W,
) -> io::Result<()> {
    for group in index {
        writeln!(out, "== {} ({} records) ==", group.day, group.records.len())?;
        for record in group.records {
            writeln!(out, "{}", render_record(record, options, index.calendar()))?;
        }
    }
    Ok(())
}
