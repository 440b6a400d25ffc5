//! cc-monitor: replay closed caption dumps through the decoder.
//!
//! Reads a text dump of `cc_data()` blocks, line-21 pairs and XDS pairs,
//! decodes it and prints caption pages, transcript lines and XDS metadata
//! as they change.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use cc_decoder::{CaptionDecoder, DecoderConfig, DecoderEvent};
use chrono::Utc;
use clap::Parser;
use clap_num::number_range;
use log::{debug, error, info, warn};
use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tokio::sync::{broadcast, oneshot};

mod logging;
mod render;
mod replay;

use render::{OutputRecord, PageRecord};
use replay::{Record, Replay, ReplayError};

fn page_number(s: &str) -> Result<u32, String> {
    number_range(s, 1, 14)
}

/// cc-monitor - Closed caption dump monitor
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Dump file to replay, `-` for stdin
    #[arg(default_value = "-")]
    input: PathBuf,

    /// Configuration file path
    #[arg(short = 'f', long)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Directory where log files are stored
    #[arg(long, default_value = "logs")]
    log_dir: PathBuf,

    /// Number of days to keep log files
    #[arg(long, default_value = "7")]
    log_retention_days: u64,

    /// Only print these pages (1-8 EIA-608, 9-14 DTVCC services)
    #[arg(short, long, value_parser = page_number)]
    page: Vec<u32>,

    /// Print JSON lines instead of colored text
    #[arg(long)]
    json: bool,

    /// Decode DTVCC as Korean double-width services
    #[arg(long)]
    korean: bool,

    /// Upper-case EIA-608 text on upper-case-only channels
    #[arg(long)]
    upper: bool,
}

/// Configuration file format.
#[derive(Debug, serde::Deserialize, Default)]
struct ConfigFile {
    #[serde(default)]
    decoder: DecoderSection,
    #[serde(default)]
    output: OutputSection,
    #[serde(default)]
    logging: LoggingSection,
}

#[derive(Debug, serde::Deserialize, Default)]
struct DecoderSection {
    double_width: Option<bool>,
    to_upper: Option<bool>,
    event_capacity: Option<usize>,
}

#[derive(Debug, serde::Deserialize, Default)]
struct OutputSection {
    json: Option<bool>,
    pages: Option<Vec<u32>>,
}

#[derive(Debug, serde::Deserialize, Default)]
struct LoggingSection {
    log_dir: Option<String>,
    retention_days: Option<u64>,
    level: Option<String>,
}

fn load_config(path: &PathBuf) -> Result<ConfigFile, Box<dyn std::error::Error>> {
    let contents = std::fs::read_to_string(path)?;
    let config: ConfigFile = toml::from_str(&contents)?;
    Ok(config)
}

/// What the printer shows.
#[derive(Debug, Clone)]
struct OutputOptions {
    json: bool,
    /// Empty means every page.
    pages: Vec<u32>,
}

impl OutputOptions {
    fn wants(&self, pgno: u32) -> bool {
        self.pages.is_empty() || self.pages.contains(&pgno)
    }
}

#[derive(Debug, Default)]
struct ReplayStats {
    records: usize,
    errors: usize,
}

/// Decode every record of the dump. Malformed lines are logged and skipped;
/// only read errors abort the replay.
fn run_replay(
    decoder: &CaptionDecoder,
    input: Box<dyn BufRead + Send>,
    epoch: Instant,
) -> Result<ReplayStats, ReplayError> {
    let mut stats = ReplayStats::default();
    let mut replay = Replay::new(input);

    while let Some(record) = replay.next() {
        let record = match record {
            Ok(record) => record,
            Err(ReplayError::Io(e)) => return Err(ReplayError::Io(e)),
            Err(e) => {
                warn!("{}", e);
                stats.errors += 1;
                continue;
            }
        };
        stats.records += 1;

        // Dump time stands in for the wall clock so delays and flashing
        // follow the stream.
        let now = record.pts().map(|pts| epoch + Duration::from_millis(pts.max(0) as u64 / 90));

        let result = match record {
            Record::CcData { pts, data } => decoder.decode_at(pts, &data, now.unwrap_or(epoch)),
            Record::Line21 { line, pts, pair } => decoder.feed(pair, line, Utc::now(), pts),
            Record::Xds { pair } => {
                decoder.decode_xds(pair[0] & 0x7F, pair[1] & 0x7F);
                Ok(())
            }
        };
        if let Err(e) = result {
            warn!("line {}: {}", replay.line(), e);
            stats.errors += 1;
        }
        if let Some(now) = now {
            decoder.tick_at(now);
        }
    }

    Ok(stats)
}

fn print_event(decoder: &CaptionDecoder, event: &DecoderEvent, options: &OutputOptions) {
    match event {
        DecoderEvent::Caption(caption) => {
            if !options.wants(caption.pgno) {
                return;
            }
            let pages = match decoder.fetch_page(caption.pgno) {
                Ok(pages) => pages,
                Err(e) => {
                    warn!("Failed to fetch page {}: {}", caption.pgno, e);
                    return;
                }
            };
            for page in pages.iter().filter(|p| !p.is_blank()) {
                if options.json {
                    let record = OutputRecord::Page(PageRecord {
                        pgno: page.pgno,
                        subno: page.subno,
                        pts: caption.pts,
                        rows: render::page_rows(page),
                    });
                    println!("{}", render::json_line(&record));
                } else {
                    print!("{}", render::page_ansi(page, caption.pts));
                }
            }
        }
        DecoderEvent::Stream(line) => {
            if !options.wants(line.pgno) {
                return;
            }
            if options.json {
                println!("{}", render::json_line(&OutputRecord::Stream(line)));
            } else {
                println!("{}", render::stream_ansi(line));
            }
        }
        DecoderEvent::Xds(category) => {
            let snapshot = decoder.xds_snapshot();
            if options.json {
                println!("{}", render::json_line(&OutputRecord::Xds { category: *category, snapshot: &snapshot }));
            } else {
                println!("{}", render::xds_ansi(*category, &snapshot));
            }
            if decoder.content_advisory_changed() {
                info!("Content advisory changed");
                decoder.reset_content_advisory_changed();
            }
        }
    }
}

/// Print events until the replay is done, then drain what is left.
async fn print_events(
    decoder: Arc<CaptionDecoder>,
    mut rx: broadcast::Receiver<DecoderEvent>,
    options: OutputOptions,
    mut done: oneshot::Receiver<()>,
) {
    loop {
        tokio::select! {
            biased;
            result = rx.recv() => match result {
                Ok(event) => print_event(&decoder, &event, &options),
                Err(RecvError::Lagged(count)) => {
                    warn!("Printer lagged behind, {} events skipped", count);
                }
                Err(RecvError::Closed) => return,
            },
            _ = &mut done => break,
        }
    }

    loop {
        match rx.try_recv() {
            Ok(event) => print_event(&decoder, &event, &options),
            Err(TryRecvError::Lagged(count)) => {
                warn!("Printer lagged behind, {} events skipped", count);
            }
            Err(_) => break,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Load config file: explicit path > auto-detect > default
    let config_path = args.config.clone().or_else(|| {
        let default_path = PathBuf::from("cc-monitor.toml");
        if default_path.exists() {
            Some(default_path)
        } else {
            None
        }
    });
    let file_config = if let Some(config_path) = &config_path {
        match load_config(config_path) {
            Ok(c) => {
                eprintln!("Loaded config from: {}", config_path.display());
                c
            }
            Err(e) => {
                eprintln!("Failed to load config file: {}", e);
                return Err(e);
            }
        }
    } else {
        ConfigFile::default()
    };

    // Merge logging configs (command line takes precedence)
    let log_dir = if args.log_dir.to_string_lossy() != "logs" {
        args.log_dir.clone()
    } else {
        PathBuf::from(file_config.logging.log_dir.as_deref().unwrap_or("logs"))
    };
    let log_retention_days = if args.log_retention_days != 7 {
        args.log_retention_days
    } else {
        file_config.logging.retention_days.unwrap_or(7)
    };
    let log_level = file_config.logging.level.as_deref();

    if let Err(e) = logging::init_logging(&log_dir, log_retention_days, args.verbose, log_level) {
        eprintln!("Failed to initialize logging: {}", e);
        return Err(e);
    }

    let defaults = DecoderConfig::default();
    let decoder_config = DecoderConfig {
        double_width: args.korean || file_config.decoder.double_width.unwrap_or(defaults.double_width),
        to_upper: args.upper || file_config.decoder.to_upper.unwrap_or(defaults.to_upper),
        event_capacity: file_config.decoder.event_capacity.unwrap_or(defaults.event_capacity),
    };
    let options = OutputOptions {
        json: args.json || file_config.output.json.unwrap_or(false),
        pages: if args.page.is_empty() { file_config.output.pages.unwrap_or_default() } else { args.page.clone() },
    };
    debug!("decoder config: {:?}, output: {:?}", decoder_config, options);

    let input: Box<dyn BufRead + Send> = if args.input.as_os_str() == "-" {
        Box::new(BufReader::new(io::stdin()))
    } else {
        match File::open(&args.input) {
            Ok(file) => Box::new(BufReader::new(file)),
            Err(e) => {
                error!("Failed to open {}: {}", args.input.display(), e);
                return Err(e.into());
            }
        }
    };
    info!("Replaying {}", args.input.display());

    let epoch = Instant::now();
    let decoder = Arc::new(CaptionDecoder::new_at(decoder_config, epoch));
    let rx = decoder.subscribe();

    let (done_tx, done_rx) = oneshot::channel();
    let printer = tokio::spawn(print_events(Arc::clone(&decoder), rx, options.clone(), done_rx));

    let replay_decoder = Arc::clone(&decoder);
    let result = tokio::task::spawn_blocking(move || run_replay(&replay_decoder, input, epoch)).await?;
    let _ = done_tx.send(());
    printer.await?;

    let stats = match result {
        Ok(stats) => stats,
        Err(e) => {
            error!("Replay failed: {}", e);
            return Err(e.into());
        }
    };
    info!("Replay finished: {} records, {} errors", stats.records, stats.errors);

    let snapshot = decoder.xds_snapshot();
    if options.json {
        println!("{}", render::json_line(&OutputRecord::Summary { snapshot: &snapshot }));
    } else {
        print!("{}", render::summary_ansi(&snapshot));
    }

    Ok(())
}
