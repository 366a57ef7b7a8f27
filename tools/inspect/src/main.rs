//! Print the header and record table of a shapefile index.
//!
//! # Usage
//!
//! ```sh
//! cargo run --release --bin shapeidx-inspect -- --file /data/roads.shx
//! ```
//!
//! Only print records 10 through 14, reading entries through a 64 KiB buffer:
//!
//! ```sh
//! cargo run --release --bin shapeidx-inspect -- --file /data/roads.shx --start 10 --limit 5 --buffer 65536
//! ```
//!
//! Print read counters after the table:
//!
//! ```sh
//! cargo run --release --bin shapeidx-inspect -- --file /data/roads.shx --metrics
//! ```

use clap::{value_parser, Arg, ArgAction, Command};
use prometheus_client::{encoding::text::encode, registry::Registry};
use shapeidx_runtime::{fs, Error as RError};
use shapeidx_storage::{
    header::{Header, Log},
    index::{Config, Error, IndexFile},
};
use std::{
    num::NonZeroUsize,
    path::{Path, PathBuf},
    process::ExitCode,
    str::FromStr,
};
use tracing::{error, info, Level};

fn main() -> ExitCode {
    // Parse arguments
    let matches = Command::new("shapeidx-inspect")
        .about("print the header and record table of a shapefile index")
        .arg(
            Arg::new("file")
                .long("file")
                .required(true)
                .value_parser(value_parser!(PathBuf))
                .help("Path to the .shx file"),
        )
        .arg(
            Arg::new("start")
                .long("start")
                .required(false)
                .default_value("0")
                .value_parser(value_parser!(u32))
                .help("First record to print"),
        )
        .arg(
            Arg::new("limit")
                .long("limit")
                .required(false)
                .value_parser(value_parser!(u32))
                .help("Maximum number of records to print"),
        )
        .arg(
            Arg::new("buffer")
                .long("buffer")
                .required(false)
                .default_value("1024")
                .value_parser(value_parser!(usize))
                .help("Size of the read buffer in bytes"),
        )
        .arg(
            Arg::new("log-level")
                .long("log-level")
                .required(false)
                .default_value("info")
                .help("Most verbose level to log (error, warn, info, debug, trace)"),
        )
        .arg(
            Arg::new("metrics")
                .long("metrics")
                .action(ArgAction::SetTrue)
                .help("Print metrics after the table"),
        )
        .get_matches();

    // Create logger
    let level = matches
        .get_one::<String>("log-level")
        .expect("Please provide log level");
    let level = Level::from_str(level).expect("Log level not well-formed");
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    // Configure reader
    let path = matches
        .get_one::<PathBuf>("file")
        .expect("Please provide file");
    let start = *matches.get_one::<u32>("start").expect("Please provide start");
    let limit = matches.get_one::<u32>("limit").copied();
    let read_buffer = *matches
        .get_one::<usize>("buffer")
        .expect("Please provide buffer size");
    let Some(read_buffer) = NonZeroUsize::new(read_buffer) else {
        error!("buffer size must be non-zero");
        return ExitCode::FAILURE;
    };
    let metrics = matches.get_flag("metrics");

    match inspect(path, start, limit, Config { read_buffer }, metrics) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(path = %path.display(), %err, "inspection failed");
            ExitCode::FAILURE
        }
    }
}

fn inspect(
    path: &Path,
    start: u32,
    limit: Option<u32>,
    cfg: Config,
    metrics: bool,
) -> Result<(), Error> {
    // Resolve the file against its directory
    let name = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| RError::BlobMissing(path.display().to_string()))?;
    let directory = path.parent().unwrap_or_else(|| Path::new(""));
    let storage = fs::Storage::new(fs::Config::new(directory.to_path_buf()));

    // Open the index, logging anomalies
    let mut index = IndexFile::open(&storage, name, cfg, &mut Log)?;
    let mut registry = Registry::default();
    index.register(&mut registry);
    let count = index.record_count();
    info!(records = count, "opened index");
    print_header(index.header(), count);

    // Print entries
    let end = match limit {
        Some(limit) => start.saturating_add(limit).min(count),
        None => count,
    };
    println!();
    println!("{:>10} {:>12} {:>12} {:>10}", "index", "offset", "offset_bytes", "length");
    for i in start..end {
        let entry = index.entry(i)?;
        println!(
            "{:>10} {:>12} {:>12} {:>10}",
            i,
            entry.offset(),
            entry.offset_in_bytes(),
            entry.content_length()
        );
    }

    // Print metrics
    if metrics {
        let mut encoded = String::new();
        if encode(&mut encoded, &registry).is_ok() {
            println!();
            print!("{encoded}");
        }
    }

    index.close()
}

fn print_header(header: &Header, count: u32) {
    let bounds = &header.bounds;
    println!("file code:    {}", header.file_code);
    println!(
        "file length:  {} words ({} bytes)",
        header.file_length(),
        header.file_length_in_bytes()
    );
    println!("version:      {}", header.version);
    println!(
        "shape type:   {:?} ({})",
        header.shape_type,
        header.shape_type.code()
    );
    println!(
        "extent:       x [{}, {}] y [{}, {}]",
        bounds.min_x, bounds.max_x, bounds.min_y, bounds.max_y
    );
    if header.shape_type.has_z() {
        println!("z range:      [{}, {}]", bounds.min_z, bounds.max_z);
    }
    if header.shape_type.has_m() {
        println!("m range:      [{}, {}]", bounds.min_m, bounds.max_m);
    }
    println!("records:      {count}");
}
