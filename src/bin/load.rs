//! CubeDB Loader Binary
//!
//! Streams a delimited text file into cublet files.

use std::fs::{self, File};
use std::io::{BufRead, BufReader};

use clap::Parser;
use cubedb::{Config, CubeError, CubletWriter, Schema};
use tracing_subscriber::{fmt, EnvFilter};

/// CubeDB Loader
#[derive(Parser, Debug)]
#[command(name = "cubedb-load")]
#[command(about = "Build immutable cublet files from a delimited record stream")]
#[command(version)]
struct Args {
    /// Schema document (JSON)
    #[arg(short, long)]
    schema: String,

    /// Input file of delimited records, one per line
    #[arg(short, long)]
    input: String,

    /// Output directory for cublet files
    #[arg(short, long, default_value = "./cubedb_data")]
    output: String,

    /// Field delimiter
    #[arg(short, long, default_value = ",")]
    delimiter: String,

    /// Rows per chunk before a chunk switch becomes eligible
    #[arg(long, default_value = "65536")]
    chunk_rows: usize,

    /// Cublet size limit in MB before rollover
    #[arg(long, default_value = "1024")]
    cublet_mb: u64,
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,cubedb=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    let args = Args::parse();

    tracing::info!("CubeDB Loader v{}", cubedb::VERSION);
    tracing::info!("Schema: {}", args.schema);
    tracing::info!("Input: {}", args.input);
    tracing::info!("Output directory: {}", args.output);

    if let Err(e) = run(&args) {
        tracing::error!("Load failed: {}", e);
        std::process::exit(1);
    }
}

fn run(args: &Args) -> cubedb::Result<()> {
    let schema_json = fs::read_to_string(&args.schema)?;
    let schema = Schema::from_json(&schema_json)?;

    let config = Config::builder()
        .output_dir(&args.output)
        .chunk_row_limit(args.chunk_rows)
        .cublet_size_limit(args.cublet_mb * 1024 * 1024)
        .build();

    let mut writer = CubletWriter::new(schema, config)?;
    writer.initialize()?;

    let input = BufReader::new(File::open(&args.input)?);
    let mut skipped: u64 = 0;
    for (line_no, line) in input.lines().enumerate() {
        let line = line?;
        if line.is_empty() {
            continue;
        }
        let record: Vec<&str> = line.split(args.delimiter.as_str()).collect();
        match writer.append(&record) {
            Ok(()) => {}
            // Malformed records are skipped; anything else aborts the load.
            Err(CubeError::MalformedRecord(msg)) => {
                tracing::warn!("line {}: skipping malformed record: {}", line_no + 1, msg);
                skipped += 1;
            }
            Err(e) => return Err(e),
        }
    }

    writer.finish()?;
    tracing::info!(
        rows = writer.rows_appended(),
        cublets = writer.cublets_created(),
        skipped,
        "load complete"
    );
    Ok(())
}
