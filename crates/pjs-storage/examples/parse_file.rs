//! Parse a JSON file into a chosen memory resource and report what it cost
//!
//! ```text
//! cargo run -p pjson-rs-storage --example parse_file -- data.json --resource monotonic
//! RUST_LOG=debug cargo run -p pjson-rs-storage --example parse_file -- \
//!     data.json --resource static:65536
//! ```

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Instant;

use clap::Parser as _;
use pjson_rs_storage::{
    Kind, MonotonicResource, Parser, ParserConfig, StaticResource, StorageHandle, Value,
    null_resource,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Bytes fed to the parser per `write` call
const CHUNK_SIZE: usize = 8 * 1024;

#[derive(Debug, Clone, Copy)]
enum ResourceKind {
    Default,
    Monotonic,
    Static(usize),
    Null,
}

impl FromStr for ResourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "default" => Ok(Self::Default),
            "monotonic" => Ok(Self::Monotonic),
            "null" => Ok(Self::Null),
            other => match other.strip_prefix("static:") {
                Some(bytes) => bytes
                    .parse()
                    .map(Self::Static)
                    .map_err(|e| format!("invalid static buffer size {bytes:?}: {e}")),
                None => Err(format!(
                    "unknown resource {other:?}, \
                     expected default, monotonic, static:<bytes> or null"
                )),
            },
        }
    }
}

#[derive(Debug, clap::Parser)]
#[command(about = "Parse a JSON file with a selectable memory resource")]
struct Args {
    /// JSON document to parse
    input: PathBuf,

    /// Memory resource: default, monotonic, static:<bytes> or null
    #[arg(long, default_value = "default")]
    resource: ResourceKind,

    /// Accept trailing commas
    #[arg(long)]
    trailing_commas: bool,

    /// Accept `//` and `/* */` comments
    #[arg(long)]
    comments: bool,

    /// Maximum nesting depth
    #[arg(long, default_value_t = pjson_rs_storage::config::DEFAULT_MAX_DEPTH)]
    max_depth: usize,

    /// Print the parsed document as compact JSON
    #[arg(long)]
    print: bool,
}

fn parse_chunked<'r>(
    input: &[u8],
    storage: StorageHandle<'r>,
    config: ParserConfig,
) -> pjson_rs_storage::Result<Value<'r>> {
    let mut parser = Parser::with_config(storage, config);
    for chunk in input.chunks(CHUNK_SIZE) {
        parser.write(chunk)?;
    }
    parser.finish()?;
    parser.release()
}

fn report(value: &Value<'_>, print: bool) {
    let summary = match value.kind() {
        Kind::Array => format!("array of {}", value.as_array().map_or(0, |a| a.len())),
        Kind::Object => format!("object with {} keys", value.as_object().map_or(0, |o| o.len())),
        kind => format!("{kind:?}"),
    };
    println!("root: {summary}");
    if print {
        println!("{value}");
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let input = std::fs::read(&args.input)?;
    let config = ParserConfig::default()
        .with_max_depth(args.max_depth)
        .with_trailing_commas(args.trailing_commas)
        .with_comments(args.comments);

    info!(path = %args.input.display(), bytes = input.len(), resource = ?args.resource, "parsing");
    let started = Instant::now();

    match args.resource {
        ResourceKind::Default => {
            let value = parse_chunked(&input, StorageHandle::default(), config)?;
            println!("parsed in {:?}", started.elapsed());
            report(&value, args.print);
        }
        ResourceKind::Monotonic => {
            let arena = MonotonicResource::with_capacity(input.len());
            let value = parse_chunked(&input, StorageHandle::borrowed(&arena), config)?;
            println!("parsed in {:?}", started.elapsed());
            report(&value, args.print);
            drop(value);
            println!("arena: {:?}", arena.stats());
        }
        ResourceKind::Static(bytes) => {
            let mut buffer = vec![0u8; bytes];
            let fixed = StaticResource::new(&mut buffer);
            let value = parse_chunked(&input, StorageHandle::borrowed(&fixed), config)?;
            println!("parsed in {:?}", started.elapsed());
            report(&value, args.print);
            drop(value);
            println!("static buffer: {} of {} bytes used", fixed.used(), fixed.capacity());
        }
        ResourceKind::Null => {
            let value = parse_chunked(&input, StorageHandle::borrowed(null_resource()), config)?;
            println!("parsed in {:?}", started.elapsed());
            report(&value, args.print);
        }
    }

    Ok(())
}
