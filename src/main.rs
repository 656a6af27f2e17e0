use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use itemidx::index::build::build_store;
use itemidx::index::stats::show_stats;
use itemidx::index::{
    FactoryConfig, IndexType, ItemIndex, ItemIndexFactory, ItemIndexStore, SetOp,
};
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "itemidx")]
#[command(about = "Build, inspect and combine compressed item index stores")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a store with one index per line of a text file
    Build {
        /// Text file of whitespace or comma separated ids
        input: PathBuf,
        /// Store file to write
        output: PathBuf,
        #[command(flatten)]
        encoding: EncodingArgs,
    },
    /// Show store statistics
    Stats {
        store: PathBuf,
        /// Print statistics as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print one index of a store
    Get {
        store: PathBuf,
        id: u32,
        /// Maximum number of values to print
        #[arg(short, long, default_value_t = 32)]
        limit: usize,
    },
    /// Combine indexes of a store with a set operation
    Op {
        store: PathBuf,
        /// union, intersect, difference or symdiff
        op: SetOp,
        /// Ids of the operands, applied left to right
        #[arg(required = true, num_args = 2..)]
        ids: Vec<u32>,
        /// Codec of the result
        #[arg(short = 't', long = "type", default_value = "native")]
        index_type: IndexType,
        #[arg(short, long, default_value_t = 32)]
        limit: usize,
    },
    /// Re-encode every index of a store with another codec
    Recode {
        input: PathBuf,
        output: PathBuf,
        #[command(flatten)]
        encoding: EncodingArgs,
    },
}

#[derive(clap::Args)]
struct EncodingArgs {
    /// Codec: native, compact, regline, for or range
    #[arg(short = 't', long = "type")]
    index_type: Option<IndexType>,
    /// Elements per FoR block
    #[arg(long)]
    block_size: Option<u32>,
    /// JSON factory configuration; flags override it
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Store identical indexes separately
    #[arg(long)]
    no_dedup: bool,
    /// Decode every encoded index and compare it with its input
    #[arg(long)]
    verify: bool,
    /// Hide progress bars
    #[arg(short, long)]
    quiet: bool,
}

impl EncodingArgs {
    fn factory_config(&self) -> Result<FactoryConfig> {
        let mut config = match &self.config {
            Some(path) => load_config(path)?,
            None => FactoryConfig::default(),
        };
        if let Some(index_type) = self.index_type {
            config.index_type = index_type;
        }
        if let Some(block_size) = self.block_size {
            config.encode.for_block_size = block_size;
        }
        config.deduplicate &= !self.no_dedup;
        config.verify_on_insert |= self.verify;
        config.show_progress = !self.quiet;
        Ok(config)
    }
}

fn load_config(path: &Path) -> Result<FactoryConfig> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("Invalid config {}", path.display()))
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "itemidx=info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Build {
            input,
            output,
            encoding,
        } => {
            let config = encoding.factory_config()?;
            let index_type = config.index_type;
            let (summary, _) = build_store(&input, &output, config)?;
            println!(
                "Built {}: {} lines, {} distinct {} indexes, {} duplicates, {} bytes",
                output.display(),
                summary.lines,
                summary.distinct,
                index_type,
                summary.hits,
                summary.bytes
            );
        }
        Commands::Stats { store, json } => {
            show_stats(&store, json)?;
        }
        Commands::Get { store, id, limit } => {
            let store = open_store(&store)?;
            let index = store.get(id)?;
            print_index(&index, limit);
        }
        Commands::Op {
            store,
            op,
            ids,
            index_type,
            limit,
        } => {
            let store = open_store(&store)?;
            let operands = ids
                .iter()
                .map(|&id| store.get(id).with_context(|| format!("Failed to load index {id}")))
                .collect::<Result<Vec<_>>>()?;
            let result = combine(&operands, op)
                .convert(index_type)
                .with_context(|| format!("Result cannot be encoded as {index_type}"))?;
            print_index(&result, limit);
        }
        Commands::Recode {
            input,
            output,
            encoding,
        } => {
            let config = encoding.factory_config()?;
            let source = open_store(&input)?;
            let factory = ItemIndexFactory::new(config)?;
            let ids = factory.insert_store(&source)?;
            let bytes = factory.flush_to_path(&output)?;
            println!(
                "Recoded {} indexes into {} ({} distinct, {} -> {} bytes)",
                ids.len(),
                output.display(),
                factory.size()?,
                source.total_size(),
                bytes
            );
        }
    }

    Ok(())
}

fn open_store(path: &Path) -> Result<ItemIndexStore> {
    if !path.exists() {
        bail!("Store not found: {}", path.display());
    }
    ItemIndexStore::open(path).with_context(|| format!("Failed to open store {}", path.display()))
}

fn combine(operands: &[ItemIndex], op: SetOp) -> ItemIndex {
    match op {
        SetOp::Union => ItemIndex::unite_all(operands),
        SetOp::Intersection => ItemIndex::intersect_all(operands),
        _ => match operands.split_first() {
            Some((first, rest)) => rest.iter().fold(first.clone(), |acc, next| acc.apply(next, op)),
            None => ItemIndex::empty(),
        },
    }
}

fn print_index(index: &ItemIndex, limit: usize) {
    println!(
        "type: {}  size: {}  bytes: {}  bpn: {:.2}",
        index.index_type(),
        index.size(),
        index.serialized_size(),
        index.bpn()
    );
    let shown: Vec<String> = index.iter().take(limit).map(|v| v.to_string()).collect();
    let more = index.size() as usize > limit;
    println!("[{}{}]", shown.join(", "), if more { ", ..." } else { "" });
}
