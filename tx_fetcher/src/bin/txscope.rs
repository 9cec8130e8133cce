use std::collections::BTreeMap;

use alloy::primitives::{Address, B256, U256};
use anyhow::Result;
use clap::{Args, Parser, Subcommand, ValueHint};
use tx_context::BlockRef;
use tx_fetcher::adapter::NodeAdapter;
use tx_fetcher::env::load_dotenvy_vars_if_present;
use tx_fetcher::inspect::Inspector;
use tx_fetcher::retry::build_http_retry_provider;
use url::Url;

#[derive(Args, Clone, Debug)]
struct NodeConfig {
    /// The JSON-RPC endpoint of an archive node with the debug namespace
    /// enabled.
    #[arg(short = 'u', long, env = "TXSCOPE_RPC_URL", value_hint = ValueHint::Url)]
    rpc_url: Url,
    /// Backoff in milliseconds between transport-level retries.
    #[arg(long, env = "TXSCOPE_BACKOFF", default_value_t = 0)]
    backoff: u64,
    /// The maximum number of transport-level retries.
    #[arg(long, env = "TXSCOPE_MAX_RETRIES", default_value_t = 0)]
    max_retries: u32,
}

#[derive(Subcommand)]
enum Command {
    /// Reconstructs the trace and call context of a mined transaction.
    Inspect {
        /// Transaction hash.
        #[arg(short, long)]
        tx: B256,
    },
    /// Fetches the code deployed at one or more addresses.
    Code {
        /// Contract addresses.
        #[arg(short, long, required = true, num_args = 1..)]
        address: Vec<Address>,
        /// Historical block number; defaults to the latest block.
        #[arg(short, long)]
        block: Option<u64>,
    },
    /// Reads one storage slot as of a transaction inside a block.
    Storage {
        /// Contract address.
        #[arg(short, long)]
        address: Address,
        /// Slot number, decimal or 0x-prefixed hex.
        #[arg(short, long)]
        slot: U256,
        /// Hash of the block the reading transaction belongs to.
        #[arg(long)]
        block_hash: B256,
        /// Index of the reading transaction inside that block.
        #[arg(long, default_value_t = 0)]
        tx_index: u64,
    },
}

/// txscope: inspect the execution context of past transactions.
#[derive(Parser)]
#[command(version)]
struct Cli {
    #[clap(flatten)]
    config: NodeConfig,

    #[command(subcommand)]
    command: Command,
}

#[tokio::main]
async fn main() -> Result<()> {
    load_dotenvy_vars_if_present();
    tx_fetcher::tracing::init();

    let cli = Cli::parse();
    let provider = build_http_retry_provider(
        cli.config.rpc_url.clone(),
        cli.config.backoff,
        cli.config.max_retries,
    );
    let inspector = Inspector::new(NodeAdapter::new(provider));

    match cli.command {
        Command::Inspect { tx } => {
            let record = inspector.inspect_transaction(tx).await?;
            serde_json::to_writer_pretty(std::io::stdout(), &record)?;
            println!();
        }
        Command::Code { address, block } => {
            let block = block.map_or(BlockRef::Latest, BlockRef::Number);
            let binaries = inspector.obtain_binaries(&address, block).await?;
            // BTreeMap for stable output ordering.
            let rendered: BTreeMap<String, String> = binaries
                .iter()
                .map(|(address, code)| (address.to_string(), code.to_string()))
                .collect();
            serde_json::to_writer_pretty(std::io::stdout(), &rendered)?;
            println!();
        }
        Command::Storage {
            address,
            slot,
            block_hash,
            tx_index,
        } => {
            let word = inspector
                .obtain_storage(address, slot, block_hash, tx_index)
                .await?;
            println!("{word}");
        }
    }
    Ok(())
}
