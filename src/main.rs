//! `amm`: query and drive an AMM deployment from the command line.
//!
//! Configuration comes from the environment (`CHAIN_ID`, `RPC_URL`, optional
//! `PRIVATE_KEY`) and `deployments/<chain_id>.json`. Without a private key
//! only the read commands work.

use alloy_primitives::{Address, B256};
use amm_client::AmmClient;
use amm_core::types::OperationResult;
use amm_core::{Amount, ClientConfig};
use anyhow::Context;
use clap::{Parser, Subcommand};
use futures::TryStreamExt;
use std::fmt::Debug;
use tracing::{error, info, warn, Level};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "amm")]
#[command(about = "Discover, query and trade against AMM pools", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List every pool created since a block
    Pools {
        /// First block to scan (defaults to the deployment's start block)
        #[arg(long)]
        from_block: Option<u64>,

        /// Last block to scan (defaults to the current head)
        #[arg(long)]
        to_block: Option<u64>,
    },

    /// Show one pool
    Pool { pool_id: B256 },

    /// Resolve the identity of (token A, token B, fee)
    PoolId {
        token_a: Address,
        token_b: Address,

        /// Fee tier in basis points
        #[arg(long, default_value = "30")]
        fee: u32,
    },

    /// Liquidity shares held by an account
    Liquidity {
        pool_id: B256,

        /// Defaults to the configured signer
        #[arg(long)]
        account: Option<Address>,
    },

    /// Token balance of an account
    Balance {
        token: Address,

        /// Defaults to the configured signer
        #[arg(long)]
        account: Option<Address>,
    },

    /// Create a pool seeded with both tokens
    CreatePool {
        token_a: Address,
        token_b: Address,
        amount_a: Amount,
        amount_b: Amount,
    },

    /// Add liquidity to a pool
    AddLiquidity {
        pool_id: B256,
        amount0: Amount,
        amount1: Amount,
    },

    /// Burn liquidity shares
    RemoveLiquidity { pool_id: B256, liquidity: Amount },

    /// Swap an exact input amount
    Swap {
        pool_id: B256,
        token_in: Address,
        amount_in: Amount,

        #[arg(long, default_value = "0")]
        min_amount_out: Amount,

        /// Defaults to the configured signer
        #[arg(long)]
        recipient: Option<Address>,
    },
}

fn account_or_signer(client: &AmmClient, account: Option<Address>) -> anyhow::Result<Address> {
    account
        .or_else(|| client.signer_address())
        .context("no account given and no PRIVATE_KEY configured")
}

fn report<T: Debug>(operation: &str, result: &OperationResult<T>) {
    match &result.anomaly {
        None => println!("{} confirmed in {}: {:#?}", operation, result.transaction, result.outcome),
        Some(anomaly) => {
            warn!(
                tx = ?result.transaction,
                expected = %anomaly.expected_event,
                "Outputs unknown"
            );
            println!(
                "{} confirmed in {} but its {} event was not found among {} logs; outputs unknown",
                operation, result.transaction, anomaly.expected_event, anomaly.logs_in_receipt
            );
        }
    }
}

async fn run(client: &AmmClient, command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Pools {
            from_block,
            to_block,
        } => {
            let from = from_block.unwrap_or(client.start_block());
            let mut pools = Box::pin(client.scan_pools(from, to_block));
            let mut count = 0usize;
            while let Some(pool) = pools.try_next().await? {
                count += 1;
                println!(
                    "{} {} / {} fee={} block={}",
                    pool.pool_id,
                    pool.token0,
                    pool.token1,
                    pool.fee_bps,
                    pool.position.block_number
                );
            }
            info!(pools = count, from_block = from, "Scan finished");
        }
        Commands::Pool { pool_id } => match client.get_pool(pool_id).await? {
            Some(pool) => println!("{:#?}", pool),
            None => println!("no pool {}", pool_id),
        },
        Commands::PoolId {
            token_a,
            token_b,
            fee,
        } => {
            println!("{}", client.get_pool_identity(token_a, token_b, fee).await?);
        }
        Commands::Liquidity { pool_id, account } => {
            let account = account_or_signer(client, account)?;
            println!("{}", client.get_user_liquidity(pool_id, account).await?);
        }
        Commands::Balance { token, account } => {
            let account = account_or_signer(client, account)?;
            println!("{}", client.balance_of(token, account).await?);
        }
        Commands::CreatePool {
            token_a,
            token_b,
            amount_a,
            amount_b,
        } => {
            let result = client
                .create_pool(token_a, token_b, &amount_a, &amount_b)
                .await?;
            report("create-pool", &result);
        }
        Commands::AddLiquidity {
            pool_id,
            amount0,
            amount1,
        } => {
            let result = client.add_liquidity(pool_id, &amount0, &amount1).await?;
            report("add-liquidity", &result);
        }
        Commands::RemoveLiquidity { pool_id, liquidity } => {
            let result = client.remove_liquidity(pool_id, &liquidity).await?;
            report("remove-liquidity", &result);
        }
        Commands::Swap {
            pool_id,
            token_in,
            amount_in,
            min_amount_out,
            recipient,
        } => {
            let recipient = account_or_signer(client, recipient)?;
            let result = client
                .swap(pool_id, token_in, &amount_in, &min_amount_out, recipient)
                .await?;
            report("swap", &result);
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file (ignore if not found)
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive(Level::INFO.into())
                .add_directive("amm_tx=info".parse()?)
                .add_directive("amm_sync=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = match ClientConfig::load() {
        Ok(config) => {
            info!(
                chain_id = config.chain_id,
                amm = ?config.amm,
                deployment_start_block = config.start_block,
                read_only = config.is_read_only(),
                "Configuration loaded from deployment"
            );
            config
        }
        Err(e) => {
            error!(error = %e, "Failed to load configuration");
            std::process::exit(1);
        }
    };

    let client = AmmClient::from_config(&config)?;
    run(&client, cli.command).await
}
