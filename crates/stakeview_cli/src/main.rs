//! stakeview CLI: one-shot chain queries and live block watching.

use clap::{Parser, Subcommand};
use serde::Serialize;
use stakeview::bus::{ChainEvent, Topic};
use stakeview::chain::{FetchConfig, SystemClock};
use stakeview::config::NetworksConfig;
use stakeview::subscription::SubscriptionConfig;
use stakeview::{ChainClient, Service};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{info, warn};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()))
        .init();
    let cli = Cli::parse();
    let networks = NetworksConfig::load(cli.config.as_deref())?;
    let fetch = FetchConfig {
        timeout_secs: cli.timeout_secs,
    };
    let rt = tokio::runtime::Runtime::new()?;
    match cli.command {
        Command::Query(args) => rt.block_on(run_query(&networks, &fetch, args)),
        Command::Watch(args) => rt.block_on(run_watch(&networks, &fetch, args)),
    }
}

#[derive(Parser)]
#[command(name = "stakeview")]
#[command(about = "Aggregated, per-block cached views of Cosmos chain nodes")]
struct Cli {
    /// Networks file; defaults to $STAKEVIEW_NETWORKS_PATH or ./config/networks.json.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[arg(long, global = true, default_value_t = 30)]
    timeout_secs: u64,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run one query against a network and print the result as JSON.
    Query(QueryArgs),
    /// Follow new blocks on the configured networks and log published events.
    Watch(WatchArgs),
}

#[derive(Parser)]
struct QueryArgs {
    #[arg(long)]
    network: String,
    #[command(subcommand)]
    query: Query,
}

#[derive(Subcommand)]
enum Query {
    Validators,
    Validator {
        #[arg(long)]
        address: String,
    },
    Proposals,
    Proposal {
        #[arg(long)]
        id: u64,
    },
    GovernanceParameters,
    Vote {
        #[arg(long)]
        proposal: u64,
        #[arg(long)]
        address: String,
    },
    /// Block at a height; latest when omitted.
    Block {
        #[arg(long)]
        height: Option<u64>,
    },
    Transactions {
        #[arg(long)]
        address: String,
    },
    Balances {
        #[arg(long)]
        address: String,
    },
    Delegations {
        #[arg(long)]
        address: String,
    },
    Undelegations {
        #[arg(long)]
        address: String,
    },
    Delegation {
        #[arg(long)]
        delegator: String,
        #[arg(long)]
        validator: String,
    },
    Rewards {
        #[arg(long)]
        delegator: Option<String>,
        #[arg(long)]
        validator: Option<String>,
    },
    Overview {
        #[arg(long)]
        address: String,
    },
    BondedTokens,
    AnnualProvision,
}

#[derive(Parser)]
struct WatchArgs {
    /// Networks to follow; all configured networks when omitted.
    #[arg(long)]
    network: Vec<String>,
    /// Addresses whose transactions are logged, as `network:address`.
    #[arg(long)]
    address: Vec<String>,
    #[arg(long, default_value_t = 5)]
    settle_secs: u64,
}

fn print_json<T: Serialize>(value: &T) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn run_query(
    networks: &NetworksConfig,
    fetch: &FetchConfig,
    args: QueryArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let network = networks.network(&args.network)?.clone();
    let client = ChainClient::connect(network, fetch, Arc::new(SystemClock))?;
    match args.query {
        Query::Validators => print_json(&client.get_all_validators().await?),
        Query::Validator { address } => print_json(&client.get_validator_by_address(&address).await?),
        Query::Proposals => print_json(&client.get_all_proposals().await?),
        Query::Proposal { id } => print_json(&client.get_proposal_by_id(id).await?),
        Query::GovernanceParameters => print_json(&client.get_governance_parameters().await?),
        Query::Vote { proposal, address } => {
            print_json(&client.get_delegator_vote(proposal, &address).await?)
        }
        Query::Block { height } => print_json(&client.get_block_by_height(height).await?),
        Query::Transactions { address } => print_json(&client.get_transactions(&address).await?),
        Query::Balances { address } => print_json(&client.get_balances(&address).await?),
        Query::Delegations { address } => print_json(&client.get_delegations(&address).await?),
        Query::Undelegations { address } => print_json(&client.get_undelegations(&address).await?),
        Query::Delegation {
            delegator,
            validator,
        } => print_json(
            &client
                .get_delegation_for_validator(&delegator, &validator)
                .await?,
        ),
        Query::Rewards {
            delegator,
            validator,
        } => print_json(
            &client
                .get_rewards(delegator.as_deref(), validator.as_deref())
                .await?,
        ),
        Query::Overview { address } => print_json(&client.get_overview(&address).await?),
        Query::BondedTokens => print_json(&client.get_bonded_tokens().await?),
        Query::AnnualProvision => print_json(&client.get_annual_provision().await?),
    }
}

fn log_events(mut events: broadcast::Receiver<ChainEvent>) {
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(ChainEvent::BlockAdded { network_id, block }) => info!(
                    network = %network_id,
                    height = block.height,
                    transactions = block.transactions.len(),
                    "block added"
                ),
                Ok(ChainEvent::UserTransactionAdded {
                    network_id,
                    address,
                    transaction,
                }) => info!(
                    network = %network_id,
                    %address,
                    hash = %transaction.hash,
                    kind = %transaction.tx_type,
                    "user transaction added"
                ),
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    warn!(missed, "event listener lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });
}

async fn run_watch(
    networks: &NetworksConfig,
    fetch: &FetchConfig,
    args: WatchArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut selected = networks.clone();
    if !args.network.is_empty() {
        selected.networks.retain(|n| args.network.contains(&n.id));
    }
    let subscription = SubscriptionConfig {
        settle_delay: Duration::from_secs(args.settle_secs),
    };
    let mut service = Service::new(&selected, fetch, subscription, Arc::new(SystemClock))?;
    let bus = service.bus();
    for network_id in service.network_ids() {
        log_events(bus.subscribe(Topic::block_added(network_id))?);
    }
    for entry in &args.address {
        let Some((network_id, address)) = entry.split_once(':') else {
            warn!(entry = %entry, "expected network:address, skipping");
            continue;
        };
        log_events(bus.subscribe(Topic::user_transaction_added(network_id, address))?);
    }

    service.start();
    info!(networks = selected.networks.len(), "watching; ctrl-c to stop");
    tokio::signal::ctrl_c().await?;
    service.stop().await;
    Ok(())
}
