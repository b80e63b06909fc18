use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use matrix_mul::{
    Config, ConsoleReporter, DispatchMode, Error, Granularity, Outcome, Reporter, Strategy,
    run, run_local,
};
use matrix_mul_transport::{LocalTransport, TcpTransport, Timeout, Transport, ping_pong};
use matrix_mul_types::{Element, Rank};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Multiply a random ROWS x COLUMNS matrix by a random COLUMNS x ROWS matrix
    Multiply(MultiplyArgs),
    /// Bounce a counter between ranks 0 and 1
    PingPong {
        #[arg(long, default_value_t = 10)]
        limit: u64,
        #[command(flatten)]
        launch: Launch,
    },
}

#[derive(Debug, Args)]
struct MultiplyArgs {
    rows: usize,
    columns: usize,
    #[arg(long, value_enum, default_value_t = Strategy::Collective)]
    strategy: Strategy,
    #[arg(long, value_enum, default_value_t = Granularity::Cell)]
    granularity: Granularity,
    #[arg(long, value_enum, default_value_t = DispatchMode::Lockstep)]
    dispatch: DispatchMode,
    #[arg(long, default_value_t = 0)]
    seed: u64,
    /// Generated entries are drawn from [0, MAX_VALUE)
    #[arg(long, default_value_t = 100)]
    max_value: Element,
    #[arg(long, default_value_t = 0)]
    root: Rank,
    /// Print both operands before the product
    #[arg(long)]
    print: bool,
    /// Check the product against a sequential multiplication
    #[arg(long)]
    verify: bool,
    #[command(flatten)]
    launch: Launch,
}

// Where the ranks of the group live.
#[derive(Debug, Args)]
struct Launch {
    /// Run N ranks as tasks inside this process
    #[arg(long)]
    local: Option<usize>,
    /// Rank of this process in the group
    #[arg(long, env = "MATMUL_RANK")]
    rank: Option<Rank>,
    /// Listen address of every rank, in rank order
    #[arg(long, env = "MATMUL_PEERS", value_delimiter = ',')]
    peers: Vec<SocketAddr>,
    /// Fail a receive that waits longer than this (multi-process runs)
    #[arg(long)]
    timeout_ms: Option<u64>,
}

enum Group {
    Local(usize),
    Peers { rank: Rank, peers: Vec<SocketAddr> },
}

impl Launch {
    fn group(&self) -> Result<Group, Error> {
        match (self.local, self.rank) {
            (Some(count), _) => Ok(Group::Local(count)),
            (None, Some(rank)) if !self.peers.is_empty() => Ok(Group::Peers {
                rank,
                peers: self.peers.clone(),
            }),
            _ => Err(Error::Configuration(
                "pass --local <N>, or --rank with --peers".into(),
            )),
        }
    }

    /// Connects this rank to the rest of the group.
    async fn connect(&self, rank: Rank, peers: Vec<SocketAddr>) -> Result<Box<dyn Transport>, Error> {
        let transport = TcpTransport::bind(rank, peers).await?;
        Ok(match self.timeout_ms {
            Some(ms) => Box::new(Timeout::new(transport, Duration::from_millis(ms))),
            None => Box::new(transport),
        })
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    match Cli::parse().command {
        Command::Multiply(args) => multiply(args).await?,
        Command::PingPong { limit, launch } => probe(limit, launch).await?,
    }
    Ok(())
}

async fn multiply(args: MultiplyArgs) -> Result<(), Error> {
    let config = Config::new(args.rows, args.columns)
        .with_root(args.root)
        .with_seed(args.seed)
        .with_max_value(args.max_value)
        .with_strategy(args.strategy)
        .with_granularity(args.granularity)
        .with_dispatch(args.dispatch);

    let outcome: Option<Outcome> = match args.launch.group()? {
        Group::Local(count) => Some(run_local(config, count).await?),
        Group::Peers { rank, peers } => {
            config.validate(peers.len())?;
            let transport = args.launch.connect(rank, peers).await?;
            run(transport.as_ref(), &config).await?
        }
    };

    if let Some(outcome) = outcome {
        ConsoleReporter::new(io::stdout().lock())
            .print_operands(args.print)
            .verify(args.verify)
            .report(&outcome)?;
    }
    Ok(())
}

async fn probe(limit: u64, launch: Launch) -> Result<(), Error> {
    match launch.group()? {
        Group::Local(count) => {
            let handles: Vec<_> = LocalTransport::group(count)
                .into_iter()
                .map(|transport| tokio::spawn(async move { ping_pong(&transport, limit).await }))
                .collect();
            for (rank, handle) in handles.into_iter().enumerate() {
                let count = handle.await??;
                println!("rank {rank}: {count}");
            }
        }
        Group::Peers { rank, peers } => {
            let transport = launch.connect(rank, peers).await?;
            let count = ping_pong(transport.as_ref(), limit).await?;
            println!("rank {rank}: {count}");
        }
    }
    Ok(())
}
