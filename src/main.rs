//! Demonstrations of the sluice actors.

use anyhow::Result;
use clap::{Parser, Subcommand};
use flexi_logger::Logger;
use sluice::{
    config::Config,
    samples::{Change, Counter, CounterMessage, Store, StoreMessage},
    spawn, spawn_checked, AskPolicy, Reservoir,
};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[clap(author, version, about)]
struct Arguments {
    /// Path to a TOML configuration file
    #[clap(short, long)]
    config: Option<PathBuf>,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Count increments sent from several tasks
    Counter {
        #[clap(short, long, default_value_t = 1000)]
        count: u64,
    },
    /// Fill a key-value store while watching one of its keys
    Store,
}

#[tokio::main]
async fn main() -> Result<()> {
    let arguments = Arguments::parse();
    let config = match &arguments.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    let _logger = Logger::try_with_env_or_str(&config.log_level)?.start()?;
    log_panics::init();
    let policy = config.ask.policy()?;

    match arguments.command {
        Command::Counter { count } => run_counter(count, policy).await,
        Command::Store => run_store(policy).await,
    }
}

async fn run_counter(count: u64, policy: AskPolicy) -> Result<()> {
    let counter = spawn_checked(Counter::new("counter")).await?;
    let workers: Vec<_> = (0..4)
        .map(|worker| {
            let counter = counter.clone();
            tokio::spawn(async move {
                for _ in (worker..count).step_by(4) {
                    counter.tell(CounterMessage::Increment(1));
                }
            })
        })
        .collect();
    for worker in workers {
        worker.await?;
    }
    let total = counter.ask(CounterMessage::Total, policy).await?;
    println!("Counted {} of {}", total, count);
    counter.send(CounterMessage::Stop).await?;
    Ok(())
}

async fn run_store(policy: AskPolicy) -> Result<()> {
    let changes = Reservoir::with_policy(policy);
    let store = spawn(Store::new(changes.clone()));
    let mut greeting = changes.subscribe("greeting".to_owned()).await?;

    let key = store
        .ask(
            |reply| StoreMessage::Insert {
                item: "Hello".to_owned(),
                reply,
            },
            policy,
        )
        .await?;
    println!("Stored under {}", key);
    for item in ["Hi", "Howdy"] {
        store.tell(StoreMessage::Update {
            key: "greeting".to_owned(),
            item: item.to_owned(),
        });
    }
    store.tell(StoreMessage::Delete {
        key: "greeting".to_owned(),
    });

    while let Some(change) = greeting.next().await {
        match change {
            Change::Stored(item) => println!("greeting is now {:?}", item),
            Change::Deleted => println!("greeting was deleted"),
        }
    }
    let everything = store.ask(StoreMessage::GetAll, policy).await?;
    println!("Store holds {}", everything.join(", "));
    Ok(())
}
