//! tempmail - disposable mailbox CLI
//!
//! Thin command-line front end over the gateway: mint a disposable address,
//! watch its inbox, or inspect provider health.

#![allow(missing_docs)]

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tempmail_gateway::{
    AccountEvent, CreateAccountOptions, GatewayConfig, MailGateway, MemoryStore, ProviderId,
};
use tracing::warn;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "tempmail", version, about = "Disposable mailbox gateway")]
struct Cli {
    /// Path to a TOML config file (environment overrides still apply)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a disposable account and print its address
    Create {
        /// Preferred provider for the first attempt
        #[arg(long)]
        provider: Option<ProviderId>,
        /// Desired local-part prefix
        #[arg(long)]
        prefix: Option<String>,
        /// Account lifetime in minutes
        #[arg(long)]
        ttl_minutes: Option<i64>,
    },
    /// Create an account and poll its inbox, printing messages as they land
    Watch {
        /// Preferred provider for the first attempt
        #[arg(long)]
        provider: Option<ProviderId>,
        /// Seconds between inbox polls
        #[arg(long, default_value_t = 10)]
        interval: u64,
    },
    /// Print the health snapshot of every configured provider
    Health,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let config = GatewayConfig::load(cli.config.as_deref()).context("loading configuration")?;
    let gateway = MailGateway::with_defaults(config, Arc::new(MemoryStore::new()))
        .context("assembling gateway")?;

    match cli.command {
        Commands::Create {
            provider,
            prefix,
            ttl_minutes,
        } => {
            let account = gateway
                .create_account(CreateAccountOptions {
                    provider,
                    prefix,
                    ttl: ttl_minutes.map(chrono::Duration::minutes),
                })
                .await?;
            println!("{}", account.address);
            println!("provider:   {}", account.provider);
            println!("expires at: {}", account.expires_at.to_rfc3339());
        }
        Commands::Watch { provider, interval } => {
            watch(&gateway, provider, Duration::from_secs(interval)).await?;
        }
        Commands::Health => {
            for snapshot in gateway.health().snapshot() {
                println!(
                    "{:<16} available={:<5} score={:>7.1} success_rate={:.2} failures={} avg_rt={:.0}ms",
                    snapshot.provider.to_string(),
                    snapshot.available,
                    snapshot.score,
                    snapshot.success_rate,
                    snapshot.consecutive_failures,
                    snapshot.avg_response_time_ms,
                );
            }
        }
    }

    Ok(())
}

async fn watch(
    gateway: &MailGateway,
    provider: Option<ProviderId>,
    interval: Duration,
) -> anyhow::Result<()> {
    let mut events = gateway.subscribe();
    let mut account = gateway
        .create_account(CreateAccountOptions {
            provider,
            ..Default::default()
        })
        .await?;
    println!("watching {} (ctrl-c to stop)", account.address);

    let mut seen: Vec<String> = Vec::new();
    loop {
        match gateway.check_inbox(&account).await {
            Ok(messages) => {
                for message in messages {
                    if seen.contains(&message.id) {
                        continue;
                    }
                    seen.push(message.id.clone());
                    println!(
                        "[{}] {} - {}",
                        message.received_at.format("%H:%M:%S"),
                        message.from,
                        message.subject
                    );
                }
            }
            Err(error) => warn!(%error, "inbox check failed"),
        }

        // A rate-limited provider may have rotated the account under us
        while let Ok(event) = events.try_recv() {
            if let AccountEvent::Rotated {
                from,
                account: replacement,
            } = event
            {
                println!(
                    "provider {} rate limited; rotated to {}",
                    from, replacement.address
                );
                seen.clear();
                account = replacement;
            }
        }

        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    Ok(())
}
