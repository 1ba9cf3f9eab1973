use anyhow::{Context, Result};
use clap::Parser;
use ethers::types::U256;
use log::{error, info};

use xbridge::bubbles::BubbleLayoutEngine;
use xbridge::cli::{Cli, Command};
use xbridge::config::Config;
use xbridge::models::top_cryptocurrencies;
use xbridge::registry::EthRegistryClient;
use xbridge::validation::{validate_address, validate_dimensions};
use xbridge::web::WebServer;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    xbridge::logging::init(cli.debug, cli.log_file.as_deref())
        .context("Failed to initialize logging")?;

    let config = Config::load_or_default(&cli.config)
        .with_context(|| format!("Failed to load configuration from {:?}", cli.config))?;
    info!("Configuration loaded");

    let command = cli.command.unwrap_or(Command::Serve { host: None, port: None });
    match command {
        Command::Serve { host, port } => {
            let host = host.unwrap_or_else(|| config.server.host.clone());
            let port = port.unwrap_or(config.server.port);
            let server = WebServer::new(&config)?;
            server.start(&host, port).await?;
        }
        Command::Bubbles { width, height } => {
            validate_dimensions(width, height)?;
            let engine = BubbleLayoutEngine::new(config.bubbles.clone());
            let mut rng = rand::thread_rng();
            let placements = engine.layout(&top_cryptocurrencies(), width, height, &mut rng)?;
            println!("{}", serde_json::to_string_pretty(&placements)?);
        }
        Command::History { address, filter } => {
            let user = validate_address(&address)?;
            let client = EthRegistryClient::from_config(&config, cli.private_key.as_deref())?;
            let records = client.fetch_user_transactions(Some(user)).await;
            if let Some(message) = client.last_error().await {
                error!("{}", message);
                anyhow::bail!(message);
            }
            for record in filter.apply(&records) {
                println!(
                    "#{} {} {} {} -> {} {} {} [{}] {}",
                    record.id,
                    record.timestamp.format("%Y-%m-%d %H:%M:%S"),
                    record.source_chain,
                    record.amount_in,
                    record.target_chain,
                    record.amount_out,
                    record.target_token,
                    record.status_label(),
                    record.explorer_url(&config.registry.explorer_url)
                );
            }
        }
        ref register @ Command::Register { .. } => {
            let params = register
                .registration_params()
                .context("register command without parameters")?;
            let client = EthRegistryClient::from_config(&config, cli.private_key.as_deref())?;
            client.on_connected().await;
            match client.register(params).await {
                Some(outcome) => println!("{}", outcome),
                None => anyhow::bail!(client.last_error().await.unwrap_or_default()),
            }
        }
        Command::UpdateStatus { id, successful } => {
            let client = EthRegistryClient::from_config(&config, cli.private_key.as_deref())?;
            if !client.update_status(U256::from(id), successful).await {
                anyhow::bail!(client.last_error().await.unwrap_or_default());
            }
            println!("Transaction #{} updated", id);
        }
        Command::FlushPending => {
            let client = EthRegistryClient::from_config(&config, cli.private_key.as_deref())?;
            let flushed = client.flush_pending().await;
            println!("Flushed {} pending registrations", flushed);
        }
    }

    Ok(())
}
