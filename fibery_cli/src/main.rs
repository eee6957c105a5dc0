use clap::Parser;
use fibery_cli::cli::{Cli, Commands};
use fibery_cli::commands;
use fibery_core::PollerConfig;
use tokio::sync::watch;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    fibery_core::o11y::init_global_from_env()?;
    let cli = Cli::parse();

    let output = match cli.command {
        Commands::Types { schema } => {
            let index = commands::load_schema(&schema).await?;
            commands::types(&index)?
        }
        Commands::Fields {
            schema,
            entity_type,
        } => {
            let index = commands::load_schema(&schema).await?;
            commands::fields(&index, &entity_type)?
        }
        Commands::Query(args) => {
            let index = commands::load_schema(&args.schema).await?;
            commands::query(&index, &args)?
        }
        Commands::Poll(args) => {
            let cfg = PollerConfig::from_env()?;
            commands::poll(&cfg, &args).await?
        }
        Commands::Run(args) => {
            let cfg = PollerConfig::from_env()?;
            let (shutdown_tx, shutdown_rx) = watch::channel(false);
            tokio::spawn(async move {
                match tokio::signal::ctrl_c().await {
                    Ok(()) => tracing::info!("ctrl-c received; stopping"),
                    Err(e) => tracing::warn!(error = %e, "ctrl-c handler failed; stopping"),
                }
                let _ = shutdown_tx.send(true);
            });
            commands::run(&cfg, &args, shutdown_rx).await?;
            return Ok(());
        }
        Commands::Config => {
            let cfg = PollerConfig::from_env()?;
            commands::config(&cfg)?
        }
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
