use anyhow::Context;
use clap::Parser;
use dropbox_store::core::dropbox::PAGE_SIZE_KEY;
use dropbox_store::utils::error::ErrorSeverity;
use dropbox_store::utils::{logger, validation::Validate};
use dropbox_store::{Registry, ServerConfig, Storage, StoreCli, StoreCommand, StoreError};
use std::io::Write;
use tracing::Instrument;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = StoreCli::parse();

    if cli.json_logs {
        logger::init_json_logger(cli.verbose);
    } else {
        logger::init_cli_logger(cli.verbose);
    }

    tracing::info!("Starting dropbox-store CLI");
    if cli.verbose {
        tracing::debug!("CLI args: {:?}", cli);
    }

    let config = ServerConfig::from_file(&cli.config)
        .with_context(|| format!("reading {}", cli.config.display()))?;
    config.validate()?;

    let mut opts = config.storage_opts();
    if let StoreCommand::List {
        page_size: Some(page_size),
    } = &cli.command
    {
        opts = opts.with_key_value(PAGE_SIZE_KEY, page_size.to_string());
    }

    let storage = Registry::with_defaults().dial(config.backend(), &opts)?;
    let span = logger::store_span(config.backend(), cli.command.name());
    let outcome = run(storage.as_ref(), &cli.command).instrument(span).await;
    storage.close();

    if let Err(e) = outcome {
        tracing::error!("❌ {} (kind: {:?})", e, e.kind());
        tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());

        let exit_code = match e.severity() {
            ErrorSeverity::Low => 0,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        };
        if exit_code > 0 {
            std::process::exit(exit_code);
        }
    }

    Ok(())
}

async fn run(storage: &dyn Storage, command: &StoreCommand) -> Result<(), StoreError> {
    match command {
        StoreCommand::Put { reference, file } => {
            let contents = std::fs::read(file)?;
            storage.put(reference, &contents).await?;
            println!("✅ Stored {} ({} bytes)", reference, contents.len());
        }
        StoreCommand::Get { reference, output } => {
            let data = storage.download(reference).await?;
            match output {
                Some(path) => {
                    std::fs::write(path, &data)?;
                    println!("📁 Saved {} to {}", reference, path.display());
                }
                None => std::io::stdout().write_all(&data)?,
            }
        }
        StoreCommand::Delete { reference } => {
            storage.delete(reference).await?;
            println!("🗑️  Deleted {}", reference);
        }
        StoreCommand::List { .. } => {
            let lister = storage.as_lister().ok_or(StoreError::NotSupported)?;
            let mut token = String::new();
            let mut total = 0usize;
            loop {
                let page = lister.list(&token).await?;
                for item in &page.refs {
                    println!("{}\t{}", item.size, item.reference);
                }
                total += page.refs.len();
                if page.is_last() {
                    break;
                }
                token = page.next_token;
            }
            tracing::info!("Listed {} references", total);
        }
        StoreCommand::LinkBase => {
            let base = storage.link_base()?;
            println!("{}", base);
        }
    }
    Ok(())
}
