use anyhow::Context;
use clap::Parser;
use dropbox_store::utils::logger;
use dropbox_store::{OAuthClient, ServerConfig, SetupCli};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = SetupCli::parse();
    logger::init_cli_logger(cli.verbose);

    let oauth = OAuthClient::new(cli.client_id.clone(), cli.client_secret.clone())
        .with_token_url(cli.token_url.clone());

    tracing::info!(
        "Authorization codes for this app come from {}",
        oauth.authorization_page()?
    );

    let token = oauth
        .exchange_code(&cli.authorization_code)
        .await
        .context("fetching oauth2 token")?;

    let cfg_path = cli.config_path();
    let mut config = if cfg_path.exists() {
        ServerConfig::from_file(&cfg_path)
            .with_context(|| format!("reading {}", cfg_path.display()))?
    } else {
        ServerConfig::default()
    };

    config.set_dropbox_token(token);
    config
        .write_to_file(&cfg_path)
        .with_context(|| format!("writing {}", cfg_path.display()))?;

    tracing::info!("✅ Store configuration written to {}", cfg_path.display());
    eprintln!("You can now deploy the server with {}", cfg_path.display());
    Ok(())
}
