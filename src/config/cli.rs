use clap::{Parser, Subcommand};
use std::ffi::OsString;
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "dropbox-store")]
#[command(about = "Put, fetch, delete and list blobs in a configured storage backend")]
pub struct StoreCli {
    #[arg(long, default_value = "./server.toml")]
    pub config: PathBuf,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Emit logs as JSON lines")]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: StoreCommand,
}

#[derive(Debug, Clone, Subcommand)]
pub enum StoreCommand {
    /// Upload a local file under a reference
    Put { reference: String, file: PathBuf },
    /// Download a reference, to stdout unless --output is given
    Get {
        reference: String,
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Delete a reference
    Delete { reference: String },
    /// List every stored reference with its size
    List {
        #[arg(long, help = "Override the configured entries per page")]
        page_size: Option<u32>,
    },
    /// Print the public link base, if the backend has one
    LinkBase,
}

impl StoreCommand {
    pub fn name(&self) -> &'static str {
        match self {
            StoreCommand::Put { .. } => "put",
            StoreCommand::Get { .. } => "get",
            StoreCommand::Delete { .. } => "delete",
            StoreCommand::List { .. } => "list",
            StoreCommand::LinkBase => "link-base",
        }
    }
}

#[derive(Debug, Clone, Parser)]
#[command(name = "setupstorage")]
#[command(about = "Exchange a Dropbox authorization code and store the token in the server config")]
pub struct SetupCli {
    /// Directory holding per-domain configuration [default: $HOME/upspin/deploy]
    #[arg(long = "where")]
    pub where_dir: Option<PathBuf>,

    /// Domain name of this installation
    #[arg(long)]
    pub domain: String,

    #[arg(long)]
    pub client_id: String,

    #[arg(long)]
    pub client_secret: String,

    #[arg(long, default_value = crate::core::oauth::DEFAULT_TOKEN_URL)]
    pub token_url: String,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,

    /// Authorization code copied from the Dropbox consent page
    pub authorization_code: String,
}

/// `$HOME/upspin/deploy`, or `./deploy` when no home directory is set.
pub fn default_deploy_dir(home: Option<OsString>) -> PathBuf {
    match home {
        Some(home) if !home.is_empty() => PathBuf::from(home).join("upspin").join("deploy"),
        _ => PathBuf::from("./deploy"),
    }
}

impl SetupCli {
    pub fn deploy_dir(&self) -> PathBuf {
        self.where_dir
            .clone()
            .unwrap_or_else(|| default_deploy_dir(std::env::var_os("HOME")))
    }

    pub fn config_path(&self) -> PathBuf {
        self.deploy_dir()
            .join(&self.domain)
            .join(crate::config::store_config::CONFIG_FILE_NAME)
    }
}
