use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use host_gateway::config::{default_config, load_config, ConfigError};
use host_gateway::mapping::{store_from_config, HostMapping};

#[derive(Parser)]
#[command(name = "gateway-cli")]
#[command(about = "Operator CLI for the host gateway", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Look a host up in the configured mapping store
    Resolve {
        host: String,
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Load and validate a configuration file
    CheckConfig { path: PathBuf },
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Resolve { host, config } => {
            let config = match config {
                Some(path) => load_config(&path)?,
                None => default_config()?,
            };
            let store = store_from_config(&config.mapping_store)?;

            match store.find(&host).await? {
                Some(mapping) => {
                    println!("{}", serde_json::to_string_pretty(&redacted(mapping))?);
                    Ok(ExitCode::SUCCESS)
                }
                None => {
                    eprintln!("No mapping for host {} in {}", host, store.describe());
                    Ok(ExitCode::FAILURE)
                }
            }
        }
        Commands::CheckConfig { path } => match load_config(&path) {
            Ok(_) => {
                println!("{}: ok", path.display());
                Ok(ExitCode::SUCCESS)
            }
            Err(ConfigError::Validation(errors)) => {
                for error in errors {
                    eprintln!("{}: {}", path.display(), error);
                }
                Ok(ExitCode::FAILURE)
            }
            Err(e) => Err(e.into()),
        },
    }
}

fn redacted(mut mapping: HostMapping) -> HostMapping {
    if let Some(certificate) = mapping.certificate.as_mut() {
        certificate.private_key = "<redacted>".to_string();
    }
    mapping
}
