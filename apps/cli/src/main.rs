#![warn(clippy::all, clippy::pedantic)]

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::level_filters::LevelFilter;
use tracing::warn;
use trustmesh::crypto::KeyFormat;
use trustmesh::directory::{HttpKeyRegistry, KeyRegistry};

mod commands;
mod config;

use commands::{Session, read_input, write_output};
use config::Settings;

#[derive(Parser)]
#[command(name = "trustmesh")]
#[command(about = "Manage identity keys and exchange sealed messages", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Keyring passphrase
    #[arg(long, env = "TRUSTMESH_PASSPHRASE", hide_env_values = true)]
    passphrase: String,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Pem,
    Jwk,
}

impl From<Format> for KeyFormat {
    fn from(format: Format) -> Self {
        match format {
            Format::Pem => KeyFormat::Pem,
            Format::Jwk => KeyFormat::Jwk,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Generate the first key pair for the configured identity
    Keygen,

    /// Replace the current key, keeping the old one for decryption
    Rotate {
        /// Also publish the new key to the registry
        #[arg(long)]
        publish: bool,

        #[arg(short, long, value_enum, default_value = "pem")]
        format: Format,
    },

    /// Print the current public key
    Export {
        #[arg(short, long, value_enum, default_value = "pem")]
        format: Format,
    },

    /// List every key this keyring has held
    History,

    /// Publish the current public key to the registry
    Publish {
        #[arg(short, long, value_enum, default_value = "pem")]
        format: Format,
    },

    /// Encrypt and sign a message for a recipient
    Seal {
        /// Recipient identity
        #[arg(short, long)]
        to: String,

        /// Plaintext file (stdin if omitted)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Envelope output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Decrypt a message envelope and check its signature
    Open {
        /// Sender identity
        #[arg(short, long)]
        from: String,

        /// Envelope file (stdin if omitted)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Plaintext output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logger::init_with_level(if cli.verbose { LevelFilter::DEBUG } else { LevelFilter::WARN });

    let settings = Settings::load(cli.config.as_deref())?;
    let registry = HttpKeyRegistry::new(&settings.cli.registry_url, settings.core.directory.timeout())?;
    let session = Session::open(&settings, cli.passphrase.as_bytes(), Arc::new(registry) as Arc<dyn KeyRegistry>)?;

    match cli.command {
        Commands::Keygen => println!("{}", session.keygen()?),
        Commands::Rotate { publish, format } => println!("{}", session.rotate(publish, format.into()).await?),
        Commands::Export { format } => println!("{}", session.export(format.into())?),
        Commands::History => print!("{}", session.history()),
        Commands::Publish { format } => {
            let record = session.publish(format.into()).await?;
            println!("Published {}", record.fingerprint);
        }
        Commands::Seal { to, input, output } => {
            let plaintext = read_input(input.as_deref())?;
            let envelope = session.seal(&to.into(), &plaintext).await?;
            write_output(output.as_deref(), envelope.as_bytes())?;
        }
        Commands::Open { from, input, output } => {
            let raw = read_input(input.as_deref())?;
            let raw = String::from_utf8(raw).context("envelope is not UTF-8")?;
            let opened = session.open_envelope(&from.into(), &raw).await?;
            if !opened.verified {
                warn!(signature = ?opened.signature, "Signature could not be verified; the sender is not confirmed");
                eprintln!("WARNING: signature not verified ({:?})", opened.signature);
            }
            write_output(output.as_deref(), &opened.plaintext)?;
        }
    }

    Ok(())
}
