use std::path::PathBuf;

use clap::Parser;
use clap::Subcommand;

/// Command-line arguments of `wallet-cli`
#[derive(Parser, Debug, Clone)]
#[clap(name = "wallet-cli", author, version, about = "Keys, addresses and encrypted secrets")]
pub struct Args {
    /// Directory holding the master credential, audit log and fallback
    /// secret file.
    #[clap(long)]
    pub data_dir: Option<PathBuf>,

    /// Never prompt. The master password must come from WALLET_CORE_PASSWORD.
    #[clap(long)]
    pub non_interactive: bool,

    /// Store secrets in the data directory even if a native secret service
    /// is available.
    #[clap(long)]
    pub no_keychain: bool,

    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Choose the master password and session timeout.
    Setup {
        /// minutes a session stays unlocked, 0 prompts on every access
        #[clap(long, default_value = "15")]
        timeout: u32,

        /// replace an existing master password; secrets stored under the
        /// old one become unreadable
        #[clap(long)]
        force: bool,
    },

    /// Generate a new address.
    Generate {
        #[clap(long)]
        label: Option<String>,

        /// network name, defaults to the active network
        #[clap(long)]
        network: Option<String>,
    },

    /// Import a 24 word backup phrase.
    ImportMnemonic {
        /// the phrase, quoted. Read from the terminal when absent.
        phrase: Option<String>,

        #[clap(long)]
        label: Option<String>,

        #[clap(long)]
        network: Option<String>,
    },

    /// Import a raw private key given as 64 hex characters.
    ImportKey {
        private_key: String,

        #[clap(long)]
        label: Option<String>,

        #[clap(long)]
        network: Option<String>,
    },

    /// Print the backup phrase of an address.
    ExportMnemonic { address: String },

    /// Check an address checksum.
    Validate { address: String },

    /// List addresses.
    List,

    /// Delete an address and its private key.
    Remove { address: String },

    /// Select the active address.
    UseAddress { address: String },

    /// Manage networks.
    #[clap(subcommand)]
    Network(NetworkCommand),

    /// Print the audit log.
    Audit {
        /// only the most recent entries
        #[clap(long)]
        last: Option<usize>,
    },
}

#[derive(Debug, Clone, Subcommand)]
pub enum NetworkCommand {
    Add {
        name: String,
        url: String,
        /// uppercase chain prefix of addresses on this network
        prefix: String,
    },
    List,
    Use {
        name: String,
    },
    Remove {
        name: String,
    },
}
