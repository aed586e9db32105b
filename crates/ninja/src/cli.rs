use bitcoin::bip32::Xpub;
use bitcoin::{Network, Txid};
use clap::{Parser, Subcommand};

use ninja_core::BlockFeature;

/// Command-line client for the QBit Ninja block explorer API.
#[derive(Parser)]
#[command(version, about)]
pub struct Cli {
    /// Server URL. Defaults to the public server of `--network`.
    #[arg(long, env = "NINJA_BASE_URL")]
    pub base_url: Option<String>,

    /// Bitcoin network (bitcoin, testnet, signet, regtest).
    #[arg(long, default_value = "bitcoin", env = "NINJA_NETWORK")]
    pub network: Network,

    /// Show colored coins in balances (true/false). Unset leaves it to the server.
    #[arg(long, env = "NINJA_COLORED")]
    pub colored: Option<bool>,

    /// Total timeout per request, in seconds.
    #[arg(long, default_value = "30", env = "NINJA_TIMEOUT_SECS")]
    pub timeout_secs: u64,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Operations touching an address.
    Balance {
        /// Address or colored address.
        address: String,
        #[arg(long)]
        unspent_only: bool,
    },
    /// Balance summary of an address.
    Summary { address: String },
    /// Fetch a transaction.
    Tx { txid: Txid },
    /// Fetch a block by height, hash, `last`, or `last-N`.
    Block {
        feature: BlockFeature,
        #[arg(long)]
        header_only: bool,
    },
    /// Broadcast a raw hex-encoded transaction.
    Broadcast { hex: String },
    /// Wallet operations.
    Wallet {
        name: String,
        #[command(subcommand)]
        action: WalletAction,
    },
    /// Keyset operations within a wallet.
    Keyset {
        wallet: String,
        name: String,
        #[command(subcommand)]
        action: KeysetAction,
    },
}

#[derive(Subcommand)]
pub enum WalletAction {
    /// Create the wallet unless it already exists.
    Create,
    Show,
    Balance {
        #[arg(long)]
        unspent_only: bool,
    },
    Summary,
    Addresses,
    /// Register an address in the wallet unless already registered.
    AddAddress {
        address: String,
        /// Hex-encoded redeem script of a P2SH address.
        #[arg(long)]
        redeem_script: Option<String>,
        /// Skip associating past activity of the address with the wallet.
        #[arg(long)]
        no_merge_past: bool,
    },
    Keysets,
}

#[derive(Subcommand)]
pub enum KeysetAction {
    /// Create the keyset unless it already exists.
    Create {
        /// Extended public key (repeatable).
        #[arg(long = "xpub", required = true)]
        xpubs: Vec<Xpub>,
        /// Required signature count.
        #[arg(long, default_value = "1")]
        signatures: u32,
        /// Derivation path, e.g. `44'/0'/0'`.
        #[arg(long)]
        path: Option<String>,
    },
    Delete,
    /// Derive the next unused key.
    NewKey,
}
