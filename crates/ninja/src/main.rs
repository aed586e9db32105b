mod cli;

use std::time::Duration;

use bitcoin::bip32::DerivationPath;
use bitcoin::consensus::encode::deserialize_hex;
use bitcoin::{ScriptBuf, Transaction};
use clap::Parser;
use eyre::{eyre, WrapErr};
use serde::Serialize;

use ninja_core::transport::HttpTransport;
use ninja_core::{endpoint, Destination, NinjaClient};

use cli::{Cli, Command, KeysetAction, WalletAction};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> eyre::Result<()> {
    let args = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .with_level(true)
        .init();

    let client = build_client(&args)?;
    tracing::debug!(
        base = %client.base_address(),
        network = %client.network(),
        colored = ?client.colored(),
        "client ready"
    );

    run(&client, args.command).await
}

fn build_client(args: &Cli) -> eyre::Result<NinjaClient> {
    let transport =
        HttpTransport::with_timeouts(CONNECT_TIMEOUT, Duration::from_secs(args.timeout_secs))
            .context("build HTTP client")?;
    let base = match &args.base_url {
        Some(url) => url.clone(),
        None => endpoint::default_base_address(args.network)
            .context("no public server for this network; pass --base-url")?
            .to_string(),
    };
    let mut client = NinjaClient::with_transport(&base, args.network, transport)
        .with_context(|| format!("invalid base url `{base}`"))?;
    client.set_colored(args.colored);
    Ok(client)
}

async fn run(client: &NinjaClient, command: Command) -> eyre::Result<()> {
    match command {
        Command::Balance {
            address,
            unspent_only,
        } => {
            let dest = Destination::parse(&address, client.network())?;
            print_json(&client.balance(&dest, unspent_only).await?)
        }
        Command::Summary { address } => {
            let dest = Destination::parse(&address, client.network())?;
            print_json(&client.balance_summary(&dest).await?)
        }
        Command::Tx { txid } => print_json(&client.transaction(&txid).await?),
        Command::Block {
            feature,
            header_only,
        } => print_json(&client.block(&feature, header_only).await?),
        Command::Broadcast { hex } => {
            let tx: Transaction =
                deserialize_hex(hex.trim()).context("decode raw transaction hex")?;
            client
                .broadcast(&tx)
                .await
                .context("broadcast transaction")?;
            println!("{}", tx.compute_txid());
            Ok(())
        }
        Command::Wallet { name, action } => run_wallet(client, &name, action).await,
        Command::Keyset {
            wallet,
            name,
            action,
        } => run_keyset(client, &wallet, &name, action).await,
    }
}

async fn run_wallet(client: &NinjaClient, name: &str, action: WalletAction) -> eyre::Result<()> {
    let wallet = client.wallet(name)?;
    match action {
        WalletAction::Create => {
            let created = wallet.create_if_not_exists().await?;
            report_created("wallet", name, created);
            Ok(())
        }
        WalletAction::Show => print_json(&wallet.get().await?),
        WalletAction::Balance { unspent_only } => print_json(&wallet.balance(unspent_only).await?),
        WalletAction::Summary => print_json(&wallet.balance_summary().await?),
        WalletAction::Addresses => print_json(&wallet.addresses().await?),
        WalletAction::AddAddress {
            address,
            redeem_script,
            no_merge_past,
        } => {
            let dest = Destination::parse(&address, client.network())?;
            let redeem = redeem_script
                .map(|hex| ScriptBuf::from_hex(&hex))
                .transpose()
                .context("decode redeem script hex")?;
            let created = wallet
                .create_address_if_not_exists(&dest, redeem.as_deref(), !no_merge_past)
                .await?;
            report_created("address", &address, created);
            Ok(())
        }
        WalletAction::Keysets => print_json(&wallet.keysets().await?),
    }
}

async fn run_keyset(
    client: &NinjaClient,
    wallet: &str,
    name: &str,
    action: KeysetAction,
) -> eyre::Result<()> {
    let keyset = client.wallet(wallet)?.keyset(name)?;
    match action {
        KeysetAction::Create {
            xpubs,
            signatures,
            path,
        } => {
            let path = path.as_deref().map(parse_key_path).transpose()?;
            let created = keyset.create_if_not_exists(&xpubs, signatures, path).await?;
            report_created("keyset", name, created);
            Ok(())
        }
        KeysetAction::Delete => {
            if keyset.delete().await? {
                println!("deleted keyset `{name}`");
                Ok(())
            } else {
                Err(eyre!("keyset `{name}` does not exist in wallet `{wallet}`"))
            }
        }
        KeysetAction::NewKey => print_json(&keyset.generate_key().await?),
    }
}

fn parse_key_path(raw: &str) -> eyre::Result<DerivationPath> {
    let bare = raw.trim().trim_start_matches('m').trim_start_matches('/');
    format!("m/{bare}")
        .parse()
        .with_context(|| format!("invalid derivation path `{raw}`"))
}

fn report_created(kind: &str, name: &str, created: bool) {
    if created {
        println!("created {kind} `{name}`");
    } else {
        println!("{kind} `{name}` already exists");
    }
}

fn print_json<T: Serialize>(value: &Option<T>) -> eyre::Result<()> {
    match value {
        Some(value) => {
            let json = serde_json::to_string_pretty(value).context("render response")?;
            println!("{json}");
            Ok(())
        }
        None => Err(eyre!("not found")),
    }
}
