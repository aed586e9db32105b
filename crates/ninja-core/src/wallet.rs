//! Wallet and keyset views over a [`NinjaClient`].
//!
//! Both views only hold a resource name and a borrow of the client; they
//! never cache server state.

use bitcoin::bip32::{DerivationPath, Xpub};
use bitcoin::Script;

use crate::client::NinjaClient;
use crate::destination::Destination;
use crate::error::ClientError;
use crate::path::escape_segment;
use crate::types::{
    BalanceModel, BalanceSummary, HdKeyData, HdKeySet, InsertWalletAddress, KeySetData,
    WalletAddress, WalletModel,
};

fn check_name(kind: &str, name: &str) -> Result<(), ClientError> {
    if name.is_empty() {
        return Err(ClientError::InvalidArgument(format!("{kind} name must not be empty")));
    }
    escape_segment(name).map(|_| ())
}

// ==============================================================================
// Wallet
// ==============================================================================

#[derive(Debug, Clone)]
pub struct WalletClient<'a> {
    client: &'a NinjaClient,
    name: String,
}

impl<'a> WalletClient<'a> {
    pub fn new(client: &'a NinjaClient, name: &str) -> Result<Self, ClientError> {
        check_name("wallet", name)?;
        Ok(Self {
            client,
            name: name.to_owned(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn client(&self) -> &'a NinjaClient {
        self.client
    }

    pub async fn create(&self) -> Result<Option<WalletModel>, ClientError> {
        self.client.create_wallet(&self.name).await
    }

    /// Returns `false` when the wallet already existed.
    pub async fn create_if_not_exists(&self) -> Result<bool, ClientError> {
        self.client.create_wallet_if_not_exists(&self.name).await
    }

    pub async fn get(&self) -> Result<Option<WalletModel>, ClientError> {
        self.client.wallet_info(&self.name).await
    }

    pub async fn balance(&self, unspent_only: bool) -> Result<Option<BalanceModel>, ClientError> {
        self.client.wallet_balance(&self.name, unspent_only).await
    }

    pub async fn balance_summary(&self) -> Result<Option<BalanceSummary>, ClientError> {
        self.client.wallet_balance_summary(&self.name).await
    }

    pub async fn create_address(
        &self,
        dest: &Destination,
        redeem_script: Option<&Script>,
        merge_past: bool,
    ) -> Result<Option<WalletAddress>, ClientError> {
        let address = self.client.insert_address(dest, redeem_script, merge_past)?;
        self.create_address_from(&address).await
    }

    pub async fn create_address_if_not_exists(
        &self,
        dest: &Destination,
        redeem_script: Option<&Script>,
        merge_past: bool,
    ) -> Result<bool, ClientError> {
        let address = self.client.insert_address(dest, redeem_script, merge_past)?;
        self.create_address_from_if_not_exists(&address).await
    }

    /// Register the P2SH address of `redeem_script`, along with the script.
    pub async fn create_script_address(
        &self,
        redeem_script: &Script,
        merge_past: bool,
    ) -> Result<Option<WalletAddress>, ClientError> {
        self.create_address(&Destination::p2sh(redeem_script), Some(redeem_script), merge_past)
            .await
    }

    pub async fn create_script_address_if_not_exists(
        &self,
        redeem_script: &Script,
        merge_past: bool,
    ) -> Result<bool, ClientError> {
        self.create_address_if_not_exists(
            &Destination::p2sh(redeem_script),
            Some(redeem_script),
            merge_past,
        )
        .await
    }

    pub async fn create_address_from(
        &self,
        address: &InsertWalletAddress,
    ) -> Result<Option<WalletAddress>, ClientError> {
        self.client.create_address(&self.name, address).await
    }

    pub async fn create_address_from_if_not_exists(
        &self,
        address: &InsertWalletAddress,
    ) -> Result<bool, ClientError> {
        self.client.create_address_if_not_exists(&self.name, address).await
    }

    pub async fn addresses(&self) -> Result<Option<Vec<WalletAddress>>, ClientError> {
        self.client.addresses(&self.name).await
    }

    pub async fn keysets(&self) -> Result<Option<Vec<KeySetData>>, ClientError> {
        self.client.keysets(&self.name).await
    }

    /// View scoped to the keyset `name` of this wallet.
    pub fn keyset(&self, name: &str) -> Result<KeySetClient<'a>, ClientError> {
        KeySetClient::new(self.clone(), name)
    }
}

// ==============================================================================
// KeySet
// ==============================================================================

#[derive(Debug, Clone)]
pub struct KeySetClient<'a> {
    wallet: WalletClient<'a>,
    name: String,
}

impl<'a> KeySetClient<'a> {
    pub fn new(wallet: WalletClient<'a>, name: &str) -> Result<Self, ClientError> {
        check_name("keyset", name)?;
        Ok(Self {
            wallet,
            name: name.to_owned(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn wallet(&self) -> &WalletClient<'a> {
        &self.wallet
    }

    fn client(&self) -> &'a NinjaClient {
        self.wallet.client()
    }

    fn descriptor(
        &self,
        keys: &[Xpub],
        signature_count: u32,
        path: Option<DerivationPath>,
    ) -> HdKeySet {
        self.client().keyset(&self.name, keys, signature_count, path)
    }

    fn named(&self, mut keyset: HdKeySet) -> HdKeySet {
        keyset.name.clone_from(&self.name);
        keyset
    }

    pub async fn create(
        &self,
        keys: &[Xpub],
        signature_count: u32,
        path: Option<DerivationPath>,
    ) -> Result<Option<HdKeySet>, ClientError> {
        let keyset = self.descriptor(keys, signature_count, path);
        self.client().create_keyset(self.wallet.name(), &keyset).await
    }

    /// Create from a prepared descriptor; its name is replaced by this
    /// keyset's name.
    pub async fn create_from(&self, keyset: HdKeySet) -> Result<Option<HdKeySet>, ClientError> {
        let keyset = self.named(keyset);
        self.client().create_keyset(self.wallet.name(), &keyset).await
    }

    pub async fn create_if_not_exists(
        &self,
        keys: &[Xpub],
        signature_count: u32,
        path: Option<DerivationPath>,
    ) -> Result<bool, ClientError> {
        let keyset = self.descriptor(keys, signature_count, path);
        self.client()
            .create_keyset_if_not_exists(self.wallet.name(), &keyset)
            .await
    }

    pub async fn create_from_if_not_exists(&self, keyset: HdKeySet) -> Result<bool, ClientError> {
        let keyset = self.named(keyset);
        self.client()
            .create_keyset_if_not_exists(self.wallet.name(), &keyset)
            .await
    }

    pub async fn generate_key(&self) -> Result<Option<HdKeyData>, ClientError> {
        self.client().generate_key(self.wallet.name(), &self.name).await
    }

    /// Returns `false` when the keyset was already absent.
    pub async fn delete(&self) -> Result<bool, ClientError> {
        self.client().delete_keyset(self.wallet.name(), &self.name).await
    }
}
