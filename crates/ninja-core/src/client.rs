use std::future::Future;
use std::sync::Arc;

use bitcoin::bip32::{DerivationPath, Xpub};
use bitcoin::consensus::encode::serialize_hex;
use bitcoin::{Network, Script, Transaction, Txid};
use reqwest::Method;
use serde::Serialize;
use tracing::{debug, trace};
use url::Url;

use crate::codec::{stamp_network, Codec, Payload};
use crate::destination::Destination;
use crate::endpoint::{absolute_url, default_base_address, parse_base_address};
use crate::error::ClientError;
use crate::path::{keyset_path, QueryParams, ResourcePath};
use crate::transport::{HttpRequest, HttpTransport, Transport};
use crate::types::{
    BalanceModel, BalanceSummary, BlockFeature, GetBlockResponse, GetTransactionResponse,
    HdKeyData, HdKeySet, InsertWalletAddress, KeySetData, WalletAddress, WalletModel,
};
use crate::wallet::WalletClient;

// ==============================================================================
// NinjaClient: typed client for a QBit Ninja server
// ==============================================================================

/// Typed client for a QBit Ninja server.
///
/// Holds the base address, the network and the colored-balance
/// preference; every call is an independent request. The colored
/// preference can only change through `&mut self`, so it never changes
/// under a request in flight or under a borrowed [`WalletClient`].
#[derive(Clone)]
pub struct NinjaClient {
    base_address: Url,
    network: Network,
    colored: Option<bool>,
    codec: Codec,
    transport: Arc<dyn Transport>,
}

impl std::fmt::Debug for NinjaClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NinjaClient")
            .field("base_address", &self.base_address.as_str())
            .field("network", &self.network)
            .field("colored", &self.colored)
            .finish_non_exhaustive()
    }
}

impl NinjaClient {
    /// Client for the public server of `network` (mainnet or testnet).
    pub fn new(network: Network) -> Result<Self, ClientError> {
        let base = default_base_address(network)?;
        Ok(Self::from_parts(base, network, Arc::new(HttpTransport::new()?)))
    }

    /// Client for a self-hosted server.
    pub fn with_base_address(base_address: &str, network: Network) -> Result<Self, ClientError> {
        let base = parse_base_address(base_address)?;
        Ok(Self::from_parts(base, network, Arc::new(HttpTransport::new()?)))
    }

    pub fn with_transport(
        base_address: &str,
        network: Network,
        transport: impl Transport + 'static,
    ) -> Result<Self, ClientError> {
        let base = parse_base_address(base_address)?;
        Ok(Self::from_parts(base, network, Arc::new(transport)))
    }

    fn from_parts(base_address: Url, network: Network, transport: Arc<dyn Transport>) -> Self {
        Self {
            base_address,
            network,
            colored: None,
            codec: Codec::new(network),
            transport,
        }
    }

    pub fn base_address(&self) -> &Url {
        &self.base_address
    }

    pub fn network(&self) -> Network {
        self.network
    }

    /// Colored-coin balance preference: `Some(true)` shows colored coins,
    /// `Some(false)` hides them, `None` leaves it to the server (colored
    /// addresses only).
    pub fn colored(&self) -> Option<bool> {
        self.colored
    }

    pub fn set_colored(&mut self, colored: Option<bool>) {
        self.colored = colored;
    }

    /// View scoped to the wallet `name`.
    pub fn wallet(&self, name: &str) -> Result<WalletClient<'_>, ClientError> {
        WalletClient::new(self, name)
    }

    /// Canonical address string for `dest` under the client network.
    pub fn assert_address(&self, dest: &Destination) -> Result<String, ClientError> {
        dest.to_api_address(self.network)
    }

    fn colored_query(&self) -> QueryParams {
        QueryParams::new().colored(self.colored)
    }

    // ==========================================================================
    // Request Engine
    // ==========================================================================

    /// Execute one request against a relative resource path.
    ///
    /// A 404 is not an error: it yields `Ok(None)`. Other failures prefer a
    /// structured API error decoded from the body and fall back to a plain
    /// HTTP failure carrying the status code. A decoded error status code
    /// is reported as-is even when it differs from the HTTP status. A blank
    /// success body yields `Ok(None)` for JSON models.
    pub async fn send<T, B>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<Option<T>, ClientError>
    where
        T: Payload,
        B: Serialize + ?Sized,
    {
        let url = absolute_url(&self.base_address, path);
        let body = body.map(|b| self.codec.encode(b)).transpose()?;
        debug!(%method, %url, "api call");

        let response = self
            .transport
            .execute(HttpRequest {
                method: method.clone(),
                url,
                body,
            })
            .await?;

        if response.status == 404 {
            debug!(%method, path, "resource not found");
            return Ok(None);
        }

        if !response.is_success() {
            let text = String::from_utf8_lossy(&response.body);
            trace!(status = response.status, body = %text, "api error body");
            if !text.is_empty() {
                if let Some(error) = self.codec.decode_api_error(&text) {
                    return Err(ClientError::Api(error));
                }
            }
            return Err(ClientError::Http {
                status: response.status,
            });
        }

        self.codec.decode_response(response.body)
    }

    pub async fn get<T: Payload>(&self, path: &str) -> Result<Option<T>, ClientError> {
        self.send::<T, ()>(Method::GET, path, None).await
    }

    pub async fn post<T, B>(&self, path: &str, body: Option<&B>) -> Result<Option<T>, ClientError>
    where
        T: Payload,
        B: Serialize + ?Sized,
    {
        self.send(Method::POST, path, body).await
    }

    // ==========================================================================
    // Addresses & Chain
    // ==========================================================================

    /// Publish a transaction to the network.
    pub async fn broadcast(&self, transaction: &Transaction) -> Result<(), ClientError> {
        let hex = serialize_hex(transaction);
        self.post::<String, str>("transactions", Some(hex.as_str()))
            .await
            .map(|_| ())
    }

    pub async fn balance(
        &self,
        dest: &Destination,
        unspent_only: bool,
    ) -> Result<Option<BalanceModel>, ClientError> {
        let address = self.assert_address(dest)?;
        let path = ResourcePath::new("balances")
            .segment(&address)?
            .query(
                QueryParams::new()
                    .push("unspentOnly", unspent_only)
                    .colored(self.colored),
            )
            .build();
        self.get(&path).await
    }

    pub async fn balance_summary(
        &self,
        dest: &Destination,
    ) -> Result<Option<BalanceSummary>, ClientError> {
        let address = self.assert_address(dest)?;
        let path = ResourcePath::new("balances")
            .segment(&address)?
            .literal("summary")
            .query(self.colored_query())
            .build();
        self.get(&path).await
    }

    pub async fn transaction(
        &self,
        txid: &Txid,
    ) -> Result<Option<GetTransactionResponse>, ClientError> {
        let path = ResourcePath::new("transactions")
            .segment(&txid.to_string())?
            .build();
        self.get(&path).await
    }

    pub async fn block(
        &self,
        feature: &BlockFeature,
        header_only: bool,
    ) -> Result<Option<GetBlockResponse>, ClientError> {
        let path = ResourcePath::new("blocks")
            .segment(&feature.to_string())?
            .query(QueryParams::new().push("headerOnly", header_only))
            .build();
        self.get(&path).await
    }

    // ==========================================================================
    // Wallets
    // ==========================================================================

    pub async fn create_wallet(&self, wallet: &str) -> Result<Option<WalletModel>, ClientError> {
        let body = WalletModel {
            name: wallet.to_owned(),
        };
        self.post("wallets", Some(&body)).await
    }

    pub async fn create_wallet_if_not_exists(&self, wallet: &str) -> Result<bool, ClientError> {
        create_if_not_exists(self.create_wallet(wallet)).await
    }

    pub async fn wallet_info(&self, wallet: &str) -> Result<Option<WalletModel>, ClientError> {
        let path = ResourcePath::new("wallets").segment(wallet)?.build();
        self.get(&path).await
    }

    pub async fn wallet_balance(
        &self,
        wallet: &str,
        unspent_only: bool,
    ) -> Result<Option<BalanceModel>, ClientError> {
        let path = ResourcePath::new("wallets")
            .segment(wallet)?
            .literal("balance")
            .query(
                QueryParams::new()
                    .push("unspentOnly", unspent_only)
                    .colored(self.colored),
            )
            .build();
        self.get(&path).await
    }

    pub async fn wallet_balance_summary(
        &self,
        wallet: &str,
    ) -> Result<Option<BalanceSummary>, ClientError> {
        let path = ResourcePath::new("wallets")
            .segment(wallet)?
            .literal("summary")
            .query(self.colored_query())
            .build();
        self.get(&path).await
    }

    /// Registration body for `dest`, normalized under the client network.
    pub fn insert_address(
        &self,
        dest: &Destination,
        redeem_script: Option<&Script>,
        merge_past: bool,
    ) -> Result<InsertWalletAddress, ClientError> {
        Ok(InsertWalletAddress {
            address: self.assert_address(dest)?,
            redeem_script: redeem_script.map(Script::to_owned),
            merge_past,
        })
    }

    pub async fn create_address(
        &self,
        wallet: &str,
        address: &InsertWalletAddress,
    ) -> Result<Option<WalletAddress>, ClientError> {
        let path = ResourcePath::new("wallets")
            .segment(wallet)?
            .literal("addresses")
            .build();
        self.post(&path, Some(address)).await
    }

    pub async fn create_address_if_not_exists(
        &self,
        wallet: &str,
        address: &InsertWalletAddress,
    ) -> Result<bool, ClientError> {
        create_if_not_exists(self.create_address(wallet, address)).await
    }

    pub async fn addresses(&self, wallet: &str) -> Result<Option<Vec<WalletAddress>>, ClientError> {
        let path = ResourcePath::new("wallets")
            .segment(wallet)?
            .literal("addresses")
            .build();
        self.get(&path).await
    }

    // ==========================================================================
    // Keysets
    // ==========================================================================

    /// Keyset descriptor for raw extended keys, encoded for the client
    /// network.
    pub fn keyset(
        &self,
        name: &str,
        keys: &[Xpub],
        signature_count: u32,
        path: Option<DerivationPath>,
    ) -> HdKeySet {
        let mut ext_pub_keys = keys.to_vec();
        stamp_network(&mut ext_pub_keys, self.network);
        HdKeySet {
            name: name.to_owned(),
            ext_pub_keys,
            signature_count,
            path,
        }
    }

    pub async fn create_keyset(
        &self,
        wallet: &str,
        keyset: &HdKeySet,
    ) -> Result<Option<HdKeySet>, ClientError> {
        let mut keyset = keyset.clone();
        stamp_network(&mut keyset.ext_pub_keys, self.network);
        let path = ResourcePath::new("wallets")
            .segment(wallet)?
            .literal("keysets")
            .build();
        self.post(&path, Some(&keyset)).await
    }

    pub async fn create_keyset_if_not_exists(
        &self,
        wallet: &str,
        keyset: &HdKeySet,
    ) -> Result<bool, ClientError> {
        create_if_not_exists(self.create_keyset(wallet, keyset)).await
    }

    pub async fn keysets(&self, wallet: &str) -> Result<Option<Vec<KeySetData>>, ClientError> {
        let path = ResourcePath::new("wallets")
            .segment(wallet)?
            .literal("keysets")
            .build();
        self.get(&path).await
    }

    /// Derive the next unused key of a keyset.
    pub async fn generate_key(
        &self,
        wallet: &str,
        keyset: &str,
    ) -> Result<Option<HdKeyData>, ClientError> {
        let path = keyset_path(wallet, keyset)?.literal("keys").build();
        self.post::<_, ()>(&path, None).await
    }

    /// Delete a keyset. Returns `false` when it did not exist.
    pub async fn delete_keyset(&self, wallet: &str, keyset: &str) -> Result<bool, ClientError> {
        let path = keyset_path(wallet, keyset)?.build();
        let result = self
            .send::<String, ()>(Method::DELETE, &path, None)
            .await?;
        Ok(result.is_some())
    }
}

// ==============================================================================
// Idempotent Creation
// ==============================================================================

/// Run a create request, mapping a 409 API error to `Ok(false)`.
///
/// Any other failure propagates unchanged.
pub async fn create_if_not_exists<T, F>(create: F) -> Result<bool, ClientError>
where
    F: Future<Output = Result<T, ClientError>>,
{
    match create.await {
        Ok(_) => Ok(true),
        Err(err) if err.is_conflict() => {
            debug!(error = %err, "resource already exists");
            Ok(false)
        }
        Err(err) => Err(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::*;
    use bitcoin::NetworkKind;
    use serde_json::json;

    #[tokio::test]
    async fn balance_path_appends_colored_last() {
        let (mut client, mock) = mock_client(Network::Bitcoin);
        client.set_colored(Some(true));
        mock.respond_json(200, json!({"operations": []}));

        let dest = Destination::from(mainnet_address());
        let balance = client.balance(&dest, false).await.unwrap().unwrap();
        assert!(balance.operations.is_empty());
        assert_eq!(
            mock.last_url().unwrap(),
            format!("{BASE}balances/{MAINNET_ADDRESS}?unspentOnly=false&colored=true")
        );
    }

    #[tokio::test]
    async fn balance_summary_omits_query_when_colored_unset() {
        let (client, mock) = mock_client(Network::Bitcoin);
        let dest = Destination::from(mainnet_address());
        assert!(client.balance_summary(&dest).await.unwrap().is_none());
        assert_eq!(
            mock.last_url().unwrap(),
            format!("{BASE}balances/{MAINNET_ADDRESS}/summary")
        );
    }

    #[tokio::test]
    async fn colored_false_is_sent_explicitly() {
        let (mut client, mock) = mock_client(Network::Bitcoin);
        client.set_colored(Some(false));
        client.wallet_balance_summary("alice").await.unwrap();
        client.wallet_balance("alice", true).await.unwrap();
        let urls: Vec<_> = mock.requests().into_iter().map(|r| r.url).collect();
        assert_eq!(
            urls,
            vec![
                format!("{BASE}wallets/alice/summary?colored=false"),
                format!("{BASE}wallets/alice/balance?unspentOnly=true&colored=false"),
            ]
        );
    }

    #[tokio::test]
    async fn unresolvable_destination_sends_nothing() {
        let (client, mock) = mock_client(Network::Bitcoin);
        let dest = Destination::Script(op_return_script());

        let err = client.balance(&dest, false).await.expect_err("must fail fast");
        assert!(matches!(err, ClientError::InvalidArgument(_)));
        let err = client
            .wallet("w")
            .unwrap()
            .create_address_if_not_exists(&dest, None, true)
            .await
            .expect_err("must fail fast");
        assert!(matches!(err, ClientError::InvalidArgument(_)));
        assert_eq!(mock.call_count(), 0);
    }

    #[tokio::test]
    async fn path_injection_sends_nothing() {
        let (client, mock) = mock_client(Network::Bitcoin);
        let err = client.wallet_info("a/../b").await.expect_err("must reject");
        assert!(matches!(err, ClientError::InvalidArgument(_)));
        let err = client.delete_keyset("w", "k?x").await.expect_err("must reject");
        assert!(matches!(err, ClientError::InvalidArgument(_)));
        assert_eq!(mock.call_count(), 0);
    }

    #[tokio::test]
    async fn not_found_is_none() {
        let (client, mock) = mock_client(Network::Bitcoin);
        mock.respond(404, "");
        assert!(client.wallet_info("ghost").await.unwrap().is_none());
        mock.respond(404, r#"{"statusCode":404,"message":"not found"}"#);
        assert!(client.transaction(&txid_from_byte(7)).await.unwrap().is_none());
        mock.respond(404, "");
        assert!(client.block(&BlockFeature::Last { offset: 1 }, true).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn structured_error_becomes_api_error() {
        let (client, mock) = mock_client(Network::Bitcoin);
        mock.respond_json(400, json!({"statusCode": 400, "message": "bad wallet"}));
        let err = client.wallet_info("w").await.expect_err("400 must fail");
        match err {
            ClientError::Api(api) => {
                assert_eq!(api.status_code, 400);
                assert_eq!(api.message, "bad wallet");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn parsed_status_wins_over_http_status() {
        let (client, mock) = mock_client(Network::Bitcoin);
        mock.respond_json(500, json!({"statusCode": 409, "message": "exists"}));
        let err = client.create_wallet("w").await.expect_err("500 must fail");
        assert_eq!(err.status_code(), Some(409));
        assert!(err.is_conflict());
    }

    #[tokio::test]
    async fn malformed_error_body_falls_back_to_http_failure() {
        let (client, mock) = mock_client(Network::Bitcoin);
        mock.respond(409, "<html>conflict</html>");
        let err = client.create_wallet("w").await.expect_err("409 must fail");
        assert!(matches!(err, ClientError::Http { status: 409 }));

        mock.respond(502, "");
        let err = client.wallet_info("w").await.expect_err("502 must fail");
        assert!(matches!(err, ClientError::Http { status: 502 }));

        mock.respond_json(500, json!({"statusCode": 0, "message": "zero"}));
        let err = client.wallet_info("w").await.expect_err("500 must fail");
        assert!(matches!(err, ClientError::Http { status: 500 }));
    }

    #[tokio::test]
    async fn create_if_not_exists_is_idempotent() {
        let (client, mock) = mock_client(Network::Bitcoin);
        mock.respond_json(200, json!({"name": "alice"}))
            .respond_json(409, json!({"statusCode": 409, "message": "exists"}));

        assert!(client.create_wallet_if_not_exists("alice").await.unwrap());
        assert!(!client.create_wallet_if_not_exists("alice").await.unwrap());
        assert_eq!(mock.call_count(), 2);

        let request = &mock.requests()[0];
        assert_eq!(request.method, Method::POST);
        assert_eq!(request.url, format!("{BASE}wallets"));
        assert_eq!(request.body.as_deref(), Some(r#"{"name":"alice"}"#));
    }

    #[tokio::test]
    async fn blank_success_body_counts_as_created() {
        let (client, mock) = mock_client(Network::Bitcoin);
        mock.respond(204, "")
            .respond(201, "")
            .respond(200, " \r\n")
            .respond(200, "");

        assert!(client.create_wallet_if_not_exists("alice").await.unwrap());
        assert!(client.create_wallet("bob").await.unwrap().is_none());
        assert!(client.generate_key("alice", "main").await.unwrap().is_none());
        assert!(client.delete_keyset("alice", "main").await.unwrap());
        assert_eq!(mock.call_count(), 4);
    }

    #[tokio::test]
    async fn create_if_not_exists_propagates_other_errors() {
        let (client, mock) = mock_client(Network::Bitcoin);
        mock.respond_json(400, json!({"statusCode": 400, "message": "bad"}));
        let err = client
            .create_wallet_if_not_exists("alice")
            .await
            .expect_err("400 is not a conflict");
        assert_eq!(err.status_code(), Some(400));

        mock.respond(409, "not json");
        let err = client
            .create_wallet_if_not_exists("alice")
            .await
            .expect_err("untyped 409 is not a conflict");
        assert!(matches!(err, ClientError::Http { status: 409 }));
    }

    #[tokio::test]
    async fn broadcast_posts_hex_as_json_string() {
        let (client, mock) = mock_client(Network::Bitcoin);
        mock.respond(200, "");
        let tx = sample_transaction();
        client.broadcast(&tx).await.unwrap();

        let request = &mock.requests()[0];
        assert_eq!(request.url, format!("{BASE}transactions"));
        assert_eq!(request.body, Some(format!("\"{}\"", serialize_hex(&tx))));
    }

    #[tokio::test]
    async fn block_path_escapes_feature() {
        let (client, mock) = mock_client(Network::Bitcoin);
        client.block(&BlockFeature::Last { offset: 2 }, false).await.unwrap();
        client.block(&BlockFeature::Last { offset: -1 }, true).await.unwrap();
        let urls: Vec<_> = mock.requests().into_iter().map(|r| r.url).collect();
        assert_eq!(
            urls,
            vec![
                format!("{BASE}blocks/last%2B2?headerOnly=false"),
                format!("{BASE}blocks/last-1?headerOnly=true"),
            ]
        );
    }

    #[tokio::test]
    async fn create_keyset_stamps_client_network() {
        let (client, mock) = mock_client(Network::Testnet);
        let keyset = sample_keyset("main", NetworkKind::Main);
        let echoed = client.keyset("main", &keyset.ext_pub_keys, 2, keyset.path.clone());
        mock.respond(200, serde_json::to_string(&echoed).unwrap());

        let created = client.create_keyset("w", &keyset).await.unwrap();
        assert_eq!(created, Some(echoed));

        let body = mock.requests()[0].body.clone().unwrap();
        assert!(body.contains("tpub"));
        assert!(!body.contains("xpub"));
    }

    #[tokio::test]
    async fn delete_keyset_reports_existence() {
        let (client, mock) = mock_client(Network::Bitcoin);
        mock.respond(200, "").respond(404, "");
        assert!(client.delete_keyset("w", "main").await.unwrap());
        assert!(!client.delete_keyset("w", "main").await.unwrap());

        let request = &mock.requests()[0];
        assert_eq!(request.method, Method::DELETE);
        assert_eq!(request.url, format!("{BASE}wallets/w/keysets/main"));
    }

    #[test]
    fn new_rejects_unsupported_network() {
        let err = NinjaClient::new(Network::Signet).expect_err("signet has no public server");
        assert!(matches!(err, ClientError::NotSupported(Network::Signet)));
    }
}
