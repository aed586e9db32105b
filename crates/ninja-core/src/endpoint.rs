//! Base address selection and validation.

use bitcoin::Network;
use url::Url;

use crate::error::ClientError;

pub const MAINNET_BASE_ADDRESS: &str = "http://api.qbit.ninja/";
pub const TESTNET_BASE_ADDRESS: &str = "http://tapi.qbit.ninja/";

/// Public QBit Ninja server for `network`.
pub fn default_base_address(network: Network) -> Result<Url, ClientError> {
    let raw = match network {
        Network::Bitcoin => MAINNET_BASE_ADDRESS,
        Network::Testnet => TESTNET_BASE_ADDRESS,
        other => return Err(ClientError::NotSupported(other)),
    };
    parse_base_address(raw)
}

/// Parse a caller supplied base address. Only absolute HTTP(S) URLs are
/// accepted; the path is normalized to end with a single `/` so relative
/// resource paths can be appended directly.
pub fn parse_base_address(base: &str) -> Result<Url, ClientError> {
    let mut parsed = Url::parse(base).map_err(|e| {
        ClientError::InvalidArgument(format!(
            "invalid base address `{base}`: expected HTTP(S) URL ({e})"
        ))
    })?;
    match parsed.scheme() {
        "http" | "https" => {}
        other => {
            return Err(ClientError::InvalidArgument(format!(
                "unsupported base address scheme `{other}`; expected http or https"
            )))
        }
    }
    if !parsed.path().ends_with('/') {
        let path = format!("{}/", parsed.path());
        parsed.set_path(&path);
    }
    Ok(parsed)
}

/// Join the base address and a relative resource path with exactly one `/`.
pub(crate) fn absolute_url(base: &Url, relative: &str) -> String {
    let base = base.as_str();
    let mut uri = String::with_capacity(base.len() + relative.len());
    uri.push_str(base.trim_end_matches('/'));
    uri.push('/');
    uri.push_str(relative.trim_start_matches('/'));
    uri
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_base_address_per_network() {
        assert_eq!(
            default_base_address(Network::Bitcoin).unwrap().as_str(),
            MAINNET_BASE_ADDRESS
        );
        assert_eq!(
            default_base_address(Network::Testnet).unwrap().as_str(),
            TESTNET_BASE_ADDRESS
        );
    }

    #[test]
    fn default_base_address_rejects_regtest() {
        let err = default_base_address(Network::Regtest).expect_err("regtest has no public server");
        assert!(matches!(err, ClientError::NotSupported(Network::Regtest)));
    }

    #[test]
    fn parse_base_address_invalid_scheme() {
        let err = parse_base_address("ftp://example.com").expect_err("must reject ftp");
        assert!(err.to_string().contains("unsupported base address scheme"));
    }

    #[test]
    fn parse_base_address_rejects_relative() {
        let err = parse_base_address("api.qbit.ninja").expect_err("must reject relative");
        assert!(matches!(err, ClientError::InvalidArgument(_)));
    }

    #[test]
    fn parse_base_address_appends_slash() {
        let url = parse_base_address("http://localhost:8080/api").unwrap();
        assert_eq!(url.as_str(), "http://localhost:8080/api/");
    }

    #[test]
    fn absolute_url_uses_single_separator() {
        let base = parse_base_address("http://localhost:8080/api/").unwrap();
        assert_eq!(
            absolute_url(&base, "/wallets/w1"),
            "http://localhost:8080/api/wallets/w1"
        );
        assert_eq!(
            absolute_url(&base, "wallets"),
            "http://localhost:8080/api/wallets"
        );
    }
}
