//! Token identifiers and their structured descriptors
//!
//! A token identifier is a `:`-delimited path:
//!
//! - `icp:native` for the vault's native ledger token
//! - `icp:icrc1:<ledger principal>` for ICRC-1 tokens
//! - `eth:erc20:<contract address>` for ERC-20 tokens

use serde::{Deserialize, Serialize};
use signet_errors::{Error, Result};
use std::fmt;
use std::str::FromStr;

/// Identifier of the vault's native ledger token
pub const NATIVE_TOKEN: &str = "icp:native";

const DELIMITER: char = ':';

/// Ledger network a token lives on
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Network {
    #[serde(rename = "ICP")]
    Icp,
    #[serde(rename = "ETH")]
    Eth,
}

impl Network {
    /// Identifier prefix used in token paths
    pub fn as_str(&self) -> &'static str {
        match self {
            Network::Icp => "icp",
            Network::Eth => "eth",
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Network {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "icp" => Ok(Network::Icp),
            "eth" => Ok(Network::Eth),
            other => Err(Error::MalformedTokenId(format!(
                "unsupported network `{other}`"
            ))),
        }
    }
}

/// Token standard within a network
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TokenStandard {
    Native,
    Icrc1,
    Erc20,
}

impl TokenStandard {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenStandard::Native => "native",
            TokenStandard::Icrc1 => "icrc1",
            TokenStandard::Erc20 => "erc20",
        }
    }

    fn supported_on(&self, network: Network) -> bool {
        matches!(
            (self, network),
            (TokenStandard::Native, _)
                | (TokenStandard::Icrc1, Network::Icp)
                | (TokenStandard::Erc20, Network::Eth)
        )
    }
}

impl fmt::Display for TokenStandard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TokenStandard {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "native" => Ok(TokenStandard::Native),
            "icrc1" => Ok(TokenStandard::Icrc1),
            "erc20" => Ok(TokenStandard::Erc20),
            other => Err(Error::MalformedTokenId(format!(
                "unsupported token standard `{other}`"
            ))),
        }
    }
}

/// Raw token identifier as stored on intents and returned by the service
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenId(String);

impl TokenId {
    pub fn new<S: Into<String>>(id: S) -> Self {
        Self(id.into())
    }

    /// The native ledger token
    pub fn native() -> Self {
        Self(NATIVE_TOKEN.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Parse into a structured descriptor
    pub fn descriptor(&self) -> Result<TokenDescriptor> {
        TokenDescriptor::parse(&self.0)
    }
}

impl fmt::Display for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TokenId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<&TokenDescriptor> for TokenId {
    fn from(descriptor: &TokenDescriptor) -> Self {
        Self(descriptor.to_string())
    }
}

/// Structured form of a token identifier
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TokenDescriptor {
    pub network: Network,
    pub standard: TokenStandard,
    /// Ledger or contract address; `None` only for native tokens
    pub address: Option<String>,
}

impl TokenDescriptor {
    /// Split a token identifier into network, standard and address.
    ///
    /// Never returns a partially populated descriptor: any missing, empty or
    /// surplus component is a [`Error::MalformedTokenId`].
    pub fn parse(token_id: &str) -> Result<Self> {
        let malformed = |why: &str| Error::MalformedTokenId(format!("`{token_id}`: {why}"));

        if token_id.is_empty() {
            return Err(malformed("empty identifier"));
        }

        let parts: Vec<&str> = token_id.split(DELIMITER).collect();
        if parts.iter().any(|p| p.is_empty()) {
            return Err(malformed("empty component"));
        }

        let (network, standard, address) = match parts.as_slice() {
            [network, standard] => (
                Network::from_str(network)?,
                TokenStandard::from_str(standard)?,
                None,
            ),
            [network, standard, address] => (
                Network::from_str(network)?,
                TokenStandard::from_str(standard)?,
                Some(address.to_string()),
            ),
            _ => return Err(malformed("expected `<network>:<standard>[:<address>]`")),
        };

        match (standard, &address) {
            (TokenStandard::Native, Some(_)) => {
                return Err(malformed("native tokens carry no address"))
            }
            (TokenStandard::Icrc1 | TokenStandard::Erc20, None) => {
                return Err(malformed("missing token address"))
            }
            _ => {}
        }

        if !standard.supported_on(network) {
            return Err(malformed("standard not available on network"));
        }

        Ok(Self {
            network,
            standard,
            address,
        })
    }

    /// Descriptor of the native ledger token
    pub fn native() -> Self {
        Self {
            network: Network::Icp,
            standard: TokenStandard::Native,
            address: None,
        }
    }

    pub fn is_native(&self) -> bool {
        self.standard == TokenStandard::Native
    }

    /// Balance lookups for non-native tokens go through the vault's
    /// per-token subaccount
    pub fn needs_subaccount(&self) -> bool {
        !self.is_native()
    }
}

impl fmt::Display for TokenDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{DELIMITER}{}", self.network, self.standard)?;
        if let Some(address) = &self.address {
            write!(f, "{DELIMITER}{address}")?;
        }
        Ok(())
    }
}

impl FromStr for TokenDescriptor {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_native() {
        let d = TokenDescriptor::parse(NATIVE_TOKEN).unwrap();
        assert_eq!(d, TokenDescriptor::native());
        assert!(d.is_native());
        assert!(!d.needs_subaccount());
        assert_eq!(d.to_string(), NATIVE_TOKEN);
    }

    #[test]
    fn test_parse_icrc1() {
        let d: TokenDescriptor = "icp:icrc1:mxzaz-hqaaa-aaaar-qaada-cai".parse().unwrap();
        assert_eq!(d.network, Network::Icp);
        assert_eq!(d.standard, TokenStandard::Icrc1);
        assert_eq!(d.address.as_deref(), Some("mxzaz-hqaaa-aaaar-qaada-cai"));
        assert!(d.needs_subaccount());
        assert_eq!(d.to_string(), "icp:icrc1:mxzaz-hqaaa-aaaar-qaada-cai");
    }

    #[test]
    fn test_parse_erc20() {
        let d = TokenDescriptor::parse("eth:erc20:0xdac17f958d2ee523a2206206994597c13d831ec7")
            .unwrap();
        assert_eq!(d.network, Network::Eth);
        assert_eq!(d.standard, TokenStandard::Erc20);
    }

    #[test]
    fn test_malformed_ids() {
        for id in [
            "",
            "icp",
            "icp:",
            ":native",
            "icp::abc",
            "icp:native:abc",
            "icp:icrc1",
            "sol:native",
            "icp:erc20:0xabc",
            "eth:icrc1:aaaaa-aa",
            "icp:icrc1:a:b",
            "ICP:native",
        ] {
            let err = TokenDescriptor::parse(id).unwrap_err();
            assert!(
                matches!(err, Error::MalformedTokenId(_)),
                "{id:?} gave {err:?}"
            );
        }
    }

    #[test]
    fn test_token_id_wire_form() {
        let id = TokenId::native();
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"icp:native\"");
        assert_eq!(id.descriptor().unwrap(), TokenDescriptor::native());
        assert_eq!(
            serde_json::to_string(&Network::Icp).unwrap(),
            "\"ICP\"".to_string()
        );
    }

    mod prop {
        use crate::token::{TokenDescriptor, TokenId, NATIVE_TOKEN};
        use proptest::prelude::*;

        fn arb_token_id() -> impl Strategy<Value = String> {
            prop_oneof![
                Just(NATIVE_TOKEN.to_string()),
                Just("eth:native".to_string()),
                "[a-z0-9]{5}(-[a-z0-9]{5}){1,4}".prop_map(|id| format!("icp:icrc1:{id}")),
                "0x[0-9a-f]{40}".prop_map(|addr| format!("eth:erc20:{addr}")),
            ]
        }

        proptest! {
            #[test]
            fn prop_valid_ids_round_trip(id in arb_token_id()) {
                let descriptor = TokenDescriptor::parse(&id).unwrap();
                prop_assert_eq!(descriptor.to_string(), id.clone());
                prop_assert_eq!(TokenId::from(&descriptor), TokenId::new(id));
                prop_assert_eq!(descriptor.is_native(), descriptor.address.is_none());
            }

            #[test]
            fn prop_parsed_text_displays_unchanged(id in "[a-z0-9:]{0,24}") {
                if let Ok(descriptor) = TokenDescriptor::parse(&id) {
                    prop_assert_eq!(descriptor.to_string(), id);
                }
            }
        }
    }
}
