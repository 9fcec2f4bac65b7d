//! Recipient address formats per network
//!
//! Only the textual shape is checked here. Checksums, and whether the account
//! exists, are the ledger's business.

use crate::token::{Network, TokenDescriptor, TokenStandard};
use signet_errors::{Error, Result};

/// Hex length of a native ledger account identifier (32 bytes)
pub const ACCOUNT_ID_HEX_LEN: usize = 64;
/// Hex length of an ICRC-1 subaccount (32 bytes)
pub const SUBACCOUNT_HEX_LEN: usize = 64;
/// Hex length of an Ethereum address without the `0x` prefix (20 bytes)
pub const ETH_ADDRESS_HEX_LEN: usize = 40;

const PRINCIPAL_ALPHABET: &str = "abcdefghijklmnopqrstuvwxyz234567";
const PRINCIPAL_GROUP_MAX: usize = 5;

/// Check that `recipient` is well-formed for the token's network and standard
pub fn validate_recipient(token: &TokenDescriptor, recipient: &str) -> Result<()> {
    let ok = match (token.network, token.standard) {
        (Network::Icp, TokenStandard::Native) => is_hex_of_len(recipient, ACCOUNT_ID_HEX_LEN),
        (Network::Icp, _) => is_icrc_account(recipient),
        (Network::Eth, _) => recipient
            .strip_prefix("0x")
            .is_some_and(|hex| is_hex_of_len(hex, ETH_ADDRESS_HEX_LEN)),
    };

    if ok {
        Ok(())
    } else {
        Err(Error::InvalidRecipient(format!(
            "`{recipient}` is not a valid {} {} recipient",
            token.network, token.standard
        )))
    }
}

/// Textual principal: `-`-separated groups of lowercase base32, e.g. `aaaaa-aa`
pub fn is_principal(text: &str) -> bool {
    let groups: Vec<&str> = text.split('-').collect();
    groups.len() >= 2
        && groups.iter().all(|g| {
            !g.is_empty()
                && g.len() <= PRINCIPAL_GROUP_MAX
                && g.chars().all(|c| PRINCIPAL_ALPHABET.contains(c))
        })
}

/// `<principal>` or `<principal>.<subaccount hex>`
fn is_icrc_account(text: &str) -> bool {
    match text.split_once('.') {
        Some((owner, subaccount)) => {
            is_principal(owner) && is_hex_of_len(subaccount, SUBACCOUNT_HEX_LEN)
        }
        None => is_principal(text),
    }
}

fn is_hex_of_len(text: &str, len: usize) -> bool {
    text.len() == len && hex::decode(text).is_ok()
}
