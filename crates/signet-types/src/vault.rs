//! Vaults and signer identities

use crate::address::is_principal;
use serde::{Deserialize, Serialize};
use signet_errors::{Error, Result};
use std::fmt;
use std::str::FromStr;

/// Textual principal of a signer or caller identity
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SignerId(String);

impl SignerId {
    /// Parse a signer identity, rejecting anything that is not a principal
    pub fn parse(text: &str) -> Result<Self> {
        let text = text.trim();
        if is_principal(text) {
            Ok(Self(text.to_string()))
        } else {
            Err(Error::InvalidSigner(text.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SignerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for SignerId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// A multisig account: who may sign and how many approvals it takes
///
/// `1 <= threshold <= signers.len()` holds for every value of this type;
/// the only way to change threshold or signers is through the checked
/// `with_*` methods.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Vault {
    address: String,
    name: String,
    threshold: u32,
    signers: Vec<SignerId>,
}

impl Vault {
    pub fn new(
        address: impl Into<String>,
        name: impl Into<String>,
        threshold: u32,
        signers: Vec<SignerId>,
    ) -> Result<Self> {
        for (idx, signer) in signers.iter().enumerate() {
            if signers[..idx].contains(signer) {
                return Err(Error::DuplicateSigner(signer.to_string()));
            }
        }
        check_threshold(threshold, signers.len())?;

        Ok(Self {
            address: address.into(),
            name: name.into(),
            threshold,
            signers,
        })
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    pub fn signers(&self) -> &[SignerId] {
        &self.signers
    }

    pub fn is_signer(&self, id: &SignerId) -> bool {
        self.signers.contains(id)
    }

    /// Copy of this vault with a different threshold
    pub fn with_threshold(&self, threshold: u32) -> Result<Self> {
        check_threshold(threshold, self.signers.len())?;
        Ok(Self {
            threshold,
            ..self.clone()
        })
    }

    /// Copy of this vault with one more signer appended
    pub fn with_signer(&self, signer: SignerId) -> Result<Self> {
        if self.is_signer(&signer) {
            return Err(Error::DuplicateSigner(signer.to_string()));
        }
        let mut signers = self.signers.clone();
        signers.push(signer);
        Ok(Self {
            signers,
            ..self.clone()
        })
    }
}

/// `1 <= threshold <= signers`
fn check_threshold(threshold: u32, signers: usize) -> Result<()> {
    if threshold == 0 || threshold as usize > signers {
        return Err(Error::InvalidThreshold { threshold, signers });
    }
    Ok(())
}
