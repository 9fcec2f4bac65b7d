//! Turning user input into transaction intents
//!
//! Everything here is local: a malformed token, amount or recipient is
//! rejected before the vault service is contacted.

use signet_errors::{Error, Result};
use signet_types::{
    validate_recipient, TokenDescriptor, TokenId, TransactionIntent, TransactionType,
};

/// Validated amount, token and recipient still waiting for a sender
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IntentDraft {
    pub amount: u64,
    pub token: TokenDescriptor,
    pub recipient: String,
}

impl IntentDraft {
    /// Validate user input for a simple send
    pub fn parse(amount_text: &str, token_id: &str, recipient: &str) -> Result<Self> {
        let token = TokenDescriptor::parse(token_id)?;
        let amount = parse_amount(amount_text)?;
        let recipient = recipient.trim();
        validate_recipient(&token, recipient)?;

        Ok(Self {
            amount,
            token,
            recipient: recipient.to_string(),
        })
    }

    /// Finish the intent with the vault account the funds leave from
    pub fn with_sender(self, sender: &str) -> Result<TransactionIntent> {
        let sender = sender.trim();
        if sender.is_empty() {
            return Err(Error::InvalidSender("sender account is empty".to_string()));
        }

        Ok(TransactionIntent {
            amount: self.amount,
            token: TokenId::from(&self.token),
            recipient: self.recipient,
            transaction_type: TransactionType::Transfer,
            sender: sender.to_string(),
            network: self.token.network,
        })
    }
}

/// Builds canonical transfer intents
pub struct IntentBuilder;

impl IntentBuilder {
    pub fn build(
        amount_text: &str,
        token_id: &str,
        recipient: &str,
        sender: &str,
    ) -> Result<TransactionIntent> {
        IntentDraft::parse(amount_text, token_id, recipient)?.with_sender(sender)
    }
}

/// Non-negative integer in the token's base unit; no sign, point or exponent
fn parse_amount(text: &str) -> Result<u64> {
    let text = text.trim();
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Error::InvalidAmount(format!(
            "`{text}` is not a whole number of base units"
        )));
    }
    text.parse::<u64>()
        .map_err(|_| Error::InvalidAmount(format!("`{text}` is too large")))
}
