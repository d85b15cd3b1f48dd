//! Channel records and the messages derived from them.
//!
//! - [`Channel`] is the sender's full bookkeeping record.
//! - [`ChannelState`] is the signed wire record sent to the counterparty.
//! - [`SettlementRequest`] is what gets submitted on-chain when the channel
//!   terminates.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use stateset_crypto::{DomainHasher, Signature, Signer, Verifier};
use stateset_types::{Address, Amount, ChannelId, Digest};

use crate::error::Result;

/// Lifecycle status of a channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChannelStatus {
    /// Accepting payments.
    Open,
    /// Closed cooperatively; final amount handed off for settlement.
    Closed,
    /// Terminated by unilateral withdrawal after expiry.
    Expired,
}

impl ChannelStatus {
    pub fn is_open(self) -> bool {
        matches!(self, Self::Open)
    }

    /// `true` once the channel has been closed or withdrawn.
    pub fn is_terminated(self) -> bool {
        !self.is_open()
    }
}

impl fmt::Display for ChannelStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open => write!(f, "open"),
            Self::Closed => write!(f, "closed"),
            Self::Expired => write!(f, "expired"),
        }
    }
}

/// One off-chain payment relationship, as tracked by the sender.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    pub channel_id: ChannelId,
    pub sender: Address,
    pub counterparty: Address,
    /// Amount locked on-chain at open time. `total_sent` never exceeds it.
    pub deposit: Amount,
    /// Cumulative amount transferred. Never decreases.
    pub total_sent: Amount,
    /// Number of successful updates.
    pub nonce: u64,
    /// Tag over `(channel_id, total_sent, nonce)`; `None` before the first payment.
    pub last_signature: Option<Signature>,
    pub opened_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub status: ChannelStatus,
}

impl Channel {
    /// Amount that can still be sent before the deposit is exhausted.
    pub fn remaining_capacity(&self) -> Amount {
        self.deposit.saturating_sub(self.total_sent)
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Snapshot of the current signed state.
    pub fn state(&self) -> ChannelState {
        ChannelState {
            channel_id: self.channel_id.clone(),
            total_sent: self.total_sent,
            nonce: self.nonce,
            signature: self.last_signature.clone(),
        }
    }

    /// Build the settlement request for a terminated channel.
    pub fn settlement_request(&self, kind: SettlementKind) -> SettlementRequest {
        SettlementRequest {
            channel_id: self.channel_id.clone(),
            final_amount: self.total_sent,
            nonce: self.nonce,
            signature: self.last_signature.clone(),
            kind,
        }
    }
}

/// Signed channel state as transmitted to the counterparty.
///
/// JSON form:
/// `{"channelId": "...", "totalSent": "3500000", "nonce": 4, "signature": "<hex>"}`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelState {
    pub channel_id: ChannelId,
    pub total_sent: Amount,
    pub nonce: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<Signature>,
}

impl ChannelState {
    /// Check this state's signature against the sender's verifier.
    ///
    /// A state without a signature (nonce 0) never verifies.
    pub fn verify(&self, verifier: &dyn Verifier) -> Result<()> {
        let signature = self
            .signature
            .as_ref()
            .ok_or(stateset_crypto::SignatureError::InvalidSignature)?;
        let digest = state_digest(&self.channel_id, self.total_sent, self.nonce);
        verifier.verify(digest.as_bytes(), signature)?;
        Ok(())
    }

    pub fn to_json(&self) -> std::result::Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> std::result::Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// How a channel came to be settled.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SettlementKind {
    /// Sender closed the channel.
    Cooperative,
    /// Sender withdrew unilaterally after the channel expired.
    Expiry,
    /// Recipient submitted the highest signed state it holds.
    Claim,
}

/// Final channel amount handed to the on-chain settlement layer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettlementRequest {
    pub channel_id: ChannelId,
    pub final_amount: Amount,
    pub nonce: u64,
    /// The channel's last signature. `None` when no payment was ever made.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<Signature>,
    pub kind: SettlementKind,
}

/// Digest that binds a channel id, cumulative total and nonce.
///
/// Fields are length-prefixed and the integers big-endian, so changing any
/// one of them changes the digest.
pub fn state_digest(channel_id: &ChannelId, total_sent: Amount, nonce: u64) -> Digest {
    let total = total_sent.base_units().to_be_bytes();
    let nonce = nonce.to_be_bytes();
    DomainHasher::CHANNEL_STATE.hash_parts(&[channel_id.as_bytes(), &total[..], &nonce[..]])
}

/// Sign the digest of `(channel_id, total_sent, nonce)`.
pub fn sign_state(
    signer: &dyn Signer,
    channel_id: &ChannelId,
    total_sent: Amount,
    nonce: u64,
) -> Signature {
    signer.sign(state_digest(channel_id, total_sent, nonce).as_bytes())
}
