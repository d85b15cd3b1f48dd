//! The on-chain settlement boundary.
//!
//! [`Settlement`] is the interface to the transaction layer of the Stateset
//! chain: it locks deposits when channels open and pays out final amounts
//! when they close. [`LocalSettlement`] is an in-process stand-in used for
//! tests, demos and simulations; it applies the checks the chain would.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use stateset_crypto::{DomainHasher, Verifier};
use stateset_types::{Address, Amount, ChannelId, Digest};
use tracing::{info, warn};

use crate::channel::{ChannelState, SettlementKind, SettlementRequest};
use crate::clock::{Clock, SystemClock};
use crate::error::SettlementError;

/// Proof that a settlement was applied.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettlementReceipt {
    pub channel_id: ChannelId,
    pub tx_hash: Digest,
    /// Paid to the counterparty.
    pub paid: Amount,
    /// Returned to the sender.
    pub refunded: Amount,
    pub nonce: u64,
    pub kind: SettlementKind,
    pub settled_at: DateTime<Utc>,
}

/// Transaction layer that locks deposits and settles final amounts.
#[async_trait]
pub trait Settlement: Send + Sync {
    /// Lock `deposit` from `sender` for a channel towards `counterparty`.
    /// Returns the channel id assigned by the chain.
    async fn submit_open(
        &self,
        sender: &Address,
        counterparty: &Address,
        deposit: Amount,
        expires_at: DateTime<Utc>,
    ) -> Result<ChannelId, SettlementError>;

    /// Settle a terminated channel.
    async fn submit_close(
        &self,
        request: &SettlementRequest,
    ) -> Result<SettlementReceipt, SettlementError>;
}

#[async_trait]
impl<T: Settlement + ?Sized> Settlement for Arc<T> {
    async fn submit_open(
        &self,
        sender: &Address,
        counterparty: &Address,
        deposit: Amount,
        expires_at: DateTime<Utc>,
    ) -> Result<ChannelId, SettlementError> {
        (**self)
            .submit_open(sender, counterparty, deposit, expires_at)
            .await
    }

    async fn submit_close(
        &self,
        request: &SettlementRequest,
    ) -> Result<SettlementReceipt, SettlementError> {
        (**self).submit_close(request).await
    }
}

struct LockedChannel {
    sender: Address,
    deposit: Amount,
    expires_at: DateTime<Utc>,
    settled: Option<SettlementReceipt>,
}

/// In-process settlement backend.
///
/// Senders must be registered with their verifying key so closing
/// signatures can be checked.
pub struct LocalSettlement {
    accounts: Mutex<HashMap<Address, Arc<dyn Verifier>>>,
    channels: Mutex<HashMap<ChannelId, LockedChannel>>,
    clock: Arc<dyn Clock>,
    available: AtomicBool,
    tx_counter: AtomicU64,
}

impl Default for LocalSettlement {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalSettlement {
    pub fn new() -> Self {
        Self {
            accounts: Mutex::new(HashMap::new()),
            channels: Mutex::new(HashMap::new()),
            clock: Arc::new(SystemClock),
            available: AtomicBool::new(true),
            tx_counter: AtomicU64::new(0),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Make `address` known together with the key that signs its states.
    pub fn register_account(&self, address: Address, verifier: Arc<dyn Verifier>) {
        self.accounts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(address, verifier);
    }

    /// Simulate the node going offline (`false`) or coming back (`true`).
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// The receipt of a settled channel, if any.
    pub fn receipt(&self, channel_id: &ChannelId) -> Option<SettlementReceipt> {
        self.channels
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(channel_id)
            .and_then(|c| c.settled.clone())
    }

    fn ensure_available(&self) -> Result<(), SettlementError> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(SettlementError::Unavailable("local settlement offline".into()))
        }
    }

    fn verifier_for(&self, address: &Address) -> Result<Arc<dyn Verifier>, SettlementError> {
        self.accounts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(address)
            .cloned()
            .ok_or_else(|| SettlementError::Rejected(format!("unknown account {address}")))
    }

    fn tx_hash(&self, request: &SettlementRequest) -> Digest {
        let counter = self.tx_counter.fetch_add(1, Ordering::SeqCst).to_be_bytes();
        let amount = request.final_amount.base_units().to_be_bytes();
        let nonce = request.nonce.to_be_bytes();
        DomainHasher::SETTLEMENT_TX.hash_parts(&[
            request.channel_id.as_bytes(),
            &amount[..],
            &nonce[..],
            &counter[..],
        ])
    }
}

#[async_trait]
impl Settlement for LocalSettlement {
    async fn submit_open(
        &self,
        sender: &Address,
        counterparty: &Address,
        deposit: Amount,
        expires_at: DateTime<Utc>,
    ) -> Result<ChannelId, SettlementError> {
        self.ensure_available()?;
        self.verifier_for(sender)?;
        if deposit.is_zero() {
            return Err(SettlementError::Rejected("deposit must be positive".into()));
        }
        if expires_at <= self.clock.now() {
            return Err(SettlementError::Rejected("expiry must be in the future".into()));
        }

        let channel_id = ChannelId::generate();
        self.channels
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(
                channel_id.clone(),
                LockedChannel {
                    sender: sender.clone(),
                    deposit,
                    expires_at,
                    settled: None,
                },
            );
        info!(
            channel_id = %channel_id,
            sender = %sender,
            counterparty = %counterparty,
            deposit = %deposit,
            "deposit locked"
        );
        Ok(channel_id)
    }

    async fn submit_close(
        &self,
        request: &SettlementRequest,
    ) -> Result<SettlementReceipt, SettlementError> {
        self.ensure_available()?;
        let (sender, deposit, expires_at) = {
            let channels = self.channels.lock().unwrap_or_else(|e| e.into_inner());
            let channel = channels
                .get(&request.channel_id)
                .ok_or_else(|| SettlementError::UnknownChannel(request.channel_id.clone()))?;
            if channel.settled.is_some() {
                return Err(SettlementError::AlreadySettled(request.channel_id.clone()));
            }
            (channel.sender.clone(), channel.deposit, channel.expires_at)
        };

        if request.final_amount > deposit {
            return Err(SettlementError::AmountExceedsDeposit {
                amount: request.final_amount,
                deposit,
            });
        }
        let now = self.clock.now();
        if request.kind == SettlementKind::Expiry && now < expires_at {
            return Err(SettlementError::Rejected(format!(
                "channel does not expire until {expires_at}"
            )));
        }
        if !request.final_amount.is_zero() {
            let state = ChannelState {
                channel_id: request.channel_id.clone(),
                total_sent: request.final_amount,
                nonce: request.nonce,
                signature: request.signature.clone(),
            };
            let verifier = self.verifier_for(&sender)?;
            if let Err(e) = state.verify(verifier.as_ref()) {
                warn!(channel_id = %request.channel_id, error = %e, "settlement signature rejected");
                return Err(SettlementError::InvalidSignature(e.to_string()));
            }
        }

        let receipt = SettlementReceipt {
            channel_id: request.channel_id.clone(),
            tx_hash: self.tx_hash(request),
            paid: request.final_amount,
            refunded: deposit.saturating_sub(request.final_amount),
            nonce: request.nonce,
            kind: request.kind,
            settled_at: now,
        };

        let mut channels = self.channels.lock().unwrap_or_else(|e| e.into_inner());
        let channel = channels
            .get_mut(&request.channel_id)
            .ok_or_else(|| SettlementError::UnknownChannel(request.channel_id.clone()))?;
        if channel.settled.is_some() {
            return Err(SettlementError::AlreadySettled(request.channel_id.clone()));
        }
        channel.settled = Some(receipt.clone());

        info!(
            channel_id = %receipt.channel_id,
            tx_hash = %receipt.tx_hash.short_hex(),
            paid = %receipt.paid,
            refunded = %receipt.refunded,
            "channel settled"
        );
        Ok(receipt)
    }
}
