//! The sender-side payment channel ledger.
//!
//! [`PaymentChannelLedger`] is the local authority for every channel opened
//! by one sender identity. It enforces the channel invariants:
//!
//! - `total_sent` never decreases and never exceeds `deposit`;
//! - `nonce` grows by exactly one per accepted payment;
//! - `last_signature` always covers the current `(total_sent, nonce)`.
//!
//! Every rejected call leaves the store untouched. Payments do no network
//! I/O; opening and settling on-chain are the caller's job (see
//! [`ChannelClient`](crate::client::ChannelClient)).

use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use stateset_crypto::Signer;
use stateset_types::{Address, Amount, ChannelId};
use tracing::{debug, info};

use crate::channel::{sign_state, Channel, ChannelState, ChannelStatus, SettlementKind, SettlementRequest};
use crate::clock::{Clock, SystemClock};
use crate::config::ChannelConfig;
use crate::error::{ChannelError, Result, StoreError};
use crate::traits::ChannelStore;

pub struct PaymentChannelLedger<S, G> {
    sender: Address,
    store: S,
    signer: G,
    config: ChannelConfig,
    clock: Arc<dyn Clock>,
    // Serializes read-modify-write sequences against the store.
    write_lock: Mutex<()>,
}

impl<S: ChannelStore, G: Signer> PaymentChannelLedger<S, G> {
    pub fn new(sender: Address, store: S, signer: G, config: ChannelConfig) -> Self {
        Self {
            sender,
            store,
            signer,
            config,
            clock: Arc::new(SystemClock),
            write_lock: Mutex::new(()),
        }
    }

    /// Replace the time source used for expiry checks.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// The local sender identity.
    pub fn sender(&self) -> &Address {
        &self.sender
    }

    pub fn config(&self) -> &ChannelConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Check open parameters without touching the store.
    ///
    /// Lets callers reject a channel before locking funds on-chain.
    pub fn check_open(
        &self,
        counterparty: &Address,
        deposit: Amount,
        expires_at: DateTime<Utc>,
    ) -> Result<()> {
        let minimum = self.config.effective_min_deposit();
        if deposit < minimum {
            return Err(ChannelError::InvalidDeposit { deposit, minimum });
        }

        let now = self.clock.now();
        if expires_at <= now {
            return Err(ChannelError::InvalidExpiry {
                expires_at,
                reason: format!("not after current time {now}"),
            });
        }
        if let Some(max) = self.config.max_channel_duration() {
            if expires_at - now > max {
                return Err(ChannelError::InvalidExpiry {
                    expires_at,
                    reason: format!("lifetime exceeds {} seconds", max.num_seconds()),
                });
            }
        }
        if *counterparty == self.sender {
            return Err(ChannelError::InvalidCounterparty);
        }
        Ok(())
    }

    /// Register a channel whose deposit has been locked by the settlement
    /// layer under `channel_id`.
    pub fn open_channel(
        &self,
        channel_id: ChannelId,
        counterparty: Address,
        deposit: Amount,
        expires_at: DateTime<Utc>,
    ) -> Result<Channel> {
        self.check_open(&counterparty, deposit, expires_at)?;
        let now = self.clock.now();

        let _guard = self.lock()?;
        if self.store.get(&channel_id)?.is_some() {
            return Err(ChannelError::ChannelExists(channel_id));
        }

        let channel = Channel {
            channel_id,
            sender: self.sender.clone(),
            counterparty,
            deposit,
            total_sent: Amount::ZERO,
            nonce: 0,
            last_signature: None,
            opened_at: now,
            expires_at,
            status: ChannelStatus::Open,
        };
        self.store.put(&channel)?;

        info!(
            channel_id = %channel.channel_id,
            counterparty = %channel.counterparty,
            deposit = %deposit,
            expires_at = %expires_at,
            "payment channel opened"
        );
        Ok(channel)
    }

    /// Add `increment` to the channel total and sign the new state.
    ///
    /// Returns the state to hand to the counterparty.
    pub fn record_payment(&self, channel_id: &ChannelId, increment: Amount) -> Result<ChannelState> {
        let _guard = self.lock()?;
        let mut channel = self.load(channel_id)?;

        if !channel.status.is_open() {
            return Err(ChannelError::ChannelClosed(channel_id.clone()));
        }
        if channel.is_expired_at(self.clock.now()) {
            return Err(ChannelError::ChannelExpired {
                channel_id: channel_id.clone(),
                expires_at: channel.expires_at,
            });
        }
        if increment.is_zero() {
            return Err(ChannelError::InvalidAmount);
        }

        let new_total = channel
            .total_sent
            .checked_add(increment)
            .filter(|total| *total <= channel.deposit)
            .ok_or_else(|| ChannelError::CapacityExceeded {
                channel_id: channel_id.clone(),
                requested: increment,
                remaining: channel.remaining_capacity(),
            })?;
        let new_nonce = channel.nonce + 1;
        let signature = sign_state(&self.signer, channel_id, new_total, new_nonce);

        channel.total_sent = new_total;
        channel.nonce = new_nonce;
        channel.last_signature = Some(signature);
        self.store.put(&channel)?;

        debug!(
            channel_id = %channel_id,
            nonce = new_nonce,
            total_sent = %new_total,
            increment = %increment,
            "channel payment recorded"
        );
        Ok(channel.state())
    }

    /// Snapshot of the current signed state, if the channel exists.
    pub fn get_channel_state(&self, channel_id: &ChannelId) -> Result<Option<ChannelState>> {
        Ok(self.store.get(channel_id)?.map(|c| c.state()))
    }

    /// Full channel record, if it exists.
    pub fn get_channel(&self, channel_id: &ChannelId) -> Result<Option<Channel>> {
        Ok(self.store.get(channel_id)?)
    }

    pub fn remaining_capacity(&self, channel_id: &ChannelId) -> Result<Amount> {
        Ok(self.load(channel_id)?.remaining_capacity())
    }

    /// Freeze the channel and produce the request that settles its final
    /// total on-chain.
    ///
    /// The record stays in the store, marked closed, until
    /// [`confirm_settlement`](Self::confirm_settlement) is called.
    pub fn close_channel(&self, channel_id: &ChannelId) -> Result<SettlementRequest> {
        let _guard = self.lock()?;
        let mut channel = self.load(channel_id)?;
        if channel.status.is_terminated() {
            return Err(ChannelError::AlreadyClosed(channel_id.clone()));
        }

        channel.status = ChannelStatus::Closed;
        self.store.put(&channel)?;

        info!(
            channel_id = %channel_id,
            final_amount = %channel.total_sent,
            nonce = channel.nonce,
            "payment channel closed"
        );
        Ok(channel.settlement_request(SettlementKind::Cooperative))
    }

    /// Unilaterally terminate a channel whose expiry has passed.
    pub fn withdraw_expired(&self, channel_id: &ChannelId) -> Result<SettlementRequest> {
        let _guard = self.lock()?;
        let mut channel = self.load(channel_id)?;
        if channel.status.is_terminated() {
            return Err(ChannelError::AlreadyClosed(channel_id.clone()));
        }
        if !channel.is_expired_at(self.clock.now()) {
            return Err(ChannelError::NotExpired {
                channel_id: channel_id.clone(),
                expires_at: channel.expires_at,
            });
        }

        channel.status = ChannelStatus::Expired;
        self.store.put(&channel)?;

        info!(
            channel_id = %channel_id,
            final_amount = %channel.total_sent,
            expired_at = %channel.expires_at,
            "expired payment channel withdrawn"
        );
        Ok(channel.settlement_request(SettlementKind::Expiry))
    }

    /// Drop a terminated channel once its settlement has been submitted.
    pub fn confirm_settlement(&self, channel_id: &ChannelId) -> Result<()> {
        let _guard = self.lock()?;
        let channel = self.load(channel_id)?;
        if channel.status.is_open() {
            return Err(ChannelError::ChannelStillOpen(channel_id.clone()));
        }
        self.store.delete(channel_id)?;
        info!(channel_id = %channel_id, "channel settlement confirmed");
        Ok(())
    }

    /// Channels still accepting payments.
    pub fn open_channels(&self) -> Result<Vec<Channel>> {
        let now = self.clock.now();
        Ok(self
            .store
            .list()?
            .into_iter()
            .filter(|c| c.status.is_open() && !c.is_expired_at(now))
            .collect())
    }

    /// Open channels whose expiry has passed and which can be withdrawn.
    pub fn expired_channels(&self) -> Result<Vec<Channel>> {
        let now = self.clock.now();
        Ok(self
            .store
            .list()?
            .into_iter()
            .filter(|c| c.status.is_open() && c.is_expired_at(now))
            .collect())
    }

    /// Terminated channels whose settlement has not been confirmed yet.
    ///
    /// After a restart these are the requests that still need submitting.
    pub fn pending_settlements(&self) -> Result<Vec<SettlementRequest>> {
        Ok(self
            .store
            .list()?
            .into_iter()
            .filter_map(|c| match c.status {
                ChannelStatus::Open => None,
                ChannelStatus::Closed => Some(c.settlement_request(SettlementKind::Cooperative)),
                ChannelStatus::Expired => Some(c.settlement_request(SettlementKind::Expiry)),
            })
            .collect())
    }

    fn load(&self, channel_id: &ChannelId) -> Result<Channel> {
        self.store
            .get(channel_id)?
            .ok_or_else(|| ChannelError::ChannelNotFound(channel_id.clone()))
    }

    fn lock(&self) -> Result<MutexGuard<'_, ()>> {
        self.write_lock
            .lock()
            .map_err(|_| ChannelError::Store(StoreError::LockPoisoned))
    }
}
