//! Ledger plus settlement backend, wired together.
//!
//! The ledger never does I/O. [`ChannelClient`] adds the two on-chain
//! steps around it: locking the deposit before a channel is recorded, and
//! submitting the final amount after it is closed. A failed submission
//! leaves the channel terminated but unconfirmed, so
//! [`settle_pending`](ChannelClient::settle_pending) can retry it later.

use chrono::{DateTime, Utc};
use stateset_crypto::Signer;
use stateset_types::{Address, Amount, ChannelId};
use tracing::{info, warn};

use crate::channel::{Channel, ChannelState, SettlementRequest};
use crate::error::{ClientError, SettlementError};
use crate::ledger::PaymentChannelLedger;
use crate::settlement::{Settlement, SettlementReceipt};
use crate::traits::ChannelStore;

pub struct ChannelClient<S, G, T> {
    ledger: PaymentChannelLedger<S, G>,
    settlement: T,
}

impl<S, G, T> ChannelClient<S, G, T>
where
    S: ChannelStore,
    G: Signer,
    T: Settlement,
{
    pub fn new(ledger: PaymentChannelLedger<S, G>, settlement: T) -> Self {
        Self { ledger, settlement }
    }

    pub fn ledger(&self) -> &PaymentChannelLedger<S, G> {
        &self.ledger
    }

    pub fn settlement(&self) -> &T {
        &self.settlement
    }

    /// Lock the deposit on-chain, then record the channel locally.
    ///
    /// If recording fails after the deposit is locked, the error is
    /// [`ClientError::Unrecorded`] and carries the on-chain channel id.
    pub async fn open(
        &self,
        counterparty: Address,
        deposit: Amount,
        expires_at: DateTime<Utc>,
    ) -> Result<Channel, ClientError> {
        self.ledger.check_open(&counterparty, deposit, expires_at)?;
        let channel_id = self
            .settlement
            .submit_open(self.ledger.sender(), &counterparty, deposit, expires_at)
            .await?;
        match self
            .ledger
            .open_channel(channel_id.clone(), counterparty, deposit, expires_at)
        {
            Ok(channel) => Ok(channel),
            Err(e) => {
                warn!(
                    channel_id = %channel_id,
                    deposit = %deposit,
                    error = %e,
                    "deposit locked but channel not recorded locally"
                );
                Err(ClientError::Unrecorded {
                    channel_id,
                    source: e,
                })
            }
        }
    }

    /// Off-chain payment. No settlement traffic.
    pub fn pay(&self, channel_id: &ChannelId, amount: Amount) -> Result<ChannelState, ClientError> {
        Ok(self.ledger.record_payment(channel_id, amount)?)
    }

    /// Close cooperatively and settle the final amount.
    pub async fn close(&self, channel_id: &ChannelId) -> Result<SettlementReceipt, ClientError> {
        let request = self.ledger.close_channel(channel_id)?;
        self.submit(request).await
    }

    /// Withdraw from an expired channel and settle it.
    pub async fn withdraw_expired(
        &self,
        channel_id: &ChannelId,
    ) -> Result<SettlementReceipt, ClientError> {
        let request = self.ledger.withdraw_expired(channel_id)?;
        self.submit(request).await
    }

    /// Retry every terminated channel that has not been confirmed.
    ///
    /// Channels the backend reports as already settled are confirmed
    /// without a receipt. Stops at the first other failure.
    pub async fn settle_pending(&self) -> Result<Vec<SettlementReceipt>, ClientError> {
        let mut receipts = Vec::new();
        for request in self.ledger.pending_settlements()? {
            let channel_id = request.channel_id.clone();
            match self.submit(request).await {
                Ok(receipt) => receipts.push(receipt),
                Err(ClientError::Settlement(SettlementError::AlreadySettled(_))) => {
                    self.ledger.confirm_settlement(&channel_id)?;
                }
                Err(e) => return Err(e),
            }
        }
        Ok(receipts)
    }

    async fn submit(&self, request: SettlementRequest) -> Result<SettlementReceipt, ClientError> {
        let receipt = match self.settlement.submit_close(&request).await {
            Ok(receipt) => receipt,
            Err(e) => {
                warn!(
                    channel_id = %request.channel_id,
                    error = %e,
                    "settlement submission failed; channel left pending"
                );
                return Err(e.into());
            }
        };
        self.ledger.confirm_settlement(&request.channel_id)?;
        info!(
            channel_id = %receipt.channel_id,
            tx_hash = %receipt.tx_hash.short_hex(),
            "settlement confirmed"
        );
        Ok(receipt)
    }
}
