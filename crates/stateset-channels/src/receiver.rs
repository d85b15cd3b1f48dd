//! Recipient-side verification of incoming channel states.
//!
//! The sender's ledger signs every new state; [`ChannelReceiver`] is the
//! other end. It only ever moves forward: a state is accepted when its
//! signature checks out against the sender's key, its nonce is above the
//! last accepted one, its total has not gone down, and it stays within the
//! deposit. Anything else is rejected without touching the stored state,
//! which makes replayed or reordered messages harmless.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use stateset_crypto::Verifier;
use stateset_types::{Address, Amount, ChannelId};
use tracing::{debug, warn};

use crate::channel::{ChannelState, SettlementKind, SettlementRequest};
use crate::error::{ChannelError, Result, StoreError};

struct IncomingChannel {
    sender: Address,
    deposit: Amount,
    verifier: Arc<dyn Verifier>,
    best: Option<ChannelState>,
}

impl IncomingChannel {
    fn total(&self) -> Amount {
        self.best.as_ref().map(|s| s.total_sent).unwrap_or(Amount::ZERO)
    }

    fn nonce(&self) -> u64 {
        self.best.as_ref().map(|s| s.nonce).unwrap_or(0)
    }
}

/// Tracks channels in which the local identity is the recipient.
pub struct ChannelReceiver {
    recipient: Address,
    channels: RwLock<HashMap<ChannelId, IncomingChannel>>,
}

impl ChannelReceiver {
    pub fn new(recipient: Address) -> Self {
        Self {
            recipient,
            channels: RwLock::new(HashMap::new()),
        }
    }

    pub fn recipient(&self) -> &Address {
        &self.recipient
    }

    /// Start tracking a channel opened towards us.
    ///
    /// `verifier` must hold the sender's public key.
    pub fn register(
        &self,
        channel_id: ChannelId,
        sender: Address,
        deposit: Amount,
        verifier: Arc<dyn Verifier>,
    ) -> Result<()> {
        if deposit.is_zero() {
            return Err(ChannelError::InvalidDeposit {
                deposit,
                minimum: Amount::new(1),
            });
        }
        if sender == self.recipient {
            return Err(ChannelError::InvalidCounterparty);
        }
        let mut channels = self.write()?;
        if channels.contains_key(&channel_id) {
            return Err(ChannelError::ChannelExists(channel_id));
        }
        debug!(channel_id = %channel_id, sender = %sender, deposit = %deposit, "tracking incoming channel");
        channels.insert(
            channel_id,
            IncomingChannel {
                sender,
                deposit,
                verifier,
                best: None,
            },
        );
        Ok(())
    }

    /// Validate and adopt a state from the sender.
    ///
    /// Returns the amount received since the previously accepted state.
    pub fn accept(&self, state: &ChannelState) -> Result<Amount> {
        let mut channels = self.write()?;
        let channel = channels
            .get_mut(&state.channel_id)
            .ok_or_else(|| ChannelError::ChannelNotFound(state.channel_id.clone()))?;

        if let Err(e) = state.verify(channel.verifier.as_ref()) {
            warn!(
                channel_id = %state.channel_id,
                sender = %channel.sender,
                nonce = state.nonce,
                "rejected channel state with invalid signature"
            );
            return Err(e);
        }
        if state.nonce <= channel.nonce() {
            return Err(ChannelError::StaleNonce {
                channel_id: state.channel_id.clone(),
                current: channel.nonce(),
                received: state.nonce,
            });
        }
        let received = state
            .total_sent
            .checked_sub(channel.total())
            .ok_or_else(|| ChannelError::AmountDecreased {
                channel_id: state.channel_id.clone(),
                current: channel.total(),
                received: state.total_sent,
            })?;
        if state.total_sent > channel.deposit {
            return Err(ChannelError::CapacityExceeded {
                channel_id: state.channel_id.clone(),
                requested: received,
                remaining: channel.deposit.saturating_sub(channel.total()),
            });
        }

        channel.best = Some(state.clone());
        debug!(
            channel_id = %state.channel_id,
            nonce = state.nonce,
            total_sent = %state.total_sent,
            received = %received,
            "accepted channel state"
        );
        Ok(received)
    }

    /// The highest-nonce state accepted so far.
    pub fn best_state(&self, channel_id: &ChannelId) -> Result<Option<ChannelState>> {
        let channels = self.read()?;
        let channel = channels
            .get(channel_id)
            .ok_or_else(|| ChannelError::ChannelNotFound(channel_id.clone()))?;
        Ok(channel.best.clone())
    }

    pub fn total_received(&self, channel_id: &ChannelId) -> Result<Amount> {
        let channels = self.read()?;
        channels
            .get(channel_id)
            .map(IncomingChannel::total)
            .ok_or_else(|| ChannelError::ChannelNotFound(channel_id.clone()))
    }

    /// Stop tracking the channel and produce a claim for the best state.
    pub fn claim(&self, channel_id: &ChannelId) -> Result<SettlementRequest> {
        let mut channels = self.write()?;
        let channel = channels
            .remove(channel_id)
            .ok_or_else(|| ChannelError::ChannelNotFound(channel_id.clone()))?;
        Ok(SettlementRequest {
            channel_id: channel_id.clone(),
            final_amount: channel.total(),
            nonce: channel.nonce(),
            signature: channel.best.and_then(|s| s.signature),
            kind: SettlementKind::Claim,
        })
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, HashMap<ChannelId, IncomingChannel>>> {
        self.channels
            .read()
            .map_err(|_| ChannelError::Store(StoreError::LockPoisoned))
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, HashMap<ChannelId, IncomingChannel>>> {
        self.channels
            .write()
            .map_err(|_| ChannelError::Store(StoreError::LockPoisoned))
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Duration};
    use stateset_crypto::{SignatureError, SigningKey};

    use super::*;
    use crate::channel::sign_state;
    use crate::clock::{Clock, ManualClock};
    use crate::config::ChannelConfig;
    use crate::ledger::PaymentChannelLedger;
    use crate::memory::InMemoryChannelStore;

    fn sender_key() -> SigningKey {
        SigningKey::from_bytes([21u8; 32])
    }

    fn merchant() -> Address {
        Address::new("stateset1merchant").unwrap()
    }

    fn channel_id() -> ChannelId {
        ChannelId::new("ch-in").unwrap()
    }

    fn receiver(deposit: u128) -> ChannelReceiver {
        let receiver = ChannelReceiver::new(merchant());
        receiver
            .register(
                channel_id(),
                sender_key().address(),
                Amount::new(deposit),
                Arc::new(sender_key().verifying_key()),
            )
            .unwrap();
        receiver
    }

    fn signed(total: u128, nonce: u64) -> ChannelState {
        ChannelState {
            channel_id: channel_id(),
            total_sent: Amount::new(total),
            nonce,
            signature: Some(sign_state(&sender_key(), &channel_id(), Amount::new(total), nonce)),
        }
    }

    #[test]
    fn accepts_increasing_states() {
        let receiver = receiver(1_000);
        assert_eq!(receiver.accept(&signed(100, 1)).unwrap(), Amount::new(100));
        assert_eq!(receiver.accept(&signed(250, 2)).unwrap(), Amount::new(150));
        assert_eq!(receiver.total_received(&channel_id()).unwrap(), Amount::new(250));
    }

    #[test]
    fn tolerates_skipped_nonces() {
        let receiver = receiver(1_000);
        receiver.accept(&signed(100, 1)).unwrap();
        assert_eq!(receiver.accept(&signed(300, 3)).unwrap(), Amount::new(200));
    }

    #[test]
    fn rejects_replayed_state() {
        let receiver = receiver(1_000);
        let state = signed(100, 1);
        receiver.accept(&state).unwrap();
        let err = receiver.accept(&state).unwrap_err();
        assert!(matches!(
            err,
            ChannelError::StaleNonce {
                current: 1,
                received: 1,
                ..
            }
        ));
    }

    #[test]
    fn rejects_decreasing_total() {
        let receiver = receiver(1_000);
        receiver.accept(&signed(500, 1)).unwrap();
        let err = receiver.accept(&signed(400, 2)).unwrap_err();
        assert!(matches!(err, ChannelError::AmountDecreased { .. }));
        assert_eq!(receiver.best_state(&channel_id()).unwrap().unwrap().nonce, 1);
    }

    #[test]
    fn rejects_total_above_deposit() {
        let receiver = receiver(1_000);
        let err = receiver.accept(&signed(1_001, 1)).unwrap_err();
        assert!(matches!(err, ChannelError::CapacityExceeded { .. }));
        assert!(receiver.best_state(&channel_id()).unwrap().is_none());
    }

    #[test]
    fn rejects_forged_signature() {
        let receiver = receiver(1_000);
        let forger = SigningKey::from_bytes([99u8; 32]);
        let forged = ChannelState {
            signature: Some(sign_state(&forger, &channel_id(), Amount::new(900), 1)),
            ..signed(900, 1)
        };
        let err = receiver.accept(&forged).unwrap_err();
        assert!(matches!(
            err,
            ChannelError::Signature(SignatureError::InvalidSignature)
        ));
    }

    #[test]
    fn rejects_tampered_total() {
        let receiver = receiver(1_000);
        let mut state = signed(100, 1);
        state.total_sent = Amount::new(900);
        assert!(receiver.accept(&state).is_err());
        assert_eq!(receiver.total_received(&channel_id()).unwrap(), Amount::ZERO);
    }

    #[test]
    fn rejects_unknown_channel() {
        let receiver = ChannelReceiver::new(merchant());
        let err = receiver.accept(&signed(1, 1)).unwrap_err();
        assert!(matches!(err, ChannelError::ChannelNotFound(_)));
    }

    #[test]
    fn register_validates_inputs() {
        let receiver = receiver(1_000);
        let verifier: Arc<dyn Verifier> = Arc::new(sender_key().verifying_key());
        assert!(matches!(
            receiver.register(channel_id(), sender_key().address(), Amount::new(5), verifier.clone()),
            Err(ChannelError::ChannelExists(_))
        ));
        assert!(matches!(
            receiver.register(ChannelId::new("ch-2").unwrap(), merchant(), Amount::new(5), verifier.clone()),
            Err(ChannelError::InvalidCounterparty)
        ));
        assert!(matches!(
            receiver.register(ChannelId::new("ch-3").unwrap(), sender_key().address(), Amount::ZERO, verifier),
            Err(ChannelError::InvalidDeposit { .. })
        ));
    }

    #[test]
    fn claim_uses_best_state() {
        let receiver = receiver(1_000);
        receiver.accept(&signed(100, 1)).unwrap();
        let best = signed(700, 2);
        receiver.accept(&best).unwrap();
        let claim = receiver.claim(&channel_id()).unwrap();
        assert_eq!(claim.final_amount, Amount::new(700));
        assert_eq!(claim.nonce, 2);
        assert_eq!(claim.signature, best.signature);
        assert_eq!(claim.kind, SettlementKind::Claim);
        assert!(receiver.best_state(&channel_id()).is_err());
    }

    #[test]
    fn follows_a_live_ledger() {
        let key = sender_key();
        let clock = Arc::new(ManualClock::new(DateTime::from_timestamp(1_700_000_000, 0).unwrap()));
        let ledger = PaymentChannelLedger::new(
            key.address(),
            InMemoryChannelStore::new(),
            key,
            ChannelConfig::default(),
        )
        .with_clock(clock.clone());
        ledger
            .open_channel(channel_id(), merchant(), Amount::new(10_000_000), clock.now() + Duration::hours(1))
            .unwrap();

        let receiver = receiver(10_000_000);
        for _ in 0..5 {
            let state = ledger.record_payment(&channel_id(), Amount::new(1_000_000)).unwrap();
            let wire = state.to_json().unwrap();
            let received = receiver.accept(&ChannelState::from_json(&wire).unwrap()).unwrap();
            assert_eq!(received, Amount::new(1_000_000));
        }
        assert_eq!(receiver.total_received(&channel_id()).unwrap(), Amount::new(5_000_000));
    }
}
