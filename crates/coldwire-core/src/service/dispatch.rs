//! The batch-dispatch engine.
//!
//! One run: gate on the global switch and the sending window, plan
//! capacity, fetch the oldest eligible messages, assign them round-robin
//! across accounts with room, and record every outcome individually. The
//! only concurrency discipline is the per-row atomic claim — there is no
//! lock, and two overlapping runs can overshoot a daily cap by at most
//! `per_run_cap` per account.

use std::sync::Arc;

use chrono::{DateTime, Timelike, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use super::capacity::{self, CapacitySlot};
use super::transport::{MailTransport, OutgoingEmail};
use crate::account::{AccountId, AccountRepository};
use crate::controls::ControlsRepository;
use crate::outbox::{MessageId, MessageStatus, OutboxMessage, OutboxRepository};
use crate::{Error, Result};

/// Why a dispatch run sent fewer messages than asked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchReason {
    /// The run completed normally (possibly with nothing queued).
    Ok,
    /// The global sending switch is off.
    SendingPaused,
    /// The current hour falls outside the configured sending window.
    OutsideSendingWindow,
    /// No sender account is active.
    #[serde(rename = "no_active_sender_accounts")]
    NoActiveAccounts,
    /// Every active account is out of quota for this run.
    NoCapacity,
}

/// Per-account observability numbers for one run.
#[derive(Debug, Clone, Serialize)]
pub struct AccountBreakdown {
    /// Account id.
    pub account_id: AccountId,
    /// Sending address.
    pub email: String,
    /// Warmup-adjusted daily limit.
    pub daily_limit: u32,
    /// Messages already sent today before this run.
    pub used_today: u32,
    /// Slot size for this run.
    pub capacity_this_run: u32,
    /// Messages actually assigned during this run.
    pub assigned: u32,
}

/// Outcome summary of a dispatch run.
#[derive(Debug, Clone, Serialize)]
pub struct DispatchReport {
    /// Messages the transport accepted.
    pub sent: u32,
    /// Messages the transport rejected (recorded as `failed`).
    pub failed: u32,
    /// Why the run stopped where it did.
    pub reason: DispatchReason,
    /// Per-account breakdown.
    pub accounts: Vec<AccountBreakdown>,
}

impl DispatchReport {
    const fn empty(reason: DispatchReason) -> Self {
        Self {
            sent: 0,
            failed: 0,
            reason,
            accounts: Vec::new(),
        }
    }
}

/// Hours (UTC) during which dispatch may run; start inclusive, end
/// exclusive. A window whose start is after its end wraps midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SendWindow {
    /// First hour dispatch is allowed.
    pub start_hour: u32,
    /// First hour dispatch is no longer allowed.
    pub end_hour: u32,
}

impl SendWindow {
    /// Whether `hour` falls inside the window.
    #[must_use]
    pub const fn contains(&self, hour: u32) -> bool {
        if self.start_hour <= self.end_hour {
            hour >= self.start_hour && hour < self.end_hour
        } else {
            hour >= self.start_hour || hour < self.end_hour
        }
    }
}

/// Tunables for the dispatch engine.
#[derive(Debug, Clone, Copy)]
pub struct DispatchConfig {
    /// Ceiling on messages per account within a single run.
    pub per_run_cap: u32,
    /// Default ceiling on messages per run across all accounts.
    pub max_batch: u32,
    /// Optional time-of-day gate.
    pub window: Option<SendWindow>,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            per_run_cap: 10,
            max_batch: 50,
            window: None,
        }
    }
}

/// A capacity slot plus what this run has already put on it.
struct SlotState {
    slot: CapacitySlot,
    assigned: u32,
}

impl SlotState {
    const fn has_room(&self) -> bool {
        self.assigned < self.slot.capacity_this_run
    }

    fn breakdown(&self) -> AccountBreakdown {
        AccountBreakdown {
            account_id: self.slot.account.id.unwrap_or(AccountId::new(0)),
            email: self.slot.account.email.clone(),
            daily_limit: self.slot.daily_limit,
            used_today: self.slot.used_today,
            capacity_this_run: self.slot.capacity_this_run,
            assigned: self.assigned,
        }
    }
}

/// The sender-quota / warmup / batch-dispatch engine.
pub struct Dispatcher {
    accounts: AccountRepository,
    outbox: OutboxRepository,
    controls: ControlsRepository,
    transport: Arc<dyn MailTransport>,
    config: DispatchConfig,
}

impl Dispatcher {
    /// Create a dispatcher over the given storage and transport.
    #[must_use]
    pub fn new(
        accounts: AccountRepository,
        outbox: OutboxRepository,
        controls: ControlsRepository,
        transport: Arc<dyn MailTransport>,
        config: DispatchConfig,
    ) -> Self {
        Self {
            accounts,
            outbox,
            controls,
            transport,
            config,
        }
    }

    /// Run one bounded dispatch batch now.
    ///
    /// `max_batch` overrides the configured batch ceiling for this run.
    ///
    /// # Errors
    ///
    /// Returns an error only when a storage write fails — losing a send
    /// outcome silently would be worse than surfacing the failure.
    /// Operational "nothing to do" cases come back as a report with the
    /// matching [`DispatchReason`].
    pub async fn dispatch_batch(&self, max_batch: Option<u32>) -> Result<DispatchReport> {
        self.dispatch_batch_at(max_batch, Utc::now()).await
    }

    /// [`Self::dispatch_batch`] with an injected clock, for tests.
    ///
    /// # Errors
    ///
    /// See [`Self::dispatch_batch`].
    pub async fn dispatch_batch_at(
        &self,
        max_batch: Option<u32>,
        now: DateTime<Utc>,
    ) -> Result<DispatchReport> {
        if !self.controls.sending_enabled().await {
            debug!("Dispatch skipped, sending is paused");
            return Ok(DispatchReport::empty(DispatchReason::SendingPaused));
        }
        if let Some(window) = self.config.window
            && !window.contains(now.hour())
        {
            debug!(hour = now.hour(), "Dispatch skipped, outside sending window");
            return Ok(DispatchReport::empty(DispatchReason::OutsideSendingWindow));
        }

        let active = self.accounts.list_active().await?;
        if active.is_empty() {
            warn!("Dispatch skipped, no active sender accounts");
            return Ok(DispatchReport::empty(DispatchReason::NoActiveAccounts));
        }

        let plan = capacity::plan(
            &self.accounts,
            &self.outbox,
            active,
            self.config.per_run_cap,
            now,
        )
        .await?;
        if plan.total_capacity == 0 {
            return Ok(DispatchReport::empty(DispatchReason::NoCapacity));
        }

        let fetch = plan
            .total_capacity
            .min(max_batch.unwrap_or(self.config.max_batch));
        let messages = self.outbox.eligible_batch(fetch).await?;

        let mut slots: Vec<SlotState> = plan
            .slots
            .into_iter()
            .map(|slot| SlotState { slot, assigned: 0 })
            .collect();
        let mut cursor = 0usize;
        let mut sent = 0u32;
        let mut failed = 0u32;

        for message in messages {
            let Some(idx) = next_open_slot(&slots, cursor) else {
                break;
            };
            let Some(account_id) = slots[idx].slot.account.id else {
                break;
            };

            // The claim is the only thing standing between two overlapping
            // runs; a lost claim means the row is someone else's now.
            if !self.outbox.claim(message.id, account_id).await? {
                debug!(message = message.id.0, "Claim lost to a concurrent run");
                continue;
            }

            slots[idx].assigned += 1;
            cursor = (idx + 1) % slots.len();

            if self.deliver(&message, &slots[idx].slot).await? {
                sent += 1;
            } else {
                failed += 1;
            }
        }

        let accounts: Vec<AccountBreakdown> = slots.iter().map(SlotState::breakdown).collect();
        info!(sent, failed, "Dispatch run complete");

        Ok(DispatchReport {
            sent,
            failed,
            reason: DispatchReason::Ok,
            accounts,
        })
    }

    /// Send exactly one approved message now, through the best-available
    /// account under the same capacity rules as a batch run.
    ///
    /// # Errors
    ///
    /// Fails fast with [`Error::NotApproved`] when the message is not in
    /// the approved lane, [`Error::MessageNotFound`] when it does not
    /// exist, and [`Error::Conflict`] when a concurrent run claimed it
    /// between the precondition check and the claim.
    pub async fn send_single(&self, id: MessageId) -> Result<DispatchReport> {
        self.send_single_at(id, Utc::now()).await
    }

    /// [`Self::send_single`] with an injected clock, for tests.
    ///
    /// # Errors
    ///
    /// See [`Self::send_single`].
    pub async fn send_single_at(&self, id: MessageId, now: DateTime<Utc>) -> Result<DispatchReport> {
        let message = self
            .outbox
            .get(id)
            .await?
            .ok_or(Error::MessageNotFound(id.0))?;
        if message.status != MessageStatus::Approved || message.sender_id.is_some() {
            return Err(Error::NotApproved {
                id,
                status: message.status,
            });
        }

        if !self.controls.sending_enabled().await {
            return Ok(DispatchReport::empty(DispatchReason::SendingPaused));
        }

        let active = self.accounts.list_active().await?;
        if active.is_empty() {
            return Ok(DispatchReport::empty(DispatchReason::NoActiveAccounts));
        }

        let plan = capacity::plan(
            &self.accounts,
            &self.outbox,
            active,
            self.config.per_run_cap,
            now,
        )
        .await?;

        // Best available: the account with the most room left today.
        let Some(slot) = plan
            .slots
            .into_iter()
            .max_by_key(|slot| slot.remaining_today)
        else {
            return Ok(DispatchReport::empty(DispatchReason::NoCapacity));
        };
        let Some(account_id) = slot.account.id else {
            return Ok(DispatchReport::empty(DispatchReason::NoCapacity));
        };

        if !self.outbox.claim(id, account_id).await? {
            return Err(Error::Conflict(id));
        }

        let state = SlotState { slot, assigned: 1 };
        let (sent, failed) = if self.deliver(&message, &state.slot).await? {
            (1, 0)
        } else {
            (0, 1)
        };

        Ok(DispatchReport {
            sent,
            failed,
            reason: DispatchReason::Ok,
            accounts: vec![state.breakdown()],
        })
    }

    /// Hand one claimed message to the transport and persist the outcome.
    ///
    /// Returns whether the transport accepted it. A transport failure is
    /// recorded on the row and the loop continues; a *storage* failure
    /// while recording the outcome propagates, since silently losing the
    /// result of a send is worse than a visible error.
    async fn deliver(&self, message: &OutboxMessage, slot: &CapacitySlot) -> Result<bool> {
        let email = OutgoingEmail {
            to: message.to_email.clone(),
            subject: message.subject.clone(),
            body: message.body.clone(),
            from_email: slot.account.email.clone(),
            display_name: slot.account.display_name.clone(),
            smtp: slot.account.smtp.clone(),
        };

        match self.transport.send(&email).await {
            Ok(()) => {
                self.outbox.mark_sent(message.id, Utc::now()).await?;
                debug!(message = message.id.0, from = %slot.account.email, "Sent");
                Ok(true)
            }
            Err(e) => {
                warn!(
                    message = message.id.0,
                    from = %slot.account.email,
                    error = %e,
                    "Transport failure"
                );
                self.outbox.mark_failed(message.id, &e.to_string()).await?;
                Ok(false)
            }
        }
    }
}

/// Next slot index with room, scanning round-robin from `cursor`.
fn next_open_slot(slots: &[SlotState], cursor: usize) -> Option<usize> {
    let n = slots.len();
    (0..n)
        .map(|offset| (cursor + offset) % n)
        .find(|&idx| slots[idx].has_room())
}
