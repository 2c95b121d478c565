//! Per-run capacity planning across sender accounts.

use chrono::{DateTime, Utc};
use tracing::info;

use super::warmup;
use crate::Result;
use crate::account::{AccountRepository, SenderAccount};
use crate::outbox::OutboxRepository;

/// How much one account may still send, computed fresh for every run and
/// discarded afterwards.
#[derive(Debug, Clone)]
pub struct CapacitySlot {
    /// The account this slot belongs to.
    pub account: SenderAccount,
    /// Warmup-adjusted cap for today.
    pub daily_limit: u32,
    /// Messages already sent today (UTC day).
    pub used_today: u32,
    /// What is left of the daily limit.
    pub remaining_today: u32,
    /// Slot size for this run: `min(remaining_today, per_run_cap)`.
    pub capacity_this_run: u32,
}

/// The slots with non-zero capacity for one dispatch run.
#[derive(Debug, Clone, Default)]
pub struct CapacityPlan {
    /// Accounts that can still send something, in registry order.
    pub slots: Vec<CapacitySlot>,
    /// Sum of every slot's `capacity_this_run`.
    pub total_capacity: u32,
}

/// Compute capacity slots for the given active accounts.
///
/// Accounts whose slot would be empty are dropped from the plan. As a
/// side effect, any account that has never sent gets its warmup anchor
/// set to `now` — but only when at least one eligible message exists, so
/// the ramp starts with real traffic rather than account creation. The
/// anchor write is a conditional update; losing the race to a concurrent
/// run just means re-reading the anchor that run stored.
///
/// # Errors
///
/// Returns an error if any storage query fails.
pub async fn plan(
    registry: &AccountRepository,
    outbox: &OutboxRepository,
    active: Vec<SenderAccount>,
    per_run_cap: u32,
    now: DateTime<Utc>,
) -> Result<CapacityPlan> {
    let eligible = outbox.count_eligible().await?;
    let start_of_day = warmup::start_of_day_utc(now);

    let mut slots = Vec::new();
    let mut total_capacity = 0u32;

    for mut account in active {
        let Some(id) = account.id else { continue };

        if account.warmup_start_date.is_none() && eligible > 0 {
            if registry.start_warmup(id, now).await? {
                info!(account = %account.email, "Warmup started");
                account.warmup_start_date = Some(now);
            } else if let Some(fresh) = registry.get(id).await? {
                account = fresh;
            }
        }

        let daily_limit = warmup::daily_limit(&account, now);
        let used_today = outbox.count_sent_since(id, start_of_day).await?;
        let remaining_today = daily_limit.saturating_sub(used_today);
        let capacity_this_run = remaining_today.min(per_run_cap);

        if capacity_this_run == 0 {
            continue;
        }

        total_capacity += capacity_this_run;
        slots.push(CapacitySlot {
            account,
            daily_limit,
            used_today,
            remaining_today,
            capacity_this_run,
        });
    }

    Ok(CapacityPlan {
        slots,
        total_capacity,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::outbox::NewOutboxMessage;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn fixtures() -> (AccountRepository, OutboxRepository) {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        let accounts = AccountRepository::with_pool(pool.clone()).await.unwrap();
        let outbox = OutboxRepository::with_pool(pool).await.unwrap();
        (accounts, outbox)
    }

    fn approved(to: &str) -> NewOutboxMessage {
        NewOutboxMessage {
            lead_id: None,
            to_email: to.to_string(),
            subject: "Hello".to_string(),
            body: "Body".to_string(),
            approved: true,
        }
    }

    #[tokio::test]
    async fn test_plan_without_queued_work_leaves_warmup_unset() {
        let (accounts, outbox) = fixtures().await;
        let mut account = SenderAccount::new("fresh@example.com");
        accounts.save(&mut account).await.unwrap();

        let plan = super::plan(
            &accounts,
            &outbox,
            accounts.list_active().await.unwrap(),
            10,
            Utc::now(),
        )
        .await
        .unwrap();

        // No warmup anchor: full cap, but the anchor stays unset.
        assert_eq!(plan.total_capacity, 10);
        let stored = accounts.get(account.id.unwrap()).await.unwrap().unwrap();
        assert!(stored.warmup_start_date.is_none());
    }

    #[tokio::test]
    async fn test_plan_with_queued_work_anchors_warmup() {
        let (accounts, outbox) = fixtures().await;
        let mut account = SenderAccount::new("fresh@example.com");
        accounts.save(&mut account).await.unwrap();
        outbox.insert(&approved("jane@example.com")).await.unwrap();

        let now = Utc::now();
        let plan = super::plan(
            &accounts,
            &outbox,
            accounts.list_active().await.unwrap(),
            10,
            now,
        )
        .await
        .unwrap();

        // Day zero of the ramp: five messages, capped by nothing else.
        assert_eq!(plan.slots.len(), 1);
        assert_eq!(plan.slots[0].daily_limit, 5);
        assert_eq!(plan.slots[0].capacity_this_run, 5);

        let stored = accounts.get(account.id.unwrap()).await.unwrap().unwrap();
        assert_eq!(
            stored.warmup_start_date.unwrap().timestamp(),
            now.timestamp()
        );
    }

    #[tokio::test]
    async fn test_exhausted_account_is_dropped_from_the_plan() {
        let (accounts, outbox) = fixtures().await;
        let mut account = SenderAccount::new("spent@example.com");
        account.warmup_start_date = Some(Utc::now());
        accounts.save(&mut account).await.unwrap();
        let id = account.id.unwrap();

        // Day zero: limit is five. Burn all five.
        for i in 0..5 {
            let message = outbox.insert(&approved(&format!("r{i}@example.com"))).await.unwrap();
            assert!(outbox.claim(message.id, id).await.unwrap());
            outbox.mark_sent(message.id, Utc::now()).await.unwrap();
        }

        let plan = super::plan(
            &accounts,
            &outbox,
            accounts.list_active().await.unwrap(),
            10,
            Utc::now(),
        )
        .await
        .unwrap();

        assert!(plan.slots.is_empty());
        assert_eq!(plan.total_capacity, 0);
    }

    #[tokio::test]
    async fn test_per_run_cap_bounds_each_slot() {
        let (accounts, outbox) = fixtures().await;
        let mut a = SenderAccount::new("a@example.com");
        accounts.save(&mut a).await.unwrap();
        let mut b = SenderAccount::new("b@example.com");
        accounts.save(&mut b).await.unwrap();

        let plan = super::plan(
            &accounts,
            &outbox,
            accounts.list_active().await.unwrap(),
            3,
            Utc::now(),
        )
        .await
        .unwrap();

        assert_eq!(plan.slots.len(), 2);
        for slot in &plan.slots {
            assert_eq!(slot.capacity_this_run, 3);
        }
        assert_eq!(plan.total_capacity, 6);
    }
}
