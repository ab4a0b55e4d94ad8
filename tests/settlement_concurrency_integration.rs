//! Settlement protocol guarantees under concurrency and lost responses.
//!
//! The single-flight lock normally prevents overlapping cycles; these
//! tests deliberately give each cycle its own lock so the deeper
//! guarantees carry the weight: per-entry claim atomicity plus
//! idempotency-keyed submission keep real transfers at exactly one per
//! batch no matter how many cycles race.

use std::sync::Arc;
use std::time::Duration;

use referral_engine::adapters::memory::{
    InMemoryAccountRepository, InMemoryLedgerRepository, InMemoryPaymentRail,
    InMemorySettlementLock,
};
use referral_engine::application::handlers::payout::{
    RunSettlementCycleHandler, SettlementPolicy,
};
use referral_engine::domain::foundation::{
    CommissionRate, Money, OwnerId, ReferralAccountId, SaleReference, Timestamp,
};
use referral_engine::domain::ledger::{CommissionLedgerEntry, EntryState};
use referral_engine::domain::registry::{ReferralAccount, ReferralCode};
use referral_engine::domain::tiers::TierSchedule;
use referral_engine::ports::{AccountRepository, LedgerRepository};

fn policy() -> SettlementPolicy {
    SettlementPolicy {
        cool_down: Duration::from_secs(0),
        max_retries: 5,
        rail_timeout: Duration::from_secs(5),
    }
}

async fn seed_account(repo: &InMemoryAccountRepository, owner: &str) -> ReferralAccount {
    let account = ReferralAccount::create(
        ReferralAccountId::new(),
        OwnerId::new(owner).unwrap(),
        ReferralCode::generate(),
        &TierSchedule::default(),
    );
    repo.insert(&account).await.unwrap();
    account
}

async fn seed_entry(
    ledger: &InMemoryLedgerRepository,
    account: &ReferralAccount,
    reference: &str,
) -> CommissionLedgerEntry {
    let entry = CommissionLedgerEntry::record(
        account.id,
        SaleReference::new(reference).unwrap(),
        Money::from_minor_units(100_000).unwrap(),
        CommissionRate::parse("0.15").unwrap(),
        Timestamp::now().minus_secs(60),
    )
    .unwrap();
    ledger.insert(&entry).await.unwrap();
    entry
}

fn cycle_handler(
    ledger: Arc<InMemoryLedgerRepository>,
    accounts: Arc<InMemoryAccountRepository>,
    rail: Arc<InMemoryPaymentRail>,
) -> RunSettlementCycleHandler {
    RunSettlementCycleHandler::new(
        ledger,
        accounts,
        rail,
        Arc::new(InMemorySettlementLock::new()),
        policy(),
    )
}

#[tokio::test]
async fn racing_cycles_move_money_exactly_once() {
    let accounts = Arc::new(InMemoryAccountRepository::new());
    let ledger = Arc::new(InMemoryLedgerRepository::new());
    let rail = Arc::new(InMemoryPaymentRail::new());

    let mut expected_batches = 0;
    for owner in ["alice", "bob", "carol"] {
        let account = seed_account(&accounts, owner).await;
        expected_batches += 1;
        for i in 0..4 {
            seed_entry(&ledger, &account, &format!("pi_{}_{}", owner, i)).await;
        }
    }

    // Two cycles race over the same pending set, each with its own lock.
    let a = Arc::new(cycle_handler(ledger.clone(), accounts.clone(), rail.clone()));
    let b = Arc::new(cycle_handler(ledger.clone(), accounts.clone(), rail.clone()));
    let now = Timestamp::now();

    let (ra, rb) = tokio::join!(
        {
            let a = a.clone();
            async move { a.handle(now).await }
        },
        {
            let b = b.clone();
            async move { b.handle(now).await }
        }
    );
    ra.unwrap();
    rb.unwrap();

    // Exactly one real transfer per referrer, no matter who submitted.
    assert_eq!(rail.transfer_count().await, expected_batches);

    // Every entry ends settled exactly once.
    let entries = ledger.all().await;
    assert_eq!(entries.len(), 12);
    for entry in entries {
        assert_eq!(entry.state, EntryState::Settled);
    }
}

#[tokio::test]
async fn lost_response_is_reconciled_on_the_next_cycle_not_resubmitted() {
    let accounts = Arc::new(InMemoryAccountRepository::new());
    let ledger = Arc::new(InMemoryLedgerRepository::new());
    let rail = Arc::new(InMemoryPaymentRail::new());

    let account = seed_account(&accounts, "alice").await;
    let entry = seed_entry(&ledger, &account, "pi_1").await;

    let handler = cycle_handler(ledger.clone(), accounts.clone(), rail.clone());

    // First cycle: the transfer lands but the response is lost; the
    // reconcile query inside the cycle already recovers it.
    rail.timeout_next_submission();
    handler.handle(Timestamp::now()).await.unwrap();

    let stored = ledger.find_by_id(&entry.id).await.unwrap().unwrap();
    assert_eq!(stored.state, EntryState::Settled);
    assert_eq!(rail.transfer_count().await, 1);

    // Later cycles find nothing and never touch the rail again.
    handler.handle(Timestamp::now()).await.unwrap();
    handler.handle(Timestamp::now()).await.unwrap();
    assert_eq!(rail.transfer_count().await, 1);
    assert_eq!(rail.submissions().await.len(), 1);
}

#[tokio::test]
async fn terminal_destination_failure_isolates_and_parks_entries() {
    let accounts = Arc::new(InMemoryAccountRepository::new());
    let ledger = Arc::new(InMemoryLedgerRepository::new());
    let rail = Arc::new(InMemoryPaymentRail::new());

    let good = seed_account(&accounts, "good").await;
    let bad = seed_account(&accounts, "bad").await;
    seed_entry(&ledger, &good, "pi_good").await;
    let doomed = seed_entry(&ledger, &bad, "pi_bad").await;
    rail.reject_destination(&bad.owner_id).await;

    let mut short_policy = policy();
    short_policy.max_retries = 2;
    let handler = RunSettlementCycleHandler::new(
        ledger.clone(),
        accounts.clone(),
        rail.clone(),
        Arc::new(InMemorySettlementLock::new()),
        short_policy,
    );

    // Cycle 1: good settles, bad requeues. Cycle 2: bad exhausts.
    handler.handle(Timestamp::now()).await.unwrap();
    handler.handle(Timestamp::now()).await.unwrap();

    let entries = ledger.all().await;
    let good_entry = entries.iter().find(|e| e.account_id == good.id).unwrap();
    let bad_entry = entries.iter().find(|e| e.id == doomed.id).unwrap();

    assert_eq!(good_entry.state, EntryState::Settled);
    assert_eq!(bad_entry.state, EntryState::Failed);
    assert_eq!(bad_entry.retry_count, 2);

    // The failed referrer never got money; the good one got exactly one
    // transfer.
    assert_eq!(rail.transfer_count().await, 1);
}
