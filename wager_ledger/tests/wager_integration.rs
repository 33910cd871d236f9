//! Integration tests for wager settlement through the ledger.

use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;
use wager_ledger::db::{BalanceRepository, BalanceTransaction, MemoryBalanceRepository};
use wager_ledger::ledger::{Account, AccountId, LedgerError, LedgerManager, LedgerResult};
use wager_ledger::wager::{FixedOutcome, UniformOutcome, WagerResolver, WagerResult};

fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

/// Helper to create a resolver with a forced outcome over one funded account
async fn setup_resolver(
    balance: &str,
    outcome: &str,
) -> (WagerResolver, MemoryBalanceRepository, AccountId) {
    let store = MemoryBalanceRepository::new();
    let account = store.seed_account(dec(balance)).await;
    let ledger = LedgerManager::new(Arc::new(store.clone()));
    let resolver = WagerResolver::new(ledger, Arc::new(FixedOutcome(dec(outcome))));
    (resolver, store, account.id)
}

async fn committed_balance(store: &MemoryBalanceRepository, account_id: AccountId) -> Decimal {
    store.find_account(account_id).await.unwrap().unwrap().balance
}

/// Reports a stale, higher balance on unlocked reads, as if a concurrent
/// withdrawal committed right after the advisory check
struct StaleReadRepository {
    inner: MemoryBalanceRepository,
    reported: Decimal,
}

#[async_trait]
impl BalanceRepository for StaleReadRepository {
    async fn begin(&self) -> LedgerResult<Box<dyn BalanceTransaction>> {
        self.inner.begin().await
    }

    async fn find_account(&self, account_id: AccountId) -> LedgerResult<Option<Account>> {
        Ok(self
            .inner
            .find_account(account_id)
            .await?
            .map(|account| Account {
                balance: self.reported,
                ..account
            }))
    }

    async fn create_account(&self) -> LedgerResult<Account> {
        self.inner.create_account().await
    }
}

#[tokio::test]
async fn test_forced_loss_scenario() {
    let (resolver, store, id) = setup_resolver("60.00", "-30.00").await;

    let outcome = resolver.place_wager(id, dec("60.00")).await.unwrap();
    assert_eq!(outcome.result, WagerResult::Lost);
    assert_eq!(outcome.magnitude, dec("30.00"));
    assert_eq!(outcome.delta(), dec("-30.00"));
    assert_eq!(outcome.balance, dec("30.00"));
    assert_eq!(committed_balance(&store, id).await, dec("30.00"));
}

#[tokio::test]
async fn test_forced_win() {
    let (resolver, store, id) = setup_resolver("10.00", "19.99").await;

    let outcome = resolver.place_wager(id, dec("10.00")).await.unwrap();
    assert_eq!(outcome.result, WagerResult::Won);
    assert_eq!(outcome.magnitude, dec("19.99"));
    assert_eq!(outcome.balance, dec("29.99"));
    assert_eq!(committed_balance(&store, id).await, dec("29.99"));
}

#[tokio::test]
async fn test_full_stake_loss() {
    let (resolver, _store, id) = setup_resolver("5.00", "-5.00").await;

    let outcome = resolver.place_wager(id, dec("5.00")).await.unwrap();
    assert_eq!(outcome.result, WagerResult::Lost);
    assert_eq!(outcome.balance, Decimal::ZERO);
}

#[tokio::test]
async fn test_zero_outcome_applies_nothing() {
    let (resolver, store, id) = setup_resolver("8.00", "0").await;

    let outcome = resolver.place_wager(id, dec("2.00")).await.unwrap();
    assert_eq!(outcome.result, WagerResult::Won);
    assert_eq!(outcome.magnitude, Decimal::ZERO);
    assert_eq!(outcome.balance, dec("8.00"));
    assert_eq!(committed_balance(&store, id).await, dec("8.00"));
}

#[tokio::test]
async fn test_invalid_stake() {
    let (resolver, _store, id) = setup_resolver("8.00", "1").await;

    for stake in ["0", "-1", "0.001"] {
        assert!(matches!(
            resolver.place_wager(id, dec(stake)).await,
            Err(LedgerError::InvalidAmount(_))
        ));
    }
}

#[tokio::test]
async fn test_stake_above_balance_is_declined() {
    let (resolver, store, id) = setup_resolver("59.99", "50").await;

    let err = resolver.place_wager(id, dec("60.00")).await.unwrap_err();
    assert!(matches!(err, LedgerError::InsufficientFunds { .. }));
    assert_eq!(committed_balance(&store, id).await, dec("59.99"));
}

#[tokio::test]
async fn test_out_of_range_outcome_is_rejected() {
    for forced in ["-60.01", "120.00", "0.005"] {
        let (resolver, store, id) = setup_resolver("100.00", forced).await;

        let err = resolver.place_wager(id, dec("60.00")).await.unwrap_err();
        assert!(
            matches!(err, LedgerError::OutcomeOutOfRange { .. }),
            "forced {forced} gave {err:?}"
        );
        assert_eq!(committed_balance(&store, id).await, dec("100.00"));
    }
}

#[tokio::test]
async fn test_balance_drop_before_settlement_is_a_conflict() {
    let store = MemoryBalanceRepository::new();
    let account = store.seed_account(dec("10.00")).await;
    let stale = StaleReadRepository {
        inner: store.clone(),
        reported: dec("100.00"),
    };
    let resolver = WagerResolver::new(
        LedgerManager::new(Arc::new(stale)),
        Arc::new(FixedOutcome(dec("-40.00"))),
    );

    let err = resolver.place_wager(account.id, dec("50.00")).await.unwrap_err();
    assert!(matches!(
        err,
        LedgerError::SettlementConflict { available, required, .. }
            if available == dec("10.00") && required == dec("40.00")
    ));
    assert_eq!(committed_balance(&store, account.id).await, dec("10.00"));
}

#[tokio::test]
async fn test_unknown_account() {
    let (resolver, _store, _id) = setup_resolver("1", "1").await;

    assert!(matches!(
        resolver.place_wager(777, dec("1")).await,
        Err(LedgerError::AccountNotFound(777))
    ));
}

#[tokio::test]
async fn test_random_wagers_stay_in_bounds() {
    let store = MemoryBalanceRepository::new();
    let account = store.seed_account(dec("1000.00")).await;
    let resolver = WagerResolver::new(
        LedgerManager::new(Arc::new(store.clone())),
        Arc::new(UniformOutcome::from_seed(2024)),
    );

    let stake = dec("5.00");
    let mut expected = dec("1000.00");
    for _ in 0..100 {
        let outcome = resolver.place_wager(account.id, stake).await.unwrap();
        assert!(outcome.magnitude >= Decimal::ZERO);
        assert!(outcome.delta() >= -stake && outcome.delta() < stake * Decimal::TWO);
        expected += outcome.delta();
        assert_eq!(outcome.balance, expected);
    }
    assert_eq!(committed_balance(&store, account.id).await, expected);
}
