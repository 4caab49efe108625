//! Ledger behaviour under realistic sequences and contention.

use std::sync::Arc;

use ledger_core::{default_packs, find_pack, AccountId, LedgerError, Metadata, TransactionKind};
use ledger_service::{AdminContext, AdminOverride, InitPolicy, Ledger};
use ledger_store::MemoryStore;

fn ledger(policy: InitPolicy) -> Arc<Ledger> {
    Arc::new(Ledger::new(Arc::new(MemoryStore::new()), policy))
}

#[tokio::test]
async fn end_to_end_scenario() {
    let ledger = ledger(InitPolicy::Explicit);
    let admin = AdminOverride::new(Arc::clone(&ledger));
    let account = AccountId::generate();

    let init = ledger.initialize(&account, 50).await.unwrap();
    assert_eq!(init.account.balance, 50);

    let consume = ledger
        .consume(&account, 5, "analysis", Metadata::new())
        .await
        .unwrap();
    assert_eq!(consume.balance_after, 45);

    let packs = default_packs();
    let starter = find_pack(&packs, "starter").unwrap();
    let grant = ledger.purchase(&account, starter).await.unwrap();
    assert_eq!(grant.description, "purchase:starter");
    assert_eq!(grant.balance_after, 145);

    let set = admin
        .set_balance(&AdminContext::admin("ops"), &account, 200, "correction")
        .await
        .unwrap();
    assert_eq!(set.amount, 55);

    let history = ledger.history_of(&account, 10).await.unwrap();
    assert_eq!(
        history.iter().map(|r| r.kind).collect::<Vec<_>>(),
        vec![
            TransactionKind::AdminSet,
            TransactionKind::Grant,
            TransactionKind::Consume,
            TransactionKind::Initialize,
        ]
    );
    assert_eq!(
        history.iter().map(|r| r.balance_after).collect::<Vec<_>>(),
        vec![200, 145, 45, 50]
    );
    for pair in history.windows(2) {
        assert_eq!(pair[0].balance_before, pair[1].balance_after);
    }
    assert_eq!(ledger.balance_of(&account).await.unwrap(), 200);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_initialize_creates_one_record() {
    let ledger = ledger(InitPolicy::Explicit);
    let account = AccountId::generate();

    let attempts = (0..16).map(|_| {
        let ledger = Arc::clone(&ledger);
        tokio::spawn(async move { ledger.initialize(&account, 50).await })
    });
    let results = futures::future::join_all(attempts).await;

    let created = results
        .iter()
        .filter(|r| matches!(r, Ok(Ok(init)) if init.created()))
        .count();
    assert_eq!(created, 1);
    assert!(results
        .iter()
        .all(|r| matches!(r, Ok(Ok(init)) if init.account.balance == 50)));

    let history = ledger.history_of(&account, 100).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].kind, TransactionKind::Initialize);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_consume_on_exact_balance() {
    let ledger = ledger(InitPolicy::Explicit);
    let account = AccountId::generate();
    ledger.initialize(&account, 5).await.unwrap();

    let attempts = (0..2).map(|_| {
        let ledger = Arc::clone(&ledger);
        tokio::spawn(async move {
            ledger
                .consume(&account, 5, "analysis", Metadata::new())
                .await
        })
    });
    let results = futures::future::join_all(attempts).await;

    let successes = results.iter().filter(|r| matches!(r, Ok(Ok(_)))).count();
    let rejected = results
        .iter()
        .filter(|r| matches!(r, Ok(Err(LedgerError::InsufficientCredits { .. }))))
        .count();
    assert_eq!((successes, rejected), (1, 1));
    assert_eq!(ledger.balance_of(&account).await.unwrap(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn conservation_holds_under_mixed_contention() {
    let ledger = ledger(InitPolicy::default());
    let account = AccountId::generate();
    ledger.initialize(&account, 50).await.unwrap();

    let tasks = (0..40).map(|i| {
        let ledger = Arc::clone(&ledger);
        tokio::spawn(async move {
            if i % 4 == 0 {
                ledger
                    .grant(&account, 3, "bonus", Metadata::new())
                    .await
                    .map(|_| 0)
            } else {
                ledger
                    .consume(&account, 7, "analysis", Metadata::new())
                    .await
                    .map(|_| 7)
            }
        })
    });
    let results = futures::future::join_all(tasks).await;

    let consumed: i64 = results
        .iter()
        .filter_map(|r| match r {
            Ok(Ok(spent)) => Some(*spent),
            _ => None,
        })
        .sum();
    let granted = 50 + 3 * 10;
    assert!(consumed <= granted);

    let balance = ledger.balance_of(&account).await.unwrap();
    assert!(balance >= 0);
    assert_eq!(balance, granted - consumed);

    let report = ledger.audit(&account).await.unwrap();
    assert!(report.is_consistent(), "{report:?}");
    assert_eq!(report.replayed_balance, balance);
}
