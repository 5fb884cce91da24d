//! Behaviour shared by every storage backend.

use crate::common::{FakeLedger, Mining, new_payroll, payee_address, roster, signers};
use alloy::primitives::{B256, Bytes, U256};
use payroll::{
    error::{PayrollError, StorageError},
    payroll::RunSummary,
    storage::{PayrollStorage, StorageApi},
    types::{BatchId, NewPayee, PaymentId, PendingTransferRecord, Status},
};

fn sqlite_url(dir: &tempfile::TempDir) -> String {
    format!("sqlite://{}?mode=rwc", dir.path().join("payroll.db").display())
}

async fn sqlite(dir: &tempfile::TempDir) -> PayrollStorage {
    PayrollStorage::connect(&sqlite_url(dir)).await.unwrap()
}

async fn batch_fans_out_roster(storage: PayrollStorage) {
    let huge = U256::MAX - U256::from(1u64);
    roster(
        &storage,
        &[("alice", payee_address(1).to_string(), 100), ("bob", "not-an-address".into(), 200)],
    )
    .await;
    storage
        .write_payee(&NewPayee {
            name: "whale".into(),
            address: payee_address(3).to_string(),
            amount: huge,
        })
        .await
        .unwrap();

    let payees = storage.read_payees().await.unwrap();
    assert_eq!(payees.len(), 3);
    assert_eq!(payees[2].amount, huge);

    let id = storage.create_batch().await.unwrap();
    let batch = storage.read_batch(id).await.unwrap().unwrap();
    assert_eq!(batch.status, Status::Created);
    assert_eq!(storage.read_batches_by_status(Status::Created).await.unwrap(), vec![batch]);

    let payments = storage.read_payments(id).await.unwrap();
    assert_eq!(payments.len(), 3);
    for (payment, payee) in payments.iter().zip(&payees) {
        assert_eq!(payment.batch_id, id);
        assert_eq!(payment.payee_id, payee.id);
        assert_eq!(payment.amount, payee.amount);
        assert_eq!(payment.address, payee.address);
        assert_eq!(payment.status, Status::Created);
        assert!(payment.error.is_none());
        assert!(payment.pending.is_none());
    }

    assert!(storage.read_batch(BatchId(i64::MAX)).await.unwrap().is_none());
}

async fn statuses_never_move_backwards(storage: PayrollStorage) {
    roster(&storage, &[("alice", payee_address(1).to_string(), 100)]).await;
    let batch = storage.create_batch().await.unwrap();
    let payment = storage.read_payments(batch).await.unwrap()[0].id;

    storage.write_payment_status(payment, Status::Processing).await.unwrap();
    storage.write_payment_status(payment, Status::Processing).await.unwrap();
    assert_eq!(storage.read_outstanding_payments(batch).await.unwrap().len(), 1);

    storage.write_payment_status(payment, Status::Done).await.unwrap();
    assert!(storage.read_outstanding_payments(batch).await.unwrap().is_empty());

    for status in [Status::Created, Status::Processing] {
        let err = storage.write_payment_status(payment, status).await.unwrap_err();
        assert!(matches!(err, StorageError::InvalidTransition { .. }), "{err:?}");
    }
    assert_eq!(storage.read_payments(batch).await.unwrap()[0].status, Status::Done);

    storage.write_batch_status(batch, Status::Done).await.unwrap();
    let err = storage.write_batch_status(batch, Status::Created).await.unwrap_err();
    assert!(matches!(err, StorageError::InvalidTransition { .. }), "{err:?}");

    let err = storage.write_payment_status(PaymentId(i64::MAX), Status::Done).await.unwrap_err();
    assert!(matches!(err, StorageError::PaymentNotFound(_)), "{err:?}");
    let err = storage.write_batch_status(BatchId(i64::MAX), Status::Done).await.unwrap_err();
    assert!(matches!(err, StorageError::BatchNotFound(_)), "{err:?}");
}

async fn payment_notes_are_kept(storage: PayrollStorage) {
    roster(&storage, &[("alice", payee_address(1).to_string(), 100)]).await;
    let batch = storage.create_batch().await.unwrap();
    let payment = storage.read_payments(batch).await.unwrap()[0].id;

    let record = PendingTransferRecord {
        signer: signers(1)[0].address(),
        nonce: 7,
        tx_hash: B256::repeat_byte(0xab),
        raw: Bytes::from_static(&[0xf8, 0x6b, 0x07]),
    };
    storage.write_pending_transfer(payment, &record).await.unwrap();
    storage.write_payment_error(payment, Some("transfer rejected: nonce too low")).await.unwrap();

    let stored = storage.read_payments(batch).await.unwrap().remove(0);
    assert_eq!(stored.pending, Some(record));
    assert_eq!(stored.error.as_deref(), Some("transfer rejected: nonce too low"));

    storage.remove_pending_transfer(payment).await.unwrap();
    storage.write_payment_error(payment, None).await.unwrap();

    let stored = storage.read_payments(batch).await.unwrap().remove(0);
    assert!(stored.pending.is_none());
    assert!(stored.error.is_none());
}

async fn full_run(storage: PayrollStorage) {
    let ledger = FakeLedger::new(Mining::Instant);
    ledger.state().fund(signers(1)[0].address(), 1_000);
    roster(
        &storage,
        &[("alice", payee_address(1).to_string(), 100), ("bob", payee_address(2).to_string(), 200)],
    )
    .await;

    let payroll = new_payroll(&storage, &ledger, 1);
    let summary = payroll.pay().await.unwrap();
    assert_eq!(summary, RunSummary { batches: 1, paid: 2, failed: 0, skipped: 0 });
    assert_eq!(payroll.repay().await.unwrap(), RunSummary::default());

    let done = storage.read_batches_by_status(Status::Done).await.unwrap();
    assert_eq!(done.len(), 1);
    for payment in storage.read_payments(done[0].id).await.unwrap() {
        assert_eq!(payment.status, Status::Done);
        assert!(payment.pending.is_none());
    }
    assert_eq!(ledger.state().transfers.len(), 2);
}

#[tokio::test]
async fn in_memory_batch_fans_out_roster() {
    batch_fans_out_roster(PayrollStorage::in_memory()).await;
}

#[tokio::test]
async fn sqlite_batch_fans_out_roster() {
    let dir = tempfile::tempdir().unwrap();
    batch_fans_out_roster(sqlite(&dir).await).await;
}

#[tokio::test]
async fn in_memory_statuses_never_move_backwards() {
    statuses_never_move_backwards(PayrollStorage::in_memory()).await;
}

#[tokio::test]
async fn sqlite_statuses_never_move_backwards() {
    let dir = tempfile::tempdir().unwrap();
    statuses_never_move_backwards(sqlite(&dir).await).await;
}

#[tokio::test]
async fn in_memory_payment_notes_are_kept() {
    payment_notes_are_kept(PayrollStorage::in_memory()).await;
}

#[tokio::test]
async fn sqlite_payment_notes_are_kept() {
    let dir = tempfile::tempdir().unwrap();
    payment_notes_are_kept(sqlite(&dir).await).await;
}

#[tokio::test]
async fn in_memory_full_run() {
    full_run(PayrollStorage::in_memory()).await;
}

#[tokio::test]
async fn sqlite_full_run() {
    let dir = tempfile::tempdir().unwrap();
    full_run(sqlite(&dir).await).await;
}

#[tokio::test]
async fn sqlite_state_survives_reconnect() {
    let dir = tempfile::tempdir().unwrap();
    let storage = sqlite(&dir).await;
    roster(&storage, &[("alice", payee_address(1).to_string(), 100)]).await;
    let batch = storage.create_batch().await.unwrap();
    storage.write_batch_status(batch, Status::Processing).await.unwrap();
    drop(storage);

    let storage = sqlite(&dir).await;
    let batches = storage.read_batches_by_status(Status::Processing).await.unwrap();
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].id, batch);
    assert_eq!(storage.read_payments(batch).await.unwrap().len(), 1);
}

#[tokio::test]
async fn failed_status_write_aborts_run() {
    let dir = tempfile::tempdir().unwrap();
    let storage = sqlite(&dir).await;
    let ledger = FakeLedger::new(Mining::Instant);
    ledger.state().fund(signers(1)[0].address(), 1_000);
    roster(
        &storage,
        &[("alice", payee_address(1).to_string(), 100), ("bob", payee_address(2).to_string(), 200)],
    )
    .await;

    // completing a payment fails while earlier writes still go through
    let pool = sqlx::SqlitePool::connect(&sqlite_url(&dir)).await.unwrap();
    sqlx::query(
        "CREATE TRIGGER fail_done BEFORE UPDATE OF status ON payments \
         WHEN NEW.status = 'done' BEGIN SELECT RAISE(ABORT, 'disk I/O error'); END",
    )
    .execute(&pool)
    .await
    .unwrap();

    let err = new_payroll(&storage, &ledger, 1).pay().await.unwrap_err();
    assert!(matches!(err, PayrollError::StoreUnavailable(_)), "{err:?}");

    let state = ledger.state();
    assert_eq!(state.accepted.len(), 1);
    assert_eq!(state.transfers_to(payee_address(1)), 1);
    assert_eq!(state.transfers_to(payee_address(2)), 0);
    drop(state);

    let batches = storage.read_batches_by_status(Status::Processing).await.unwrap();
    assert_eq!(batches.len(), 1);
    let payments = storage.read_payments(batches[0].id).await.unwrap();
    assert_eq!(payments[0].status, Status::Processing);
    assert!(payments[0].pending.is_some());
    assert_eq!(payments[1].status, Status::Created);
}
