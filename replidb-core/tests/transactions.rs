//! Transactional writes: commit, rollback on error, panic and cancellation.

mod common;

use std::panic::AssertUnwindSafe;

use common::{count_items, Cluster};
use futures::FutureExt;
use replidb_core::{CancellationToken, ConnectionSet, Error};
use sqlx::Sqlite;

const INSERT: &str = "INSERT INTO items (label) VALUES (?)";

fn explode() {
    panic!("unit of work exploded");
}

async fn open(cluster: &Cluster) -> ConnectionSet<Sqlite> {
    ConnectionSet::<Sqlite>::open(&cluster.topology())
        .await
        .unwrap()
}

#[tokio::test]
async fn successful_unit_of_work_commits() {
    let cluster = Cluster::new(1).await;
    let db = open(&cluster).await;
    let cancel = CancellationToken::new();

    let inserted = db
        .write_transactional(&cancel, |tx| {
            Box::pin(async move {
                let mut n = 0;
                for label in ["a", "b", "c"] {
                    n += sqlx::query(INSERT)
                        .bind(label)
                        .execute(&mut **tx)
                        .await?
                        .rows_affected();
                }
                Ok::<_, Error>(n)
            })
        })
        .await
        .unwrap();

    assert_eq!(inserted, 3);
    assert_eq!(count_items(&cluster.primary).await, 3);
    assert_eq!(count_items(&cluster.replicas[0]).await, 0);
    db.close().await.unwrap();
}

#[tokio::test]
async fn failing_unit_of_work_rolls_back_and_returns_its_error() {
    let cluster = Cluster::new(0).await;
    let db = open(&cluster).await;
    let cancel = CancellationToken::new();

    let err = db
        .write_transactional(&cancel, |tx| {
            Box::pin(async move {
                sqlx::query(INSERT).bind("kept?").execute(&mut **tx).await?;
                // Violates the UNIQUE constraint on label.
                sqlx::query(INSERT).bind("kept?").execute(&mut **tx).await?;
                Ok::<_, Error>(())
            })
        })
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Statement(sqlx::Error::Database(_))));
    assert_eq!(count_items(&cluster.primary).await, 0);
    db.close().await.unwrap();
}

#[tokio::test]
async fn domain_error_from_unit_of_work_is_returned_unchanged() {
    let cluster = Cluster::new(0).await;
    let db = open(&cluster).await;
    let cancel = CancellationToken::new();

    let err = db
        .write_transactional(&cancel, |tx| {
            Box::pin(async move {
                sqlx::query(INSERT).bind("x").execute(&mut **tx).await?;
                Err::<(), _>(Error::topology("refused by unit of work"))
            })
        })
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "invalid topology: refused by unit of work");
    assert_eq!(count_items(&cluster.primary).await, 0);
    db.close().await.unwrap();
}

#[tokio::test]
async fn panicking_unit_of_work_rolls_back_then_panic_propagates() {
    let cluster = Cluster::new(0).await;
    let db = open(&cluster).await;
    let cancel = CancellationToken::new();

    let outcome = AssertUnwindSafe(db.write_transactional(&cancel, |tx| {
        Box::pin(async move {
            sqlx::query(INSERT).bind("doomed").execute(&mut **tx).await?;
            explode();
            Ok::<_, Error>(())
        })
    }))
    .catch_unwind()
    .await;

    let payload = outcome.expect_err("panic must reach the caller");
    assert_eq!(
        payload.downcast_ref::<&str>().copied(),
        Some("unit of work exploded")
    );
    assert_eq!(count_items(&cluster.primary).await, 0);

    // The primary is still usable afterwards.
    db.write(&cancel, sqlx::query(INSERT).bind("after"))
        .await
        .unwrap();
    assert_eq!(count_items(&cluster.primary).await, 1);
    db.close().await.unwrap();
}

#[tokio::test]
async fn cancellation_mid_transaction_rolls_back() {
    let cluster = Cluster::new(0).await;
    let db = open(&cluster).await;
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();

    let err = db
        .write_transactional(&cancel, move |tx| {
            Box::pin(async move {
                sqlx::query(INSERT).bind("abandoned").execute(&mut **tx).await?;
                trigger.cancel();
                std::future::pending::<()>().await;
                Ok::<_, Error>(())
            })
        })
        .await
        .unwrap_err();

    assert!(err.is_cancelled());
    assert_eq!(count_items(&cluster.primary).await, 0);
    db.close().await.unwrap();
}

#[tokio::test]
async fn fired_token_prevents_transaction_from_starting() {
    let cluster = Cluster::new(0).await;
    let db = open(&cluster).await;
    let cancel = CancellationToken::new();
    cancel.cancel();

    let result = db
        .write_transactional(&cancel, |tx| {
            Box::pin(async move {
                sqlx::query(INSERT).bind("never").execute(&mut **tx).await?;
                Ok::<_, Error>(())
            })
        })
        .await;

    assert!(matches!(result, Err(Error::Cancelled)));
    assert_eq!(count_items(&cluster.primary).await, 0);
    db.close().await.unwrap();
}
