//! Runs against a real PostgreSQL server.
//!
//! Every test is skipped when `DATABASE_URL` is not set.

use easql::prelude::*;
use easql::builder::Param;
use easql::{DriverError, PgTx};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

type TestResult = Result<(), Box<dyn std::error::Error>>;

#[derive(Debug, PartialEq, FromRow)]
struct Item {
    id: i64,
    #[easql(column = "label")]
    name: String,
    note: Option<String>,
    #[easql(default)]
    tags: Vec<String>,
}

fn connect(test: &str, max_size: usize) -> Option<Db> {
    dotenvy::dotenv().ok();
    let database_url = match std::env::var("DATABASE_URL") {
        Ok(v) => v,
        Err(_) => {
            eprintln!("DATABASE_URL is not set; skipping {test}");
            return None;
        }
    };
    let config = DbConfig::new(database_url).max_size(max_size);
    Some(Db::connect(&config).expect("valid DATABASE_URL"))
}

async fn create_table(db: &Db, prefix: &str) -> Result<String, DriverError> {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock before UNIX_EPOCH")
        .as_nanos();
    let table = format!("{prefix}_{}_{nanos}", std::process::id());
    let conn = db.raw().get().await?;
    conn.batch_execute(&format!(
        "CREATE TABLE {table} (id BIGINT PRIMARY KEY, label TEXT NOT NULL, note TEXT)"
    ))
    .await?;
    Ok(table)
}

async fn drop_table(db: &Db, table: &str) -> Result<(), DriverError> {
    let conn = db.raw().get().await?;
    conn.batch_execute(&format!("DROP TABLE IF EXISTS {table}"))
        .await?;
    Ok(())
}

async fn count(db: &Db, table: &str) -> EasqlResult<i64> {
    db.get(builder::select(table).columns(&["COUNT(*)"])).await
}

#[tokio::test]
async fn rows_map_into_scalars_tuples_and_derived_structs() -> TestResult {
    let Some(db) = connect("rows_map_into_scalars_tuples_and_derived_structs", 4) else {
        return Ok(());
    };
    let table = create_table(&db, "easql_map").await?;

    db.insert(builder::insert(&table).set("id", 7i64).set("label", "x"))
        .await?;
    db.insert(
        builder::insert(&table)
            .columns(&["id", "label", "note"])
            .values(vec![Param::new(8i64), Param::new("y"), Param::new("n")]),
    )
    .await?;

    let item: Item = db
        .get(
            builder::select(&table)
                .columns(&["id", "label", "note"])
                .eq("id", 7i64),
        )
        .await?;
    assert_eq!(
        item,
        Item {
            id: 7,
            name: "x".to_string(),
            note: None,
            tags: Vec::new(),
        }
    );

    let pairs: Vec<(i64, String)> = db
        .select(builder::select(&table).columns(&["id", "label"]).order_by("id"))
        .await?;
    assert_eq!(pairs, vec![(7, "x".to_string()), (8, "y".to_string())]);

    let missing = db
        .get::<i64>(builder::select(&table).columns(&["id"]).eq("id", 99i64))
        .await
        .unwrap_err();
    assert!(missing.is_not_found());

    let none: Vec<i64> = db
        .select(builder::select(&table).columns(&["id"]).gt("id", 100i64))
        .await?;
    assert!(none.is_empty());

    drop_table(&db, &table).await?;
    Ok(())
}

#[tokio::test]
async fn transaction_commit_rollback_and_drop() -> TestResult {
    let Some(db) = connect("transaction_commit_rollback_and_drop", 4) else {
        return Ok(());
    };
    let table = create_table(&db, "easql_tx").await?;

    let tx = db.begin().await?;
    tx.insert(builder::insert(&table).set("id", 1i64).set("label", "kept"))
        .await?;
    tx.commit().await?;
    assert_eq!(count(&db, &table).await?, 1);

    let tx = db.begin().await?;
    tx.insert(builder::insert(&table).set("id", 2i64).set("label", "undone"))
        .await?;
    tx.rollback().await?;
    assert_eq!(count(&db, &table).await?, 1);

    {
        let tx: Tx<PgTx> = db.begin().await?;
        tx.insert(builder::insert(&table).set("id", 3i64).set("label", "dropped"))
            .await?;
        assert!(tx.raw().is_open());
    }
    assert_eq!(count(&db, &table).await?, 1);

    drop_table(&db, &table).await?;
    Ok(())
}

#[tokio::test]
async fn finished_transaction_refuses_statements() -> TestResult {
    let Some(db) = connect("finished_transaction_refuses_statements", 4) else {
        return Ok(());
    };
    let table = create_table(&db, "easql_done").await?;

    let tx = db.begin().await?;
    tx.commit().await?;
    assert!(!tx.raw().is_open());

    let err = tx
        .insert(builder::insert(&table).set("id", 1i64).set("label", "late"))
        .await
        .unwrap_err();
    assert!(err.is_tx_done());
    assert!(tx.rollback().await.unwrap_err().is_tx_done());
    assert!(tx.commit().await.unwrap_err().is_tx_done());
    assert_eq!(count(&db, &table).await?, 0);

    let tx = db.begin().await?;
    tx.rollback().await?;
    assert!(tx.commit().await.unwrap_err().is_tx_done());

    drop_table(&db, &table).await?;
    Ok(())
}

#[tokio::test]
async fn pool_statement_is_cancelled_on_the_server() -> TestResult {
    let Some(db) = connect("pool_statement_is_cancelled_on_the_server", 1) else {
        return Ok(());
    };

    let ctx = Context::background().with_timeout(Duration::from_millis(200));
    let err = db
        .select_context::<i32>(&ctx, builder::select("pg_sleep(3)").columns(&["1"]))
        .await
        .unwrap_err();
    assert!(err.is_deadline_exceeded());

    // the single pooled connection must not be stuck behind the sleep
    let started = Instant::now();
    let one: i32 = db
        .get(builder::select("pg_sleep(0)").columns(&["1"]))
        .await?;
    assert_eq!(one, 1);
    assert!(
        started.elapsed() < Duration::from_secs(2),
        "next query waited {:?}",
        started.elapsed()
    );
    Ok(())
}

#[tokio::test]
async fn transaction_statement_is_cancelled_on_the_server() -> TestResult {
    let Some(db) = connect("transaction_statement_is_cancelled_on_the_server", 2) else {
        return Ok(());
    };

    let tx = db.begin().await?;
    let (ctx, token) = Context::with_cancel();
    let canceller = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        token.cancel();
    });

    let err = tx
        .get_context::<i32>(&ctx, builder::select("pg_sleep(3)").columns(&["1"]))
        .await
        .unwrap_err();
    assert!(err.is_cancelled());
    canceller.await?;

    let started = Instant::now();
    tx.rollback().await?;
    assert!(started.elapsed() < Duration::from_secs(2));
    Ok(())
}
