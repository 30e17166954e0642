//! Executor tests against PostgreSQL.
//!
//! Skipped unless DATABASE_URL points at a PostgreSQL server. Every test
//! works inside a transaction on a temporary table and rolls it back.

use chrono::{DateTime, Utc};
use hsql::config::ConnectionConfig;
use hsql::db::{DatabaseBackend, PostgresClient, PostgresTransaction};
use hsql::{fetch_all, fetch_one, tx_fetch_all, tx_fetch_one};
use hsql::{Context, Database, DecodeError, HsqlError, Transaction, Value};
use pretty_assertions::assert_eq;

hsql::record! {
    #[derive(Debug, Default, Clone, PartialEq)]
    pub struct UserInfo {
        pub id: i64 as "id",
        pub name: String as "name",
        pub front_cover: String,
        pub balance: i64,
        pub created_at: Option<DateTime<Utc>>,
    }
}

/// Helper to create a test client.
async fn get_test_client() -> Option<PostgresClient> {
    let config = ConnectionConfig::from_env().ok()??;
    if config.backend != DatabaseBackend::Postgres {
        return None;
    }
    PostgresClient::connect(&config).await.ok()
}

async fn seeded_transaction(client: &PostgresClient) -> PostgresTransaction {
    let mut tx = client.begin_transaction().await.unwrap();
    tx.execute(
        "CREATE TEMP TABLE hsql_users (
            id BIGINT PRIMARY KEY,
            name TEXT NOT NULL,
            front_cover TEXT NOT NULL DEFAULT '',
            balance BIGINT NOT NULL DEFAULT 0,
            created_at TIMESTAMPTZ
        ) ON COMMIT DROP",
        &[],
    )
    .await
    .unwrap();
    tx.execute(
        "INSERT INTO hsql_users (id, name, front_cover, balance, created_at) VALUES
            (1, 'ada', 'ada.png', 120, '2024-01-02T03:04:05Z'),
            (2, 'grace', 'grace.png', 75, NULL)",
        &[],
    )
    .await
    .unwrap();
    tx
}

#[tokio::test]
async fn test_fetch_one_plain_handle() {
    let Some(client) = get_test_client().await else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };
    let ctx = Context::background();

    let mut user = UserInfo::default();
    fetch_one(
        &ctx,
        &client,
        &mut user,
        "SELECT $1::int8 AS id, 'ada'::text AS name, 'x.png'::text AS \"frontCover\"",
        &[Value::Int(7)],
    )
    .await
    .unwrap();

    assert_eq!(user.id, 7);
    assert_eq!(user.name, "ada");
    assert_eq!(user.front_cover, "x.png");
    client.close().await.unwrap();
}

#[tokio::test]
async fn test_fetch_all_plain_handle_empty() {
    let Some(client) = get_test_client().await else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };
    let ctx = Context::background();

    let mut users: Vec<UserInfo> = Vec::new();
    fetch_all(
        &ctx,
        &client,
        &mut users,
        "SELECT 1::int8 AS id WHERE false",
        &[],
    )
    .await
    .unwrap();

    assert!(users.is_empty());
    client.close().await.unwrap();
}

#[tokio::test]
async fn test_transaction_fetches() {
    let Some(client) = get_test_client().await else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };
    let ctx = Context::background();
    let mut tx = seeded_transaction(&client).await;

    let mut users: Vec<UserInfo> = Vec::new();
    tx_fetch_all(
        &ctx,
        &mut tx,
        &mut users,
        "SELECT * FROM hsql_users ORDER BY id",
        &[],
    )
    .await
    .unwrap();
    assert_eq!(users.len(), 2);
    assert_eq!(users[0].front_cover, "ada.png");
    assert!(users[0].created_at.is_some());
    assert_eq!(users[1].created_at, None);

    let mut user = UserInfo::default();
    tx_fetch_one(
        &ctx,
        &mut tx,
        &mut user,
        "SELECT * FROM hsql_users WHERE id = $1",
        &[Value::Int(2)],
    )
    .await
    .unwrap();
    assert_eq!(user.name, "grace");
    assert_eq!(user.balance, 75);

    let err = tx_fetch_one(
        &ctx,
        &mut tx,
        &mut user,
        "SELECT * FROM hsql_users WHERE id = $1",
        &[Value::Int(99)],
    )
    .await
    .unwrap_err();
    assert!(err.is_no_rows());
    assert_eq!(user.name, "grace");

    tx.rollback().await.unwrap();
    client.close().await.unwrap();
}

#[tokio::test]
async fn test_database_error_is_verbatim() {
    let Some(client) = get_test_client().await else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };
    let ctx = Context::background();

    let mut users: Vec<UserInfo> = Vec::new();
    let err = fetch_all(
        &ctx,
        &client,
        &mut users,
        "SELECT * FROM nonexistent_table_xyz",
        &[],
    )
    .await
    .unwrap_err();

    assert!(matches!(err, HsqlError::Database(_)));
    assert!(err.to_string().contains("nonexistent_table_xyz"));
    client.close().await.unwrap();
}

hsql::record! {
    #[derive(Debug, Default, Clone, PartialEq)]
    pub struct Item {
        pub price: Option<String>,
        pub amount: f64,
        pub uid: Option<String>,
        pub day: Option<String>,
        pub at: Option<String>,
        pub doc: Option<String>,
        pub span: Option<String>,
    }
}

#[tokio::test]
async fn test_text_carried_types_keep_their_values() {
    let Some(client) = get_test_client().await else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };
    let ctx = Context::background();

    let mut item = Item::default();
    fetch_one(
        &ctx,
        &client,
        &mut item,
        "SELECT 12.50::numeric AS price,
                3.25::numeric AS amount,
                '550e8400-e29b-41d4-a716-446655440000'::uuid AS uid,
                DATE '2024-01-02' AS day,
                TIME '03:04:05' AS at,
                '{\"a\": 1}'::jsonb AS doc,
                INTERVAL '1 month 2 days 3 seconds' AS span",
        &[],
    )
    .await
    .unwrap();

    assert!(item.price.as_deref().unwrap().starts_with("12.5"));
    assert_eq!(item.amount, 3.25);
    assert_eq!(
        item.uid.as_deref(),
        Some("550e8400-e29b-41d4-a716-446655440000")
    );
    assert_eq!(item.day.as_deref(), Some("2024-01-02"));
    assert_eq!(item.at.as_deref(), Some("03:04:05"));
    assert_eq!(item.doc.as_deref(), Some("{\"a\":1}"));
    assert_eq!(item.span.as_deref(), Some("P1M2DT3S"));
    client.close().await.unwrap();
}

#[tokio::test]
async fn test_numeric_into_required_string() {
    let Some(client) = get_test_client().await else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };
    let ctx = Context::background();

    hsql::record! {
        #[derive(Debug, Default)]
        struct Price {
            price: String,
        }
    }

    let mut price = Price::default();
    fetch_one(&ctx, &client, &mut price, "SELECT 12.50::numeric AS price", &[])
        .await
        .unwrap();
    assert!(price.price.starts_with("12.5"));
    client.close().await.unwrap();
}

#[tokio::test]
async fn test_unreadable_type_names_column() {
    let Some(client) = get_test_client().await else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };
    let ctx = Context::background();

    let mut items: Vec<Item> = Vec::new();
    let err = fetch_all(
        &ctx,
        &client,
        &mut items,
        "SELECT point(1, 2) AS location",
        &[],
    )
    .await
    .unwrap_err();

    match err {
        HsqlError::Scan { column, source } => {
            assert_eq!(column, "location");
            assert_eq!(
                source,
                DecodeError::UnsupportedType {
                    type_name: "POINT".to_string()
                }
            );
        }
        other => panic!("unexpected error: {other:?}"),
    }
    client.close().await.unwrap();
}
