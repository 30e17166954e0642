//! Executor tests against an in-memory SQLite database.

use chrono::{DateTime, TimeZone, Utc};
use hsql::config::ConnectionConfig;
use hsql::db::SqliteClient;
use hsql::{fetch_all, fetch_one, tx_fetch_all, tx_fetch_one};
use hsql::{Context, Destination, HsqlError, Transaction, Value};
use pretty_assertions::assert_eq;

hsql::record! {
    #[derive(Debug, Default, Clone, PartialEq)]
    pub struct UserInfo {
        pub id: i64 as "id",
        pub name: String as "name",
        pub phone: String as "phone",
        pub front_cover: String as "front_cover",
        pub address: String as "address",
        pub balance: i64 as "balance",
        pub created_at: DateTime<Utc> as "created_at",
        pub updated_at: Option<DateTime<Utc>> as "updated_at",
    }
}

hsql::record! {
    #[derive(Debug, Default, Clone, PartialEq)]
    pub struct Profile {
        pub user_id: i64,
        pub front_cover: String,
        pub balance: Option<i64>,
    }
}

const SCHEMA: &str = "CREATE TABLE users (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    phone TEXT NOT NULL DEFAULT '',
    front_cover TEXT NOT NULL DEFAULT '',
    address TEXT NOT NULL DEFAULT '',
    balance INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,
    updated_at TEXT
)";

const SEED: &str = "INSERT INTO users (id, name, phone, front_cover, address, balance, created_at, updated_at) VALUES
    (1, 'ada', '555-0100', 'ada.png', 'London', 120, '2024-01-02 03:04:05', NULL),
    (2, 'grace', '555-0101', 'grace.png', 'Arlington', 75, '2024-02-03 04:05:06', '2024-03-01 00:00:00'),
    (3, 'edsger', '555-0102', '', 'Austin', 0, '2024-03-04 05:06:07', NULL)";

async fn seeded_client() -> SqliteClient {
    let config = ConnectionConfig::from_connection_string("sqlite::memory:").unwrap();
    let client = SqliteClient::connect(&config).await.unwrap();
    sqlx::query(SCHEMA).execute(client.pool()).await.unwrap();
    sqlx::query(SEED).execute(client.pool()).await.unwrap();
    client
}

fn ts(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
}

#[tokio::test]
async fn test_fetch_one_by_id() {
    let client = seeded_client().await;
    let ctx = Context::background();

    let mut user = UserInfo::default();
    fetch_one(
        &ctx,
        &client,
        &mut user,
        "SELECT * FROM users WHERE id = ?",
        &[Value::Int(2)],
    )
    .await
    .unwrap();

    assert_eq!(
        user,
        UserInfo {
            id: 2,
            name: "grace".to_string(),
            phone: "555-0101".to_string(),
            front_cover: "grace.png".to_string(),
            address: "Arlington".to_string(),
            balance: 75,
            created_at: ts(2024, 2, 3, 4, 5, 6),
            updated_at: Some(ts(2024, 3, 1, 0, 0, 0)),
        }
    );
}

#[tokio::test]
async fn test_fetch_one_missing_row() {
    let client = seeded_client().await;
    let ctx = Context::background();

    let mut user = UserInfo {
        id: 99,
        ..UserInfo::default()
    };
    let err = fetch_one(
        &ctx,
        &client,
        &mut user,
        "SELECT * FROM users WHERE id = ?",
        &[Value::Int(42)],
    )
    .await
    .unwrap_err();

    assert!(err.is_no_rows());
    assert_eq!(user.id, 99);
}

#[tokio::test]
async fn test_fetch_one_takes_first_of_many() {
    let client = seeded_client().await;
    let ctx = Context::background();

    let mut user = UserInfo::default();
    fetch_one(&ctx, &client, &mut user, "SELECT * FROM users ORDER BY id DESC", &[])
        .await
        .unwrap();

    assert_eq!(user.name, "edsger");
}

#[tokio::test]
async fn test_fetch_all_in_order() {
    let client = seeded_client().await;
    let ctx = Context::background();

    let mut users: Vec<UserInfo> = Vec::new();
    fetch_all(
        &ctx,
        &client,
        &mut users,
        "SELECT * FROM users WHERE id < ? ORDER BY id",
        &[Value::Int(3)],
    )
    .await
    .unwrap();

    let names: Vec<&str> = users.iter().map(|u| u.name.as_str()).collect();
    assert_eq!(names, vec!["ada", "grace"]);
    assert_eq!(users[0].created_at, ts(2024, 1, 2, 3, 4, 5));
    assert_eq!(users[0].updated_at, None);
}

#[tokio::test]
async fn test_fetch_all_boxed() {
    let client = seeded_client().await;
    let ctx = Context::background();

    let mut users: Vec<Box<UserInfo>> = Vec::new();
    fetch_all(
        &ctx,
        &client,
        Destination::ManyBoxed(&mut users),
        "SELECT * FROM users ORDER BY id",
        &[],
    )
    .await
    .unwrap();

    assert_eq!(users.len(), 3);
    assert_eq!(users[2].address, "Austin");
}

#[tokio::test]
async fn test_fetch_all_empty_result() {
    let client = seeded_client().await;
    let ctx = Context::background();

    let mut users = vec![UserInfo::default()];
    fetch_all(
        &ctx,
        &client,
        &mut users,
        "SELECT * FROM users WHERE balance > ?",
        &[Value::Int(1_000)],
    )
    .await
    .unwrap();

    assert!(users.is_empty());
}

#[tokio::test]
async fn test_column_names_are_normalized() {
    let client = seeded_client().await;
    let ctx = Context::background();

    let mut profiles: Vec<Profile> = Vec::new();
    fetch_all(
        &ctx,
        &client,
        &mut profiles,
        "SELECT id AS userID, front_cover AS frontCover, balance AS BALANCE, phone AS unused \
         FROM users ORDER BY id LIMIT 2",
        &[],
    )
    .await
    .unwrap();

    assert_eq!(
        profiles,
        vec![
            Profile {
                user_id: 1,
                front_cover: "ada.png".to_string(),
                balance: Some(120),
            },
            Profile {
                user_id: 2,
                front_cover: "grace.png".to_string(),
                balance: Some(75),
            },
        ]
    );
}

#[tokio::test]
async fn test_partial_projection_keeps_defaults() {
    let client = seeded_client().await;
    let ctx = Context::background();

    let mut user = UserInfo::default();
    fetch_one(&ctx, &client, &mut user, "SELECT id, name FROM users WHERE id = 1", &[])
        .await
        .unwrap();

    assert_eq!(user.id, 1);
    assert_eq!(user.name, "ada");
    assert_eq!(user.balance, 0);
    assert_eq!(user.updated_at, None);
}

#[tokio::test]
async fn test_database_error_is_verbatim() {
    let client = seeded_client().await;
    let ctx = Context::background();

    let mut users: Vec<UserInfo> = Vec::new();
    let err = fetch_all(&ctx, &client, &mut users, "SELECT * FROM no_such_table", &[])
        .await
        .unwrap_err();

    match err {
        HsqlError::Database(e) => assert!(e.to_string().contains("no_such_table")),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_scan_error_names_column() {
    let client = seeded_client().await;
    let ctx = Context::background();

    let mut user = UserInfo::default();
    let err = fetch_one(&ctx, &client, &mut user, "SELECT name AS balance FROM users", &[])
        .await
        .unwrap_err();

    assert!(matches!(err, HsqlError::Scan { ref column, .. } if column == "balance"));
}

#[tokio::test]
async fn test_transaction_sees_its_own_writes() {
    let client = seeded_client().await;
    let ctx = Context::background();

    let mut tx = client.begin_transaction().await.unwrap();
    tx.execute(
        "INSERT INTO users (id, name, created_at) VALUES (?, ?, ?)",
        &[
            Value::Int(4),
            Value::from("barbara"),
            Value::from("2024-04-05 06:07:08"),
        ],
    )
    .await
    .unwrap();

    let mut user = UserInfo::default();
    tx_fetch_one(
        &ctx,
        &mut tx,
        &mut user,
        "SELECT * FROM users WHERE id = ?",
        &[Value::Int(4)],
    )
    .await
    .unwrap();
    assert_eq!(user.name, "barbara");
    assert_eq!(user.created_at, ts(2024, 4, 5, 6, 7, 8));

    let mut users: Vec<UserInfo> = Vec::new();
    tx_fetch_all(&ctx, &mut tx, &mut users, "SELECT * FROM users ORDER BY id", &[])
        .await
        .unwrap();
    assert_eq!(users.len(), 4);

    tx.rollback().await.unwrap();

    let mut users: Vec<UserInfo> = Vec::new();
    fetch_all(&ctx, &client, &mut users, "SELECT * FROM users", &[])
        .await
        .unwrap();
    assert_eq!(users.len(), 3);
}

#[tokio::test]
async fn test_transaction_no_rows() {
    let client = seeded_client().await;
    let ctx = Context::background();
    let mut tx = client.begin_transaction().await.unwrap();

    let mut user = UserInfo::default();
    let err = tx_fetch_one(
        &ctx,
        &mut tx,
        &mut user,
        "SELECT * FROM users WHERE id = ?",
        &[Value::Int(7)],
    )
    .await
    .unwrap_err();

    assert!(matches!(err, HsqlError::NoRows));
    tx.commit().await.unwrap();
}

#[tokio::test]
async fn test_cancelled_context_stops_query() {
    let client = seeded_client().await;
    let ctx = Context::background();
    ctx.cancel();

    let mut users: Vec<UserInfo> = Vec::new();
    let err = fetch_all(&ctx, &client, &mut users, "SELECT * FROM users", &[])
        .await
        .unwrap_err();

    assert!(matches!(err, HsqlError::Cancelled));
}
