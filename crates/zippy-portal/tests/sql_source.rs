use std::time::Duration;

use secrecy::SecretString;
use sqlx::SqlitePool;
use tempfile::TempDir;
use zippy_portal::applicants::{ApplicantSource, LoadError, SqlApplicantSource};
use zippy_portal::config::{DatabaseConfig, DatabaseConnection, DEFAULT_APPLICANT_TABLE};

async fn seeded_database(create: &str, inserts: &[&str]) -> (TempDir, String) {
    let dir = tempfile::tempdir().expect("temp dir");
    let url = format!("sqlite://{}", dir.path().join("portal.db").display());

    let pool = SqlitePool::connect(&format!("{url}?mode=rwc"))
        .await
        .expect("sqlite opens");
    sqlx::query(create).execute(&pool).await.expect("table created");
    for insert in inserts {
        sqlx::query(insert).execute(&pool).await.expect("row inserted");
    }
    pool.close().await;

    (dir, url)
}

fn source(url: &str) -> SqlApplicantSource {
    SqlApplicantSource::new(DatabaseConfig {
        connection: Some(DatabaseConnection::Url(SecretString::from(url.to_string()))),
        table: DEFAULT_APPLICANT_TABLE.to_string(),
        acquire_timeout: Duration::from_secs(5),
    })
}

#[tokio::test]
async fn loads_typed_records_and_passes_extra_columns_through() {
    let (_dir, url) = seeded_database(
        "CREATE TABLE zippy_applicants (id INTEGER, state TEXT, city TEXT, zipcode TEXT, naics_code INTEGER, zone_result TEXT)",
        &[
            "INSERT INTO zippy_applicants VALUES (1, 'CA', 'Oakland', '94612', 541511, 'EZ1')",
            "INSERT INTO zippy_applicants VALUES (2, 'NY', NULL, NULL, 722511, 'N/A')",
        ],
    )
    .await;

    let dataset = source(&url).load().await.expect("dataset loads");
    assert_eq!(
        dataset.columns(),
        ["id", "state", "city", "zipcode", "naics_code", "zone_result"]
    );
    assert_eq!(dataset.len(), 2);

    let first = &dataset.records()[0];
    assert_eq!(first.naics_code, "541511");
    assert_eq!(first.field("id"), Some("1"));
    assert!(first.is_zone_hit());

    let second = &dataset.records()[1];
    assert_eq!(second.city, None);
    assert_eq!(second.zipcode, None);
    assert!(!second.is_zone_hit());
}

#[tokio::test]
async fn missing_columns_are_a_schema_mismatch() {
    let (_dir, url) = seeded_database(
        "CREATE TABLE zippy_applicants (state TEXT, city TEXT, naics_code TEXT)",
        &["INSERT INTO zippy_applicants VALUES ('CA', 'Oakland', '541511')"],
    )
    .await;

    let err = source(&url).load().await.expect_err("schema rejected");
    match err {
        LoadError::SchemaMismatch { missing } => {
            assert_eq!(missing, vec!["zipcode", "zone_result"]);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn empty_table_is_still_schema_checked() {
    let (_dir, url) = seeded_database(
        "CREATE TABLE zippy_applicants (state TEXT, city TEXT, zipcode TEXT, naics_code TEXT)",
        &[],
    )
    .await;

    let err = source(&url).load().await.expect_err("schema rejected");
    assert!(matches!(
        err,
        LoadError::SchemaMismatch { ref missing } if missing == &["zone_result"]
    ));
}

#[tokio::test]
async fn empty_table_keeps_its_columns() {
    let (_dir, url) = seeded_database(
        "CREATE TABLE zippy_applicants (state TEXT, city TEXT, zipcode TEXT, naics_code TEXT, zone_result TEXT, notes TEXT)",
        &[],
    )
    .await;

    let dataset = source(&url).load().await.expect("empty dataset loads");
    assert!(dataset.is_empty());
    assert_eq!(
        dataset.columns(),
        ["state", "city", "zipcode", "naics_code", "zone_result", "notes"]
    );
}

#[tokio::test]
async fn date_and_binary_columns_pass_through_as_text() {
    let (_dir, url) = seeded_database(
        "CREATE TABLE zippy_applicants (state TEXT, city TEXT, zipcode TEXT, naics_code TEXT, zone_result TEXT, applied_at DATETIME, photo BLOB)",
        &[
            "INSERT INTO zippy_applicants VALUES ('CA', 'Oakland', '94612', '541511', 'EZ1', '2024-03-01 09:30:00', X'89504E47')",
            "INSERT INTO zippy_applicants VALUES ('NY', 'Albany', '12207', '722511', 'N/A', NULL, NULL)",
        ],
    )
    .await;

    let dataset = source(&url).load().await.expect("dataset loads");
    assert_eq!(dataset.len(), 2);

    let first = &dataset.records()[0];
    assert_eq!(first.field("applied_at"), Some("2024-03-01 09:30:00"));
    assert_eq!(first.field("photo"), Some("<4 bytes>"));

    let second = &dataset.records()[1];
    assert_eq!(second.field("applied_at"), None);
    assert_eq!(second.field("photo"), None);
}

#[tokio::test]
async fn null_required_value_is_rejected() {
    let (_dir, url) = seeded_database(
        "CREATE TABLE zippy_applicants (state TEXT, city TEXT, zipcode TEXT, naics_code TEXT, zone_result TEXT)",
        &["INSERT INTO zippy_applicants VALUES ('CA', 'Oakland', '94612', '541511', NULL)"],
    )
    .await;

    let err = source(&url).load().await.expect_err("null rejected");
    assert!(matches!(
        err,
        LoadError::NullValue {
            column: "zone_result",
            row: 1
        }
    ));
}

#[tokio::test]
async fn missing_table_is_a_query_failure() {
    let (_dir, url) = seeded_database("CREATE TABLE other (id INTEGER)", &[]).await;

    let err = source(&url).load().await.expect_err("table missing");
    assert!(matches!(err, LoadError::Query(_)));
    assert!(!err.is_connection());
}
