mod helpers;

use synapse::db;
use synapse::db::migrations::{get_embedding_model, get_schema_version, run_migrations, CURRENT_SCHEMA_VERSION};

#[test]
fn fresh_db_migrates_to_current_version() {
    let conn = helpers::test_db();
    assert_eq!(get_schema_version(&conn).unwrap(), CURRENT_SCHEMA_VERSION);
}

#[test]
fn migration_records_embedding_model() {
    let conn = helpers::test_db();
    let model = get_embedding_model(&conn).unwrap();
    assert_eq!(model, Some("text-embedding-004".to_string()));
}

#[test]
fn migrations_are_idempotent() {
    let mut conn = helpers::test_db();
    run_migrations(&mut conn).unwrap();
    assert_eq!(get_schema_version(&conn).unwrap(), CURRENT_SCHEMA_VERSION);
}

#[test]
fn file_database_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("brain.db");

    let user_id = {
        let conn = db::open_database(&path).unwrap();
        helpers::test_user(&conn, "ada@example.com")
    };
    assert!(path.exists(), "parent directories are created");

    let conn = db::open_database(&path).unwrap();
    assert_eq!(get_schema_version(&conn).unwrap(), CURRENT_SCHEMA_VERSION);
    let profile = synapse::brain::profiles::get_profile(&conn, &user_id).unwrap();
    assert_eq!(profile.email, "ada@example.com");
}

#[test]
fn health_check_reports_counts() {
    let conn = helpers::test_db();
    let user = helpers::test_user(&conn, "ada@example.com");
    synapse::brain::notes::create_note(
        &conn,
        &user,
        &synapse::brain::notes::NewNote {
            title: "Hello".into(),
            ..Default::default()
        },
    )
    .unwrap();

    let report = db::check_database_health(&conn).unwrap();
    assert_eq!(report.schema_version, CURRENT_SCHEMA_VERSION);
    assert_eq!(report.profile_count, 1);
    assert_eq!(report.note_count, 1);
    assert_eq!(report.embedded_note_count, 0);
    assert!(report.integrity_ok);
    assert!(report.sqlite_vec_version.starts_with('v'));
}
