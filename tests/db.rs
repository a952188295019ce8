use diesel::prelude::*;
use diesel::sql_types::Integer;

mod common;

#[derive(QueryableByName)]
struct Pragma {
    #[diesel(sql_type = Integer)]
    foreign_keys: i32,
}

#[test]
fn test_creates_and_removes_db_files() {
    let test_db = common::TestDb::new();
    let pool = test_db.pool();
    let conn = pool.get();
    assert!(conn.is_ok());
}

#[test]
fn connections_enforce_foreign_keys() {
    let test_db = common::TestDb::new();
    let mut conn = pushkind_importer::db::get_connection(&test_db.pool()).unwrap();
    let pragma = diesel::sql_query("PRAGMA foreign_keys")
        .get_result::<Pragma>(&mut conn)
        .unwrap();
    assert_eq!(pragma.foreign_keys, 1);
}

#[derive(QueryableByName)]
struct Timeout {
    #[diesel(sql_type = Integer)]
    timeout: i32,
}

#[test]
fn connections_wait_for_the_write_lock() {
    let test_db = common::TestDb::new();
    let mut conn = pushkind_importer::db::get_connection(&test_db.pool()).unwrap();
    let pragma = diesel::sql_query("PRAGMA busy_timeout")
        .get_result::<Timeout>(&mut conn)
        .unwrap();
    assert_eq!(
        pragma.timeout as u128,
        pushkind_importer::db::BUSY_TIMEOUT.as_millis()
    );
}
