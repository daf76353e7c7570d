use diesel::connection::SimpleConnection;

mod common;

#[test]
fn test_creates_and_migrates_db_file() {
    let test_db = common::TestDb::new("test_creates_and_migrates_db_file.db");
    let mut conn = test_db.pool().get().expect("connection");
    conn.batch_execute("SELECT id FROM forecasts LIMIT 1")
        .expect("forecasts table exists");
}
