use shardwarehouse::catalog::{ColumnInfo, DbConn};
use shardwarehouse::core::DataType;
use shardwarehouse::parser::{CreateQuery, DropQuery};
use shardwarehouse::worker::{worker_create, worker_drop};

fn schema() -> Vec<ColumnInfo> {
    vec![
        ColumnInfo {
            name: "a".into(),
            data_type: DataType::Int,
            nullable: true,
        },
        ColumnInfo {
            name: "b".into(),
            data_type: DataType::Varchar,
            nullable: true,
        },
    ]
}

#[test]
fn create_then_drop_leaves_no_trace() {
    let dir = tempfile::tempdir().unwrap();
    let mut conn = DbConn::open(dir.path()).unwrap();

    worker_create(
        &mut conn,
        &CreateQuery {
            table: "t".into(),
            schema: schema(),
            if_not_exists: false,
        },
    )
    .unwrap();

    let table_dir = conn.table_dir("t");
    assert!(table_dir.is_dir());
    let manifest = shardwarehouse::catalog::Manifest::load(conn.manifest_path("t")).unwrap();
    assert_eq!(manifest.schema.len(), 2);
    assert_eq!(manifest.schema[0].name, "a");
    assert_eq!(manifest.schema[1].name, "b");
    assert!(conn.catalog.table_id("t").is_some());

    worker_drop(&mut conn, &DropQuery { table: "t".into(), if_exists: false }).unwrap();

    assert!(!table_dir.exists());
    assert!(conn.catalog.table_id("t").is_none());

    // Reopening the database should see the same, now-empty, state.
    let reopened = DbConn::open(dir.path()).unwrap();
    assert!(reopened.catalog.table_id("t").is_none());
    assert!(!reopened.table_dir("t").exists());
}

#[test]
fn dropping_an_unknown_table_without_if_exists_fails() {
    let dir = tempfile::tempdir().unwrap();
    let mut conn = DbConn::open(dir.path()).unwrap();
    let result = worker_drop(&mut conn, &DropQuery { table: "ghost".into(), if_exists: false });
    assert!(result.is_err());
}
