// Multi-process lock smoke test: concurrent inserts must not lose rows.
use std::process::{Command, Stdio};

use tabstore::api::{Config, Database};

fn cmd() -> Command {
    let exe = env!("CARGO_BIN_EXE_tabstore");
    Command::new(exe)
}

#[test]
fn concurrent_inserts_are_serialized() {
    let temp = tempfile::tempdir().expect("tempdir");
    let dir = temp.path().join("dbs");

    let create = cmd()
        .arg("--dir")
        .arg(&dir)
        .args(["db", "create", "lockdb"])
        .output()
        .expect("create");
    assert!(create.status.success());
    let table = cmd()
        .arg("--dir")
        .arg(&dir)
        .args(["table", "create", "lockdb", "hits", "--column", "i:int"])
        .output()
        .expect("table");
    assert!(table.status.success());

    let workers = 8;
    let mut children = Vec::new();
    for i in 0..workers {
        let child = cmd()
            .arg("--dir")
            .arg(&dir)
            .args(["insert", "lockdb", "hits", &format!("[{i}]")])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .expect("spawn");
        children.push(child);
    }

    for mut child in children {
        let status = child.wait().expect("wait");
        assert!(status.success());
    }

    let db = Database::open(&Config::new(&dir), "lockdb").expect("open");
    let hits = db.table("hits").expect("hits");
    assert_eq!(hits.count().expect("count"), workers);
}
