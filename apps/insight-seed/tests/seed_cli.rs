use std::fs;
use std::process::Command;

use anyhow::Result;
use assert_cmd::prelude::*;
use insight_store::Store;
use predicates::prelude::*;
use tempfile::tempdir;

#[test]
fn seeds_records_into_state_dir() -> Result<()> {
    let dir = tempdir()?;
    let data = dir.path().join("data.json");
    fs::write(
        &data,
        r#"[{"sector":"Energy","end_year":"2020"},{"sector":"Retail"},{"region":"World"}]"#,
    )?;
    let state = dir.path().join("state");

    Command::cargo_bin("insight-seed")?
        .arg(&data)
        .arg("--state-dir")
        .arg(&state)
        .assert()
        .success()
        .stdout(predicate::str::contains("Seeded 3 records"));

    let store = Store::open(&state)?;
    assert_eq!(store.count_records()?, 3);
    Ok(())
}

#[test]
fn reseeding_replaces_the_collection() -> Result<()> {
    let dir = tempdir()?;
    let state = dir.path().join("state");
    let first = dir.path().join("first.json");
    let second = dir.path().join("second.json");
    fs::write(&first, r#"[{"sector":"Energy"},{"sector":"Retail"}]"#)?;
    fs::write(&second, r#"[{"sector":"Aerospace"}]"#)?;

    for file in [&first, &second] {
        Command::cargo_bin("insight-seed")?
            .arg(file)
            .env("INSIGHT_STATE_DIR", &state)
            .assert()
            .success();
    }

    let store = Store::open(&state)?;
    assert_eq!(store.count_records()?, 1);
    assert_eq!(
        store.distinct_values(insight_protocol::FilterField::Sector)?,
        ["Aerospace"]
    );
    Ok(())
}

#[test]
fn missing_data_file_exits_with_status_one() -> Result<()> {
    let dir = tempdir()?;
    Command::cargo_bin("insight-seed")?
        .current_dir(dir.path())
        .env("INSIGHT_STATE_DIR", dir.path().join("state"))
        .assert()
        .code(1)
        .stderr(predicate::str::contains("data file not found: data.json"));
    Ok(())
}

#[test]
fn non_object_entries_are_rejected() -> Result<()> {
    let dir = tempdir()?;
    let data = dir.path().join("data.json");
    fs::write(&data, r#"[{"sector":"Energy"},"oops"]"#)?;
    Command::cargo_bin("insight-seed")?
        .arg(&data)
        .env("INSIGHT_STATE_DIR", dir.path().join("state"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("entry 1 is not an object"));
    Ok(())
}
