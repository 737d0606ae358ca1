use assert_cmd::Command;
use serde_json::Value;
use std::fs;
use tempfile::TempDir;

fn temp_workspace() -> TempDir {
    tempfile::tempdir().expect("create tempdir")
}

fn run_command(cmd: &mut Command) {
    cmd.assert().success();
}

fn write_fixture_table(dir: &TempDir) -> std::path::PathBuf {
    let path = dir.path().join("twcs.csv");
    let rows = "\
tweet_id,author_id,inbound,created_at,text,in_response_to_tweet_id
1,customer_1,True,Tue Oct 31 22:10:47 +0000 2017,My package has not arrived and the tracking page shows an error can you please help me,
2,AmazonHelp,False,Tue Oct 31 22:11:45 +0000 2017,We are sorry to hear that please send us a direct message with your order number and we will take a look right away,1
3,customer_2,True,Tue Oct 31 22:12:02 +0000 2017,The screen on my new phone is cracked and I would like to know how to get it repaired,
4,AppleSupport,False,Tue Oct 31 22:13:30 +0000 2017,Please reach out to our support team through the official channel and we will assist you,3
5,customer_3,True,Wed Nov 01 08:01:10 +0000 2017,Is there any update on the delivery of my order it has been stuck for three days now,
6,customer_4,True,Wed Nov 01 09:22:51 +0000 2017,I cannot sign into my account after the latest update and I have tried resetting everything,
7,AmazonHelp,False,Wed Nov 01 09:30:12 +0000 2017,We would love to help you with this could you please follow and send us a direct message (1/2),6
";
    fs::write(&path, rows).expect("write fixture");
    path
}

#[test]
fn prepare_encode_info_round_trip() {
    let workspace = temp_workspace();
    write_fixture_table(&workspace);

    let mut prepare = Command::cargo_bin("qavec").expect("binary exists");
    prepare.current_dir(workspace.path()).args([
        "--quiet",
        "prepare",
        "twcs.csv",
        "--out-dir",
        "out",
        "--validation-fraction",
        "0",
        "--test-fraction",
        "0",
        "--no-progress",
        "--pretty",
    ]);
    run_command(&mut prepare);

    let out_dir = workspace.path().join("out");
    for name in [
        "q_train.csv",
        "a_train.csv",
        "q_val.csv",
        "a_val.csv",
        "q_test.csv",
        "a_test.csv",
        "char_index.json",
        "report.json",
    ] {
        assert!(out_dir.join(name).exists(), "{name} was created");
    }

    // Only the first exchange survives: row 4 answers for the wrong company,
    // row 5 is never answered, and row 7 carries a continuation marker.
    let train = fs::read_to_string(out_dir.join("q_train.csv")).expect("read q_train");
    assert_eq!(train.lines().count(), 1, "exactly one training question");
    let answers = fs::read_to_string(out_dir.join("a_train.csv")).expect("read a_train");
    assert_eq!(answers.lines().count(), 1, "exactly one training answer");
    let validation = fs::read_to_string(out_dir.join("q_val.csv")).expect("read q_val");
    assert!(validation.is_empty(), "validation partition is empty");

    let index: Value = serde_json::from_str(
        &fs::read_to_string(out_dir.join("char_index.json")).expect("read char index"),
    )
    .expect("char index is valid JSON");
    assert_eq!(index["format"], "qavec-char-index");
    assert_eq!(index["chars"].as_str().map(str::len), Some(53));

    let report: Value = serde_json::from_str(
        &fs::read_to_string(out_dir.join("report.json")).expect("read report"),
    )
    .expect("report is valid JSON");
    assert_eq!(report["rows_loaded"], 7);
    assert_eq!(report["pairing"]["exchanges"], 1);

    let mut encode = Command::cargo_bin("qavec").expect("binary exists");
    let encode_output = encode
        .current_dir(workspace.path())
        .args([
            "--quiet",
            "encode",
            "-m",
            "out/char_index.json",
            "ab?",
            "--json",
        ])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let encoded: Value =
        serde_json::from_slice(&encode_output).expect("encoded output is valid JSON");
    let ids = encoded["ids"]
        .as_array()
        .expect("ids array")
        .iter()
        .map(|v| v.as_u64().expect("u64 id"))
        .collect::<Vec<_>>();
    assert_eq!(ids, vec![11, 12, 51]);

    let mut info = Command::cargo_bin("qavec").expect("binary exists");
    let info_output = info
        .current_dir(workspace.path())
        .args(["--quiet", "info", "-m", "out/char_index.json"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let info_text = String::from_utf8(info_output).expect("info output is UTF-8");
    assert!(
        info_text.contains("Vocab size : 53"),
        "info output contained expected summary"
    );
}

#[test]
fn clean_lowercases_and_normalizes() {
    let mut clean = Command::cargo_bin("qavec").expect("binary exists");
    let output = clean
        .args([
            "--quiet",
            "clean",
            "Thanks @AmazonHelp please check https://t.co/abc123",
        ])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let text = String::from_utf8(output).expect("clean output is UTF-8");
    assert_eq!(text.trim_end(), "thanks please check §");
}

#[test]
fn prepare_rejects_a_table_without_rows() {
    let workspace = temp_workspace();
    let path = workspace.path().join("empty.csv");
    fs::write(
        &path,
        "tweet_id,author_id,inbound,created_at,text,in_response_to_tweet_id\n",
    )
    .expect("write fixture");

    let mut prepare = Command::cargo_bin("qavec").expect("binary exists");
    prepare
        .current_dir(workspace.path())
        .args(["--quiet", "prepare", "empty.csv", "--no-progress"])
        .assert()
        .failure();
}
