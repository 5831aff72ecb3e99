use gitstery::core::address::{parse_listing, street_tag};
use gitstery::core::git::GitStore;
use gitstery::core::history::{HistoryStore, ObjectId, Tree};
use gitstery::core::people;
use gitstery::phases::access_log::ACCESS_POINT_OF_INTEREST;
use gitstery::phases::residences::INVESTIGATIONS_BRANCH;
use gitstery::phases::solution::{self, SOLUTION_TAG};
use gitstery::phases::{BuildOptions, MAIN_BRANCH, generate};
use gitstery::verify::verify;
use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};
use tempfile::tempdir;

fn git_available() -> bool {
    Command::new("git")
        .arg("--version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

fn git(dir: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .current_dir(dir)
        .args(args)
        .output()
        .expect("failed to execute git");
    assert!(
        output.status.success(),
        "git {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).to_string()
}

fn git_hash_stdin(dir: &Path, input: &str) -> String {
    let mut child = Command::new("git")
        .current_dir(dir)
        .args(["hash-object", "--stdin"])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .spawn()
        .expect("spawn git hash-object");
    child
        .stdin
        .take()
        .expect("stdin")
        .write_all(input.as_bytes())
        .expect("write stdin");
    let output = child.wait_with_output().expect("wait");
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

#[test]
fn pooled_objects_stay_out_of_history() {
    if !git_available() {
        return;
    }
    let tmp = tempdir().expect("tempdir");
    let store = GitStore::init(tmp.path()).unwrap();

    let pooled = store.add_pooled_object(b"hidden\n").unwrap();
    assert_eq!(store.read_object(&pooled).unwrap(), b"hidden\n");
    assert_eq!(store.hash_object(b"hidden\n").unwrap(), pooled);

    let mut tree = Tree::new();
    tree.add_reachable_file(&store, "dir/visible.txt", b"visible\n").unwrap();
    let commit = store
        .commit(&gitstery::core::history::NewCommit {
            parent: None,
            author: people::mayor(),
            when: gitstery::core::calendar::date_start(),
            message: "Snapshot\n".into(),
            tree,
        })
        .unwrap();
    store.set_branch(MAIN_BRANCH, &commit).unwrap();

    let record = store.read_commit(&commit).unwrap();
    assert_eq!(record.title(), "Snapshot");
    assert_eq!(record.author, people::mayor());
    assert_eq!(record.when, gitstery::core::calendar::date_start());
    assert_eq!(
        store.read_file(&commit, "dir/visible.txt").unwrap().unwrap(),
        b"visible\n"
    );
    let listed = git(tmp.path(), &["ls-tree", "-r", "--name-only", MAIN_BRANCH]);
    assert_eq!(listed.trim(), "dir/visible.txt");

    store.tag_object("hidden", &pooled).unwrap();
    assert_eq!(store.resolve_tag("hidden").unwrap(), Some(pooled.clone()));
    assert!(store.tag_object("hidden", &pooled).is_err());
    store.delete_tag("hidden").unwrap();
    assert_eq!(store.resolve_tag("hidden").unwrap(), None);
    assert!(store.read_object(&ObjectId::new("0".repeat(40))).is_err());
}

#[test]
fn generated_repository_solves_with_plain_git() {
    if !git_available() {
        return;
    }
    let tmp = tempdir().expect("tempdir");
    let root = tmp.path();
    let store = GitStore::init(root).unwrap();
    let report = generate(&store, &BuildOptions::new(b"git".to_vec())).unwrap();
    store.checkout(MAIN_BRANCH).unwrap();

    assert!(root.join("addresses.tsv").exists());
    assert!(root.join("README.md").exists());

    let verdict = verify(&store, &Default::default()).unwrap();
    assert_eq!(verdict.culprit, solution::culprit().name);

    // The archive query a player runs.
    let hits = git(
        root,
        &[
            "log",
            "--format=%H",
            "--author=Sam Bisect",
            "--since=2019-07-22 00:00:00 +0000",
            "--until=2019-07-28 23:59:59 +0000",
            "gtpd-archive",
        ],
    );
    let archive = report.archive.as_ref().unwrap();
    assert_eq!(hits.trim(), archive.main_report.as_str());

    // The access log query.
    let pickaxe = format!("-S{}", ACCESS_POINT_OF_INTEREST);
    let authors = git(
        root,
        &["log", "--format=%an", &pickaxe, &people::lead_detective_branch()],
    );
    assert_eq!(authors.lines().count(), people::suspects().len());

    // The answer check.
    let expected = git_hash_stdin(root, &format!("{}\n", solution::culprit().name));
    let tagged = git(root, &["cat-file", "-p", SOLUTION_TAG]);
    assert_eq!(tagged, expected);

    let orphan = git(root, &["ls-tree", "--name-only", INVESTIGATIONS_BRANCH]);
    assert_eq!(orphan.lines().count(), people::suspects().len());

    // Walking to a suspect's house: `street/<slug>~<house>`.
    let listing = std::fs::read_to_string(root.join("addresses.tsv")).unwrap();
    let listing = parse_listing(&listing).unwrap();
    for suspect in people::suspects() {
        let address = &listing[&suspect.name];
        let rev = format!("{}~{}", street_tag(&address.street), address.house);
        let title = git(root, &["log", "-1", "--format=%s", &rev]);
        assert_eq!(title.trim(), format!("{} {}", address.house, address.street));
    }
}

#[test]
fn native_queries_match_defaults() {
    if !git_available() {
        return;
    }
    let tmp = tempdir().expect("tempdir");
    let store = GitStore::init(tmp.path()).unwrap();
    let mut options = BuildOptions::new(b"native".to_vec());
    options.config.streets = vec!["Short Street".into(), "Long Street".into()];
    let report = generate(&store, &options).unwrap();

    let residences = report.residences.unwrap();
    for street in &residences.streets {
        let via_git = store.ancestor(&street.head, street.capacity).unwrap();
        let mut walked = street.head.clone();
        for _ in 0..street.capacity {
            walked = store.read_commit(&walked).unwrap().parent.unwrap();
        }
        assert_eq!(via_git, walked);
        assert!(store.ancestor(&street.head, street.capacity + 2).is_err());
    }

    let lead = report.access_log.unwrap().head;
    let hits = store.pickaxe(&lead, ACCESS_POINT_OF_INTEREST).unwrap();
    assert_eq!(hits.len(), people::suspects().len());
}

#[test]
fn open_rejects_missing_directories() {
    let tmp = tempdir().expect("tempdir");
    assert!(GitStore::open(&tmp.path().join("missing")).is_err());
}
