use gitstery::core::assets;
use gitstery::core::config::{BuildConfig, Config, Span};
use gitstery::core::error::{BuildError, VerifyError};
use gitstery::core::history::{HistoryStore, NewCommit};
use gitstery::core::memory::MemoryStore;
use gitstery::core::people;
use gitstery::phases::residences::INVESTIGATION_POINTER;
use gitstery::phases::access_log::{ACCESS_LOG_PATH, ACCESS_POINT_OF_INTEREST};
use gitstery::phases::solution::{self, SOLUTION_TAG};
use gitstery::phases::{Build, BuildOptions, MAIN_BRANCH, generate};
use gitstery::verify::verify;
use std::collections::BTreeSet;
use std::fs;
use tempfile::tempdir;

fn generated(seed: &[u8]) -> MemoryStore {
    let store = MemoryStore::new();
    generate(&store, &BuildOptions::new(seed.to_vec())).expect("generate");
    store
}

fn refs(store: &MemoryStore) -> Vec<(String, String)> {
    let mut out = Vec::new();
    for branch in store.branches().unwrap() {
        let head = store.branch_head(&branch).unwrap().unwrap();
        out.push((format!("refs/heads/{}", branch), head.to_string()));
    }
    for tag in store.tags().unwrap() {
        let target = store.resolve_tag(&tag).unwrap().unwrap();
        out.push((format!("refs/tags/{}", tag), target.to_string()));
    }
    out
}

#[test]
fn fresh_build_verifies_for_many_seeds() {
    for seed in [&b"\x00"[..], b"\x01\x02", b"gitstery", b"\xff\xfe\xfd\xfc"] {
        let store = generated(seed);
        let verdict = verify(&store, &Default::default()).expect("verify");
        assert_eq!(verdict.culprit, solution::culprit().name);
    }
}

#[test]
fn same_seed_same_repository() {
    let a = generated(b"determinism");
    let b = generated(b"determinism");
    assert_eq!(refs(&a), refs(&b));
    assert_eq!(a.object_count(), b.object_count());

    let c = generated(b"something else");
    assert_ne!(refs(&a), refs(&c));
}

#[test]
fn every_other_suspect_is_eliminated() {
    let store = generated(b"eliminate");
    let verdict = verify(&store, &Default::default()).unwrap();

    let all: BTreeSet<_> = people::suspects().into_iter().map(|p| p.name).collect();
    assert_eq!(verdict.suspects.iter().cloned().collect::<BTreeSet<_>>(), all);

    let mut accounted: BTreeSet<_> = verdict.eliminated.iter().map(|e| e.suspect.clone()).collect();
    assert!(!accounted.contains(&verdict.culprit));
    accounted.insert(verdict.culprit.clone());
    assert_eq!(accounted, all);
}

#[test]
fn solution_tag_matches_culprit_hash() {
    let store = generated(b"hash");
    let tagged = store.resolve_tag(SOLUTION_TAG).unwrap().unwrap();
    let content = store.read_object(&tagged).unwrap();
    let expected = store
        .hash_object(solution::answer(&solution::culprit().name).as_bytes())
        .unwrap();
    assert_eq!(content, expected.as_str().as_bytes());
}

#[test]
fn deleting_the_culprits_street_tag_breaks_verification() {
    let store = generated(b"untag");
    let build = Build::new(&store, b"untag", BuildConfig::default()).unwrap();
    let culprit = solution::culprit();
    let address = build.index().address_of(&culprit.name).unwrap().clone();
    drop(build);

    let tag = gitstery::core::address::street_tag(&address.street);
    store.delete_tag(&tag).unwrap();
    let err = verify(&store, &Default::default()).unwrap_err();
    assert!(
        matches!(err, VerifyError::AddressLookup(_) | VerifyError::Structural(_)),
        "unexpected {:?}",
        err
    );
}

#[test]
fn swapping_the_culprit_with_another_suspect_breaks_verification() {
    let culprit = solution::culprit();
    for other in people::suspects().into_iter().filter(|s| *s != culprit) {
        let store = MemoryStore::new();
        {
            let mut build = Build::new(&store, b"swap", BuildConfig::default()).unwrap();
            build.base().unwrap();
            assert!(build.index_mut().swap_residents(&culprit.name, &other.name));
            build.archive().unwrap();
            build.access_log().unwrap();
            build.residences().unwrap();
            build.solution().unwrap();
        }
        let err = verify(&store, &Default::default()).unwrap_err();
        assert!(
            matches!(
                err,
                VerifyError::AmbiguousSolution(_) | VerifyError::SolutionMismatch { .. }
            ),
            "unexpected {:?}",
            err
        );
    }
}

#[test]
fn extra_access_log_entry_is_a_cardinality_failure() {
    let store = generated(b"extra");
    let branch = people::lead_detective_branch();
    let head = store.branch_head(&branch).unwrap().unwrap();
    let record = store.read_commit(&head).unwrap();

    let mut log = store.read_file(&head, ACCESS_LOG_PATH).unwrap().unwrap();
    log.extend_from_slice(format!("{}\n", ACCESS_POINT_OF_INTEREST).as_bytes());
    let mut tree = record.tree.clone();
    tree.add_reachable_file(&store, ACCESS_LOG_PATH, &log).unwrap();
    let extra = store
        .commit(&NewCommit {
            parent: Some(head),
            author: people::factory_workers()[0].clone(),
            when: record.when,
            message: "ACCESS LOG COMMIT 17:59\n".into(),
            tree,
        })
        .unwrap();
    store.set_branch(&branch, &extra).unwrap();

    match verify(&store, &Default::default()).unwrap_err() {
        VerifyError::Cardinality {
            expected, actual, ..
        } => {
            assert_eq!(expected, 3);
            assert_eq!(actual, 4);
        }
        other => panic!("unexpected {:?}", other),
    }
}

fn archive_cardinality(store: &MemoryStore) -> (usize, usize) {
    match verify(store, &Default::default()).unwrap_err() {
        VerifyError::Cardinality {
            check,
            expected,
            actual,
        } => {
            assert_eq!(check, "archive report");
            (expected, actual)
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn archive_without_the_main_report_is_a_cardinality_failure() {
    let store = generated(b"no report");
    let main = store.branch_head(MAIN_BRANCH).unwrap().unwrap();
    store.set_branch("gtpd-archive", &main).unwrap();
    assert_eq!(archive_cardinality(&store), (1, 0));
}

#[test]
fn second_report_in_the_week_is_a_cardinality_failure() {
    let store = generated(b"two reports");
    let head = store.branch_head("gtpd-archive").unwrap().unwrap();
    let record = store.read_commit(&head).unwrap();
    let report = store
        .log_by_author_between(
            &head,
            &people::main_detective().name,
            gitstery::core::calendar::report_week_start(),
            gitstery::core::calendar::report_week_end(),
        )
        .unwrap()
        .remove(0);
    let copy = store
        .commit(&NewCommit {
            parent: Some(head),
            author: people::main_detective(),
            when: report.when,
            message: "Crime scene report #1\n\nFollow-up.\n".into(),
            tree: record.tree,
        })
        .unwrap();
    store.set_branch("gtpd-archive", &copy).unwrap();
    assert_eq!(archive_cardinality(&store), (1, 2));
}

#[test]
fn main_report_without_clues_is_structural() {
    let store = generated(b"vague report");
    let main = store.branch_head(MAIN_BRANCH).unwrap().unwrap();
    let base = store.read_commit(&main).unwrap();
    assert!(assets::MAIN_REPORT.contains(ACCESS_POINT_OF_INTEREST));
    let vague = store
        .commit(&NewCommit {
            parent: Some(main),
            author: people::main_detective(),
            when: gitstery::core::calendar::date_report(),
            message: "Crime scene report #1\n\nNobody saw anything.\n".into(),
            tree: base.tree,
        })
        .unwrap();
    store.set_branch("gtpd-archive", &vague).unwrap();

    let err = verify(&store, &Default::default()).unwrap_err();
    assert!(matches!(err, VerifyError::Structural(_)), "unexpected {:?}", err);
    assert!(err.to_string().contains("main report"));
}

#[test]
fn suspect_house_without_pointer_is_structural() {
    let store = generated(b"no pointer");
    let build = Build::new(&store, b"no pointer", BuildConfig::default()).unwrap();
    let culprit = solution::culprit();
    let address = build.index().address_of(&culprit.name).unwrap().clone();
    let capacity = build
        .index()
        .streets()
        .iter()
        .find(|s| s.name == address.street)
        .unwrap()
        .capacity();
    drop(build);

    // Rewrite the street chain with the pointer left out of the culprit's house.
    let tag = gitstery::core::address::street_tag(&address.street);
    let head = store.resolve_tag(&tag).unwrap().unwrap();
    let chain = store.log(&head).unwrap();
    let mut parent = chain[capacity + 1].id.clone();
    for (hops, record) in chain.iter().enumerate().take(capacity + 1).rev() {
        let mut tree = record.tree.clone();
        if hops == address.house {
            assert!(tree.remove(INVESTIGATION_POINTER).is_some());
        }
        parent = store
            .commit(&NewCommit {
                parent: Some(parent),
                author: record.author.clone(),
                when: record.when,
                message: record.message.clone(),
                tree,
            })
            .unwrap();
    }
    store.delete_tag(&tag).unwrap();
    store.tag_object(&tag, &parent).unwrap();

    let err = verify(&store, &Default::default()).unwrap_err();
    assert!(matches!(err, VerifyError::Structural(_)), "unexpected {:?}", err);
    assert!(err.to_string().contains(INVESTIGATION_POINTER));
}

#[test]
fn config_file_shapes_the_town() {
    let tmp = tempdir().expect("tempdir");
    let path = tmp.path().join("gitstery.toml");
    fs::write(
        &path,
        r#"
[build]
archive_branch = "archive/gtpd-archive"
streets = ["Main Street", "Side Street"]
street_capacity = { min = 14, max = 16 }
reports_before = 5
reports_after = 3
"#,
    )
    .unwrap();
    let config = Config::load(&path).unwrap();
    assert_eq!(config.build.access_chunk, Span { min: 5, max: 20 });

    let store = MemoryStore::new();
    let mut options = BuildOptions::new(b"config".to_vec());
    options.config = config.build.clone();
    let report = generate(&store, &options).unwrap();

    assert_eq!(report.archive.as_ref().unwrap().commits, 5 + 1 + 3);
    let tags = store.tags().unwrap();
    assert!(tags.contains(&"street/main_street".to_string()));
    assert!(tags.contains(&"street/side_street".to_string()));
    assert_eq!(tags.len(), 3);
    assert!(verify(&store, &config.verify).is_ok());
}

#[test]
fn invalid_config_file_is_rejected() {
    let tmp = tempdir().expect("tempdir");
    let path = tmp.path().join("bad.toml");
    fs::write(&path, "[build]\nreports_after = 1\n").unwrap();
    assert!(matches!(Config::load(&path), Err(BuildError::Config(_))));

    fs::write(&path, "[build\n").unwrap();
    assert!(matches!(Config::load(&path), Err(BuildError::Config(_))));
}

#[test]
fn too_small_town_is_rejected() {
    let store = MemoryStore::new();
    let mut options = BuildOptions::new(b"tiny".to_vec());
    options.config.streets = vec!["Lonely Lane".into()];
    options.config.street_capacity = Span { min: 1, max: 2 };
    assert!(matches!(
        generate(&store, &options),
        Err(BuildError::NotEnoughHouses { .. })
    ));
}
