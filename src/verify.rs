//! Puzzle verifier.
//!
//! Replays the investigation a player is expected to perform against a
//! finished repository and fails at the first step that does not lead to a
//! single, hash-confirmed culprit.

use crate::core::address::{Address, parse_listing, street_tag};
use crate::core::calendar;
use crate::core::config::VerifyConfig;
use crate::core::error::{StoreError, VerifyError};
use crate::core::history::{CommitRecord, HistoryStore, ObjectId, branches_with_suffix};
use crate::core::people;
use crate::phases::access_log::ACCESS_POINT_OF_INTEREST;
use crate::phases::residences::INVESTIGATION_POINTER;
use crate::phases::solution::{SOLUTION_TAG, answer};
use crate::phases::{ADDRESSES_PATH, MAIN_BRANCH};
use rayon::prelude::*;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Phrase in a testimony or investigation that clears a suspect.
pub const LEAD_PHRASE: &str = "ALIBI CONFIRMED";

/// Where a suspect's alibi was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Artifact {
    Testimony,
    Investigation,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Elimination {
    pub suspect: String,
    pub artifact: Artifact,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Verdict {
    pub culprit: String,
    /// Every suspect found through the access log, sorted.
    pub suspects: Vec<String>,
    pub eliminated: Vec<Elimination>,
}

fn structural(message: impl Into<String>) -> VerifyError {
    VerifyError::Structural(message.into())
}

/// Head of the single branch matching `suffix`.
fn resolve_branch<S: HistoryStore + ?Sized>(store: &S, suffix: &str) -> Result<ObjectId, VerifyError> {
    let matches = branches_with_suffix(store, suffix)?;
    match matches.as_slice() {
        [name] => store
            .branch_head(name)?
            .ok_or_else(|| structural(format!("branch {} has no head", name))),
        [] => Err(structural(format!("no branch matches {}", suffix))),
        many => Err(structural(format!(
            "several branches match {}: {}",
            suffix,
            many.join(", ")
        ))),
    }
}

/// The one report the main detective filed in the report week.
fn main_report<S: HistoryStore + ?Sized>(store: &S, head: &ObjectId) -> Result<CommitRecord, VerifyError> {
    let mut hits = store.log_by_author_between(
        head,
        &people::main_detective().name,
        calendar::report_week_start(),
        calendar::report_week_end(),
    )?;
    if hits.len() != 1 {
        return Err(VerifyError::Cardinality {
            check: "archive report".into(),
            expected: 1,
            actual: hits.len(),
        });
    }
    let report = hits.remove(0);
    let body = report.body();
    let lead_branch = people::lead_detective_branch();
    for token in [lead_branch.as_str(), ACCESS_POINT_OF_INTEREST] {
        if !body.contains(token) {
            return Err(structural(format!("main report does not mention {}", token)));
        }
    }
    debug!(report = %report.id, "main report found");
    Ok(report)
}

/// Authors of the access log entries for the access point of interest.
fn access_log_suspects<S: HistoryStore + ?Sized>(
    store: &S,
    head: &ObjectId,
) -> Result<Vec<String>, VerifyError> {
    let hits = store.pickaxe(head, ACCESS_POINT_OF_INTEREST)?;
    let expected = people::suspects().len();
    if hits.len() != expected {
        return Err(VerifyError::Cardinality {
            check: "access log".into(),
            expected,
            actual: hits.len(),
        });
    }
    let mut names: Vec<String> = hits.into_iter().map(|c| c.author.name).collect();
    names.sort();
    names.dedup();
    debug!(suspects = ?names, "access log suspects");
    Ok(names)
}

/// Listing from `main`, name -> address.
fn listing<S: HistoryStore + ?Sized>(store: &S) -> Result<BTreeMap<String, Address>, VerifyError> {
    let main = store
        .branch_head(MAIN_BRANCH)?
        .ok_or_else(|| structural(format!("no {} branch", MAIN_BRANCH)))?;
    let bytes = store
        .read_file(&main, ADDRESSES_PATH)?
        .ok_or_else(|| structural(format!("{} missing on {}", ADDRESSES_PATH, MAIN_BRANCH)))?;
    let text = String::from_utf8(bytes)
        .map_err(|_| structural(format!("{} is not UTF-8", ADDRESSES_PATH)))?;
    parse_listing(&text).map_err(|e| structural(format!("{}: {}", ADDRESSES_PATH, e)))
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn clears(text: &str) -> bool {
    collapse_whitespace(text).contains(LEAD_PHRASE)
}

/// Walk to the suspect's house and read both artifacts. `Some` names the
/// artifact holding an alibi.
fn examine<S: HistoryStore + ?Sized>(
    store: &S,
    listing: &BTreeMap<String, Address>,
    suspect: &str,
) -> Result<Option<Artifact>, VerifyError> {
    let address = listing
        .get(suspect)
        .ok_or_else(|| VerifyError::AddressLookup(suspect.to_string()))?;
    let tag = street_tag(&address.street);
    let head = store
        .resolve_tag(&tag)?
        .ok_or_else(|| structural(format!("tag {} missing", tag)))?;
    let capacity = listing.values().filter(|a| a.street == address.street).count();
    if address.house > capacity {
        return Err(structural(format!(
            "{} lives at {} {} but the street has {} houses",
            suspect, address.house, address.street, capacity
        )));
    }
    let distance = address.house;
    let house = store
        .ancestor(&head, distance)
        .map_err(|e| structural(format!("{}~{}: {}", tag, distance, e)))?;
    let record = store.read_commit(&house)?;
    let expected_title = format!("{} {}", address.house, address.street);
    if record.title() != expected_title {
        return Err(structural(format!(
            "{}~{} is {:?}, expected {:?}",
            tag,
            distance,
            record.title(),
            expected_title
        )));
    }

    let pointer = store
        .read_file(&house, INVESTIGATION_POINTER)?
        .ok_or_else(|| structural(format!("no {} at {}", INVESTIGATION_POINTER, expected_title)))?;
    let target = ObjectId::new(String::from_utf8_lossy(&pointer).trim());
    let investigation = store
        .read_object(&target)
        .map_err(|e| structural(format!("investigation of {}: {}", suspect, e)))?;

    debug!(suspect, tag = %tag, distance, "house examined");
    if clears(&record.message) {
        Ok(Some(Artifact::Testimony))
    } else if clears(&String::from_utf8_lossy(&investigation)) {
        Ok(Some(Artifact::Investigation))
    } else {
        Ok(None)
    }
}

/// Solve the puzzle in `store` the way a player would.
pub fn verify<S: HistoryStore + ?Sized>(store: &S, config: &VerifyConfig) -> Result<Verdict, VerifyError> {
    let lead_branch = people::lead_detective_branch();
    let (archive, lead) = rayon::join(
        || resolve_branch(store, &config.archive_suffix),
        || resolve_branch(store, &lead_branch),
    );
    let (archive, lead) = (archive?, lead?);
    info!("branches resolved");

    let (report, suspects) = rayon::join(
        || main_report(store, &archive),
        || access_log_suspects(store, &lead),
    );
    report?;
    let suspects = suspects?;
    info!(count = suspects.len(), "suspects identified");

    let listing = listing(store)?;
    for suspect in &suspects {
        if !listing.contains_key(suspect) {
            return Err(VerifyError::AddressLookup(suspect.clone()));
        }
    }

    let findings = suspects
        .par_iter()
        .map(|suspect| examine(store, &listing, suspect))
        .collect::<Result<Vec<_>, _>>()?;

    let mut remaining = Vec::new();
    let mut eliminated = Vec::new();
    for (suspect, finding) in suspects.iter().zip(findings) {
        match finding {
            Some(artifact) => eliminated.push(Elimination {
                suspect: suspect.clone(),
                artifact,
            }),
            None => remaining.push(suspect.clone()),
        }
    }
    let culprit = match remaining.as_slice() {
        [one] => one.clone(),
        _ => return Err(VerifyError::AmbiguousSolution(remaining)),
    };
    info!(culprit = %culprit, "single suspect remains");

    let tagged = store
        .resolve_tag(SOLUTION_TAG)?
        .ok_or_else(|| structural(format!("tag {} missing", SOLUTION_TAG)))?;
    let actual = store.read_object(&tagged).map_err(|e| match e {
        StoreError::WrongKind { id, .. } => {
            structural(format!("tag {} points at {}, not a content object", SOLUTION_TAG, id))
        }
        other => other.into(),
    })?;
    let expected = store.hash_object(answer(&culprit).as_bytes())?;
    if actual != expected.as_str().as_bytes() {
        return Err(VerifyError::SolutionMismatch {
            expected: expected.to_string(),
            actual: String::from_utf8_lossy(&actual).into_owned(),
        });
    }

    Ok(Verdict {
        culprit,
        suspects,
        eliminated,
    })
}
