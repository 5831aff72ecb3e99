//! Phase B: the factory access log.
//!
//! Searching history for a string (`git log -S`, `git blame`) answers "who
//! wrote this?". The main detective's branch replays the factory's badge log
//! for the murder day, one commit per swipe, appending one line to a tracked
//! log file. Every suspect swiped the access point named in the main report;
//! no factory worker ever did.

use crate::core::calendar;
use crate::core::config::BuildConfig;
use crate::core::error::BuildError;
use crate::core::fillers::Session;
use crate::core::history::{HistoryStore, ObjectId};
use crate::core::people::{self, Person};
use crate::phases::commit;
use chrono::NaiveTime;
use rand::Rng;
use serde::Serialize;
use tracing::info;

/// The access point every suspect used on the murder day.
pub const ACCESS_POINT_OF_INTEREST: &str = "LOADING_DOCK_7";

/// Access points factory workers swipe at random.
pub const ACCESS_POINTS: &[&str] = &[
    "GARAGE_1",
    "GARAGE_2",
    "CABINET_34_A",
    "CABINET_67_C1",
    "MAIN_FREEZER",
    "BACK_ROOM_231",
    "SECURITY_ROOM_1",
    "SECURITY_ROOM_2",
    "PRINTER_ROOM_76",
];

pub const ACCESS_LOG_PATH: &str = "evidence/access.log";

/// Number of filler runs the suspects are interleaved with.
const CHUNKS: usize = 4;

#[derive(Debug, Clone, Serialize)]
pub struct AccessLogReport {
    pub branch: String,
    pub head: ObjectId,
    pub entries: usize,
    /// Suspect swipes, in commit order.
    pub suspect_entries: Vec<ObjectId>,
}

/// Who swiped what, in commit order: filler runs of `workers` at `points`
/// with the suspects between them, last suspect first.
fn swipes(
    session: &mut Session,
    config: &BuildConfig,
    workers: &[Person],
    points: &[&'static str],
) -> Result<Vec<(Person, &'static str)>, BuildError> {
    let mut suspects = people::suspects();
    suspects.reverse();

    let chunk = config.access_chunk;
    let runs: Vec<usize> = (0..CHUNKS)
        .map(|_| session.rng().gen_range(chunk.min..chunk.max))
        .collect();

    let mut out = Vec::new();
    for (i, run) in runs.into_iter().enumerate() {
        for _ in 0..run {
            let worker = session
                .pick(workers)
                .cloned()
                .ok_or(BuildError::EmptyPool("factory workers"))?;
            let point = session
                .pick(points)
                .copied()
                .ok_or(BuildError::EmptyPool("access points"))?;
            out.push((worker, point));
        }
        if let Some(suspect) = suspects.get(i) {
            out.push((suspect.clone(), ACCESS_POINT_OF_INTEREST));
        }
    }
    // More suspects than gaps between runs: append the rest at the end.
    for suspect in suspects.iter().skip(CHUNKS) {
        out.push((suspect.clone(), ACCESS_POINT_OF_INTEREST));
    }
    Ok(out)
}

pub fn build<S: HistoryStore + ?Sized>(
    store: &S,
    session: &mut Session,
    base: &ObjectId,
    config: &BuildConfig,
) -> Result<AccessLogReport, BuildError> {
    let branch = people::lead_detective_branch();
    info!(branch = %branch, "building access log trail");

    let swipes = swipes(session, config, &people::factory_workers(), ACCESS_POINTS)?;
    let day = calendar::murder_day();
    let open = day.and_time(NaiveTime::from_hms_opt(8, 0, 0).unwrap_or_default());
    let close = day.and_time(NaiveTime::from_hms_opt(18, 0, 0).unwrap_or_default());
    let times = session.datetimes(swipes.len(), open, close);

    let mut tree = store.read_commit(base)?.tree;
    let mut log = String::new();
    let mut head = base.clone();
    let mut suspect_entries = Vec::new();
    for ((person, point), when) in swipes.iter().zip(times) {
        log.push_str(point);
        log.push('\n');
        tree.add_reachable_file(store, ACCESS_LOG_PATH, log.as_bytes())?;
        let title = format!("ACCESS LOG COMMIT {}", when.format("%H:%M"));
        head = commit(store, Some(&head), person, when, &title, "", tree.clone())?;
        if *point == ACCESS_POINT_OF_INTEREST {
            suspect_entries.push(head.clone());
        }
    }
    store.set_branch(&branch, &head)?;

    Ok(AccessLogReport {
        branch,
        head,
        entries: swipes.len(),
        suspect_entries,
    })
}
