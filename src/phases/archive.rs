//! Phase A: the police archive.
//!
//! Finding one commit in a long history is an everyday task ("when did we last
//! bump the version?"). The archive buries the main crime scene report among
//! many filler reports; the only way to pin it down is to filter the log by
//! author and date. Around the report week the filler reports are never by the
//! main detective, so that query has exactly one answer.

use crate::core::assets;
use crate::core::calendar;
use crate::core::config::BuildConfig;
use crate::core::error::BuildError;
use crate::core::fillers::Session;
use crate::core::history::{HistoryStore, ObjectId, Tree};
use crate::core::people::{self, Person};
use crate::phases::commit;
use chrono::{Duration, NaiveDateTime};
use serde::Serialize;
use tracing::info;

#[derive(Debug, Clone, Serialize)]
pub struct ArchiveReport {
    pub branch: String,
    pub head: ObjectId,
    /// Commits appended on top of the base snapshot.
    pub commits: usize,
    pub main_report: ObjectId,
}

type Slot = (Person, NaiveDateTime);

/// `count` reports by authors drawn from `pool`, dated inside `start..end`.
fn fillers(
    session: &mut Session,
    pool: &[Person],
    count: usize,
    start: NaiveDateTime,
    end: NaiveDateTime,
) -> Result<Vec<Slot>, BuildError> {
    session
        .datetimes(count, start, end)
        .into_iter()
        .map(|when| {
            let author = session
                .pick(pool)
                .cloned()
                .ok_or(BuildError::EmptyPool("detectives"))?;
            Ok((author, when))
        })
        .collect()
}

/// Author and date of every filler report, split around the main report.
struct Schedule {
    before: Vec<Slot>,
    after: Vec<Slot>,
}

fn schedule(session: &mut Session, config: &BuildConfig) -> Result<Schedule, BuildError> {
    let all = people::all_detectives();
    let others = people::other_detectives();

    // Anyone until the report week, then only the other detectives inside it.
    let mut before = fillers(
        session,
        &all,
        config.reports_before - 1,
        calendar::date_start(),
        calendar::report_week_start(),
    )?;
    before.extend(fillers(
        session,
        &others,
        1,
        calendar::report_week_start(),
        calendar::date_report(),
    )?);

    let mut after = fillers(
        session,
        &others,
        2,
        calendar::date_report() + Duration::minutes(1),
        calendar::report_week_end(),
    )?;
    after.extend(fillers(
        session,
        &all,
        config.reports_after - 2,
        calendar::report_week_end(),
        calendar::date_end(),
    )?);
    Ok(Schedule { before, after })
}

fn append_fillers<S: HistoryStore + ?Sized>(
    store: &S,
    session: &mut Session,
    head: &mut ObjectId,
    tree: &Tree,
    slots: &[Slot],
) -> Result<(), BuildError> {
    for (author, when) in slots {
        let title = format!("Crime scene report #{}", session.next_id());
        let body = session.paragraphs();
        *head = commit(store, Some(&*head), author, *when, &title, &body, tree.clone())?;
    }
    Ok(())
}

pub fn build<S: HistoryStore + ?Sized>(
    store: &S,
    session: &mut Session,
    base: &ObjectId,
    config: &BuildConfig,
) -> Result<ArchiveReport, BuildError> {
    info!(branch = %config.archive_branch, "building police archive");
    let tree = store.read_commit(base)?.tree;
    let schedule = schedule(session, config)?;

    let mut head = base.clone();
    append_fillers(store, session, &mut head, &tree, &schedule.before)?;
    let title = format!("Crime scene report #{}", session.next_id());
    let main_report = commit(
        store,
        Some(&head),
        &people::main_detective(),
        calendar::date_report(),
        &title,
        assets::MAIN_REPORT,
        tree.clone(),
    )?;
    head = main_report.clone();
    append_fillers(store, session, &mut head, &tree, &schedule.after)?;
    store.set_branch(&config.archive_branch, &head)?;

    Ok(ArchiveReport {
        branch: config.archive_branch.clone(),
        head,
        commits: schedule.before.len() + 1 + schedule.after.len(),
        main_report,
    })
}
