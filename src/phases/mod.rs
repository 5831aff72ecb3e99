//! Narrative graph builder.
//!
//! A build commits the town's base snapshot on `main`, then runs the phases in
//! order. Each phase only appends new commits, branches and tags on top of the
//! base; nothing written earlier is ever rewritten.
//!
//! - [`archive`]: crime scene reports, found with a bounded `git log` search
//! - [`access_log`]: factory badge log, searched with `git log -S`
//! - [`residences`]: one tagged chain per street, addressed with `<tag>~N`
//! - [`solution`]: the hashed answer behind the `solution` tag

pub mod access_log;
pub mod archive;
pub mod residences;
pub mod solution;

use crate::core::address::AddressIndex;
use crate::core::assets;
use crate::core::calendar;
use crate::core::config::BuildConfig;
use crate::core::error::BuildError;
use crate::core::fillers::Session;
use crate::core::history::{HistoryStore, NewCommit, ObjectId, Tree};
use crate::core::people::{self, Person};
use chrono::NaiveDateTime;
use serde::Serialize;
use tracing::info;

pub const MAIN_BRANCH: &str = "main";
pub const ADDRESSES_PATH: &str = "addresses.tsv";

/// Maximum width of wrapped commit message bodies.
pub const COMMIT_MSG_WIDTH: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Phase {
    Archive,
    AccessLog,
    Residences,
}

impl Phase {
    pub const ALL: [Phase; 3] = [Phase::Archive, Phase::AccessLog, Phase::Residences];
}

#[derive(Debug, Clone)]
pub struct BuildOptions {
    pub seed: Vec<u8>,
    /// Phases to run; empty means all of them.
    pub phases: Vec<Phase>,
    pub with_solution: bool,
    pub config: BuildConfig,
}

impl BuildOptions {
    pub fn new(seed: impl Into<Vec<u8>>) -> Self {
        Self {
            seed: seed.into(),
            phases: Vec::new(),
            with_solution: true,
            config: BuildConfig::default(),
        }
    }

    pub fn runs(&self, phase: Phase) -> bool {
        self.phases.is_empty() || self.phases.contains(&phase)
    }
}

/// Structural summary of a finished build, for display.
#[derive(Debug, Clone, Serialize)]
pub struct BuildReport {
    pub seed: String,
    pub base: Option<ObjectId>,
    pub residents: usize,
    pub archive: Option<archive::ArchiveReport>,
    pub access_log: Option<access_log::AccessLogReport>,
    pub residences: Option<residences::ResidencesReport>,
    pub solution: Option<ObjectId>,
}

/// One build in progress: the run's session, its address assignment and
/// everything committed so far.
pub struct Build<'s, S: HistoryStore + ?Sized> {
    store: &'s S,
    session: Session,
    index: AddressIndex,
    config: BuildConfig,
    report: BuildReport,
}

impl<'s, S: HistoryStore + ?Sized> Build<'s, S> {
    /// Seed the session and house every resident. Nothing is written yet.
    pub fn new(store: &'s S, seed: &[u8], config: BuildConfig) -> Result<Self, BuildError> {
        config.validate()?;
        let canonical = people::canonical();
        let mut session = Session::new(seed, &canonical);
        let index = AddressIndex::assign(
            &mut session,
            &config.streets,
            config.street_capacity,
            &canonical,
        )?;
        let report = BuildReport {
            seed: hex(seed),
            base: None,
            residents: index.resident_count(),
            archive: None,
            access_log: None,
            residences: None,
            solution: None,
        };
        Ok(Self {
            store,
            session,
            index,
            config,
            report,
        })
    }

    pub fn index(&self) -> &AddressIndex {
        &self.index
    }

    /// Address assignment used by phases that have not run yet. The listing
    /// committed in the base snapshot is not affected once written.
    pub fn index_mut(&mut self) -> &mut AddressIndex {
        &mut self.index
    }

    /// Commit the base snapshot on `main`, once.
    pub fn base(&mut self) -> Result<ObjectId, BuildError> {
        if let Some(base) = &self.report.base {
            return Ok(base.clone());
        }
        info!("committing base snapshot");
        let mut tree = Tree::new();
        tree.add_reachable_file(self.store, "README.md", assets::README.as_bytes())?;
        tree.add_reachable_file(
            self.store,
            "instructions.txt",
            assets::INSTRUCTIONS.as_bytes(),
        )?;
        tree.add_reachable_file(self.store, ADDRESSES_PATH, self.index.listing().as_bytes())?;
        let base = commit(
            self.store,
            None,
            &people::mayor(),
            calendar::date_start(),
            "Git Town",
            "",
            tree,
        )?;
        self.store.set_branch(MAIN_BRANCH, &base)?;
        self.report.base = Some(base.clone());
        Ok(base)
    }

    pub fn archive(&mut self) -> Result<&archive::ArchiveReport, BuildError> {
        let base = self.base()?;
        let report = archive::build(self.store, &mut self.session, &base, &self.config)?;
        Ok(self.report.archive.insert(report))
    }

    pub fn access_log(&mut self) -> Result<&access_log::AccessLogReport, BuildError> {
        let base = self.base()?;
        let report = access_log::build(self.store, &mut self.session, &base, &self.config)?;
        Ok(self.report.access_log.insert(report))
    }

    pub fn residences(&mut self) -> Result<&residences::ResidencesReport, BuildError> {
        let base = self.base()?;
        let report = residences::build(self.store, &mut self.session, &base, &self.index)?;
        Ok(self.report.residences.insert(report))
    }

    pub fn solution(&mut self) -> Result<ObjectId, BuildError> {
        let id = solution::encode(self.store)?;
        self.report.solution = Some(id.clone());
        Ok(id)
    }

    pub fn finish(self) -> BuildReport {
        self.report
    }
}

/// Run a whole build: base snapshot, the selected phases in order, then the
/// solution tag if requested.
pub fn generate<S: HistoryStore + ?Sized>(
    store: &S,
    options: &BuildOptions,
) -> Result<BuildReport, BuildError> {
    let mut build = Build::new(store, &options.seed, options.config.clone())?;
    build.base()?;
    if options.runs(Phase::Archive) {
        build.archive()?;
    }
    if options.runs(Phase::AccessLog) {
        build.access_log()?;
    }
    if options.runs(Phase::Residences) {
        build.residences()?;
    }
    if options.with_solution {
        build.solution()?;
    }
    Ok(build.finish())
}

/// Write one commit. An empty body yields a title-only message.
pub fn commit<S: HistoryStore + ?Sized>(
    store: &S,
    parent: Option<&ObjectId>,
    author: &Person,
    when: NaiveDateTime,
    title: &str,
    body: &str,
    tree: Tree,
) -> Result<ObjectId, BuildError> {
    let id = store.commit(&NewCommit {
        parent: parent.cloned(),
        author: author.clone(),
        when,
        message: commit_message(title, body),
        tree,
    })?;
    Ok(id)
}

pub fn commit_message(title: &str, body: &str) -> String {
    if body.trim().is_empty() {
        format!("{}\n", title)
    } else {
        format!("{}\n\n{}\n", title, wrap_paragraphs(body, COMMIT_MSG_WIDTH))
    }
}

/// Wrap each blank-line separated paragraph on its own; line breaks inside a
/// paragraph are treated as spaces.
pub fn wrap_paragraphs(text: &str, width: usize) -> String {
    text.split("\n\n")
        .map(|paragraph| wrap(paragraph, width).join("\n"))
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn wrap(paragraph: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut line = String::new();
    for word in paragraph.split_whitespace() {
        if !line.is_empty() && line.chars().count() + 1 + word.chars().count() > width {
            lines.push(std::mem::take(&mut line));
        }
        if !line.is_empty() {
            line.push(' ');
        }
        line.push_str(word);
    }
    if !line.is_empty() {
        lines.push(line);
    }
    lines
}

pub fn hex(bytes: &[u8]) -> String {
    ::hex::encode(bytes)
}

/// Parse a hex seed as given on the command line.
pub fn parse_hex(text: &str) -> Result<Vec<u8>, BuildError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(BuildError::InvalidSeed("empty seed".into()));
    }
    ::hex::decode(text).map_err(|e| BuildError::InvalidSeed(format!("{:?}: {}", text, e)))
}
