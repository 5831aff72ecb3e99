//! History persistence provider interface.
//!
//! A [`HistoryStore`] is a content-addressed object database with named
//! branches and tags. It has no "current branch": every commit names its
//! parent explicitly, so any number of chains can be appended to any base,
//! from any thread.
//!
//! Reachability comes in two tiers:
//! - [`Tree::add_reachable_file`] puts content in a commit's tree, where any
//!   tree walk or checkout finds it;
//! - [`HistoryStore::add_pooled_object`] only stores the bytes and returns
//!   their id; they become fetchable through an orphan tree or
//!   [`HistoryStore::tag_object`], never through ordinary history.

use crate::core::error::StoreError;
use crate::core::people::Person;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Hex content id of an object.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectId(String);

impl ObjectId {
    pub fn new(hex: impl Into<String>) -> Self {
        Self(hex.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Tracked files of a snapshot: slash-separated path -> content id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tree {
    entries: BTreeMap<String, ObjectId>,
}

impl Tree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `bytes` and track them at `path`.
    pub fn add_reachable_file<S: HistoryStore + ?Sized>(
        &mut self,
        store: &S,
        path: &str,
        bytes: &[u8],
    ) -> Result<ObjectId, StoreError> {
        let id = store.add_pooled_object(bytes)?;
        self.entries.insert(path.to_string(), id.clone());
        Ok(id)
    }

    /// Track an already stored object at `path`.
    pub fn insert(&mut self, path: impl Into<String>, id: ObjectId) {
        self.entries.insert(path.into(), id);
    }

    pub fn remove(&mut self, path: &str) -> Option<ObjectId> {
        self.entries.remove(path)
    }

    pub fn get(&self, path: &str) -> Option<&ObjectId> {
        self.entries.get(path)
    }

    pub fn entries(&self) -> impl Iterator<Item = (&String, &ObjectId)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A commit about to be written.
#[derive(Debug, Clone)]
pub struct NewCommit {
    pub parent: Option<ObjectId>,
    pub author: Person,
    pub when: NaiveDateTime,
    pub message: String,
    pub tree: Tree,
}

/// A commit read back from a store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitRecord {
    pub id: ObjectId,
    pub parent: Option<ObjectId>,
    pub author: Person,
    pub when: NaiveDateTime,
    pub message: String,
    pub tree: Tree,
}

impl CommitRecord {
    pub fn title(&self) -> &str {
        self.message.lines().next().unwrap_or("")
    }

    /// Everything after the title and its blank separator line.
    pub fn body(&self) -> &str {
        match self.message.split_once('\n') {
            Some((_, rest)) => rest.trim_start_matches('\n'),
            None => "",
        }
    }
}

pub trait HistoryStore: Send + Sync {
    /// Content id `bytes` would get, without storing them.
    fn hash_object(&self, bytes: &[u8]) -> Result<ObjectId, StoreError>;

    /// Store `bytes` outside of any tree and return their id.
    fn add_pooled_object(&self, bytes: &[u8]) -> Result<ObjectId, StoreError>;

    /// Bytes of a stored content object. Commits are not content objects.
    fn read_object(&self, id: &ObjectId) -> Result<Vec<u8>, StoreError>;

    fn commit(&self, commit: &NewCommit) -> Result<ObjectId, StoreError>;

    fn read_commit(&self, id: &ObjectId) -> Result<CommitRecord, StoreError>;

    /// Create or move a branch.
    fn set_branch(&self, name: &str, target: &ObjectId) -> Result<(), StoreError>;

    /// Local branch names, plus remote-tracking ones as `<remote>/<name>`.
    fn branches(&self) -> Result<Vec<String>, StoreError>;

    fn branch_head(&self, name: &str) -> Result<Option<ObjectId>, StoreError>;

    /// Point a new, immutable tag at a commit or directly at a content object.
    fn tag_object(&self, name: &str, target: &ObjectId) -> Result<(), StoreError>;

    fn tags(&self) -> Result<Vec<String>, StoreError>;

    fn resolve_tag(&self, name: &str) -> Result<Option<ObjectId>, StoreError>;

    fn delete_tag(&self, name: &str) -> Result<(), StoreError>;

    /// First-parent history from `head`, newest first.
    fn log(&self, head: &ObjectId) -> Result<Vec<CommitRecord>, StoreError> {
        let mut out = Vec::new();
        let mut next = Some(head.clone());
        while let Some(id) = next {
            let commit = self.read_commit(&id)?;
            next = commit.parent.clone();
            out.push(commit);
        }
        Ok(out)
    }

    /// The commit `n` parent hops before `head` (`head~n`).
    fn ancestor(&self, head: &ObjectId, n: usize) -> Result<ObjectId, StoreError> {
        let mut current = head.clone();
        for hop in 0..n {
            current = self.read_commit(&current)?.parent.ok_or_else(|| {
                StoreError::NotFound(format!("{}~{} (history ends after {} hops)", head, n, hop))
            })?;
        }
        Ok(current)
    }

    /// Commits by `author` (matched by name) with `start <= when < end`.
    fn log_by_author_between(
        &self,
        head: &ObjectId,
        author: &str,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Vec<CommitRecord>, StoreError> {
        Ok(self
            .log(head)?
            .into_iter()
            .filter(|c| c.author.name == author && start <= c.when && c.when < end)
            .collect())
    }

    /// Commits that change the number of occurrences of `token` in some file.
    fn pickaxe(&self, head: &ObjectId, token: &str) -> Result<Vec<CommitRecord>, StoreError> {
        let empty = Tree::new();
        let history = self.log(head)?;
        let mut out = Vec::new();
        for (i, commit) in history.iter().enumerate() {
            let parent_tree = history.get(i + 1).map(|p| &p.tree).unwrap_or(&empty);
            if changes_occurrences(self, parent_tree, &commit.tree, token)? {
                out.push(commit.clone());
            }
        }
        Ok(out)
    }

    /// Contents of a tracked file at `commit`, if tracked there.
    fn read_file(&self, commit: &ObjectId, path: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let record = self.read_commit(commit)?;
        match record.tree.get(path) {
            Some(id) => Ok(Some(self.read_object(id)?)),
            None => Ok(None),
        }
    }
}

fn changes_occurrences<S: HistoryStore + ?Sized>(
    store: &S,
    old: &Tree,
    new: &Tree,
    token: &str,
) -> Result<bool, StoreError> {
    let paths: BTreeSet<&String> = old.entries.keys().chain(new.entries.keys()).collect();
    for path in paths {
        let (before, after) = (old.get(path), new.get(path));
        if before == after {
            continue;
        }
        let count = |id: Option<&ObjectId>| -> Result<usize, StoreError> {
            match id {
                Some(id) => Ok(occurrences(&store.read_object(id)?, token)),
                None => Ok(0),
            }
        };
        if count(before)? != count(after)? {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Non-overlapping occurrences of `token` in `bytes`.
pub fn occurrences(bytes: &[u8], token: &str) -> usize {
    if token.is_empty() {
        return 0;
    }
    String::from_utf8_lossy(bytes).matches(token).count()
}

/// Every branch whose name is `suffix` or ends with `/<suffix>`.
pub fn branches_with_suffix<S: HistoryStore + ?Sized>(
    store: &S,
    suffix: &str,
) -> Result<Vec<String>, StoreError> {
    let nested = format!("/{}", suffix);
    Ok(store
        .branches()?
        .into_iter()
        .filter(|b| b == suffix || b.ends_with(&nested))
        .collect())
}
