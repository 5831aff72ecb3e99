//! In-process history store.
//!
//! Objects are framed like git objects (`"<kind> <len>\0<payload>"`) but
//! addressed by SHA-256. Used for tests and dry runs.

use crate::core::error::StoreError;
use crate::core::history::{CommitRecord, HistoryStore, NewCommit, ObjectId};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Debug, Clone)]
enum Object {
    Blob(Vec<u8>),
    Commit(CommitRecord),
}

#[derive(Debug, Default)]
struct State {
    objects: BTreeMap<ObjectId, Object>,
    branches: BTreeMap<String, ObjectId>,
    tags: BTreeMap<String, ObjectId>,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<State>,
}

fn framed_id(kind: &str, payload: &[u8]) -> ObjectId {
    let mut hasher = Sha256::new();
    hasher.update(format!("{} {}\0", kind, payload.len()));
    hasher.update(payload);
    ObjectId::new(format!("{:x}", hasher.finalize()))
}

fn serialize_commit(commit: &NewCommit) -> Vec<u8> {
    let mut out = String::from("tree\n");
    for (path, id) in commit.tree.entries() {
        out.push_str(&format!("{} {}\n", id, path));
    }
    if let Some(parent) = &commit.parent {
        out.push_str(&format!("parent {}\n", parent));
    }
    out.push_str(&format!(
        "author {} {}\n\n{}",
        commit.author,
        commit.when.and_utc().timestamp(),
        commit.message
    ));
    out.into_bytes()
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, State> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, State> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }

    pub fn object_count(&self) -> usize {
        self.read().objects.len()
    }
}

impl HistoryStore for MemoryStore {
    fn hash_object(&self, bytes: &[u8]) -> Result<ObjectId, StoreError> {
        Ok(framed_id("blob", bytes))
    }

    fn add_pooled_object(&self, bytes: &[u8]) -> Result<ObjectId, StoreError> {
        let id = framed_id("blob", bytes);
        self.write()
            .objects
            .entry(id.clone())
            .or_insert_with(|| Object::Blob(bytes.to_vec()));
        Ok(id)
    }

    fn read_object(&self, id: &ObjectId) -> Result<Vec<u8>, StoreError> {
        match self.read().objects.get(id) {
            Some(Object::Blob(bytes)) => Ok(bytes.clone()),
            Some(Object::Commit(_)) => Err(StoreError::WrongKind {
                id: id.to_string(),
                expected: "blob",
            }),
            None => Err(StoreError::NotFound(id.to_string())),
        }
    }

    fn commit(&self, commit: &NewCommit) -> Result<ObjectId, StoreError> {
        let mut state = self.write();
        if let Some(parent) = &commit.parent
            && !matches!(state.objects.get(parent), Some(Object::Commit(_)))
        {
            return Err(StoreError::NotFound(format!("parent commit {}", parent)));
        }
        for (path, id) in commit.tree.entries() {
            if !matches!(state.objects.get(id), Some(Object::Blob(_))) {
                return Err(StoreError::NotFound(format!("blob {} for {}", id, path)));
            }
        }
        let id = framed_id("commit", &serialize_commit(commit));
        state.objects.entry(id.clone()).or_insert_with(|| {
            Object::Commit(CommitRecord {
                id: id.clone(),
                parent: commit.parent.clone(),
                author: commit.author.clone(),
                when: commit.when,
                message: commit.message.clone(),
                tree: commit.tree.clone(),
            })
        });
        Ok(id)
    }

    fn read_commit(&self, id: &ObjectId) -> Result<CommitRecord, StoreError> {
        match self.read().objects.get(id) {
            Some(Object::Commit(record)) => Ok(record.clone()),
            Some(Object::Blob(_)) => Err(StoreError::WrongKind {
                id: id.to_string(),
                expected: "commit",
            }),
            None => Err(StoreError::NotFound(id.to_string())),
        }
    }

    fn set_branch(&self, name: &str, target: &ObjectId) -> Result<(), StoreError> {
        let mut state = self.write();
        if !matches!(state.objects.get(target), Some(Object::Commit(_))) {
            return Err(StoreError::WrongKind {
                id: target.to_string(),
                expected: "commit",
            });
        }
        state.branches.insert(name.to_string(), target.clone());
        Ok(())
    }

    fn branches(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.read().branches.keys().cloned().collect())
    }

    fn branch_head(&self, name: &str) -> Result<Option<ObjectId>, StoreError> {
        Ok(self.read().branches.get(name).cloned())
    }

    fn tag_object(&self, name: &str, target: &ObjectId) -> Result<(), StoreError> {
        let mut state = self.write();
        if state.tags.contains_key(name) {
            return Err(StoreError::RefExists(format!("tag {}", name)));
        }
        if !state.objects.contains_key(target) {
            return Err(StoreError::NotFound(target.to_string()));
        }
        state.tags.insert(name.to_string(), target.clone());
        Ok(())
    }

    fn tags(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.read().tags.keys().cloned().collect())
    }

    fn resolve_tag(&self, name: &str) -> Result<Option<ObjectId>, StoreError> {
        Ok(self.read().tags.get(name).cloned())
    }

    fn delete_tag(&self, name: &str) -> Result<(), StoreError> {
        match self.write().tags.remove(name) {
            Some(_) => Ok(()),
            None => Err(StoreError::NotFound(format!("tag {}", name))),
        }
    }
}
