//! The hashed answer.
//!
//! The culprit's name never appears as an answer anywhere in history. Instead
//! the `solution` tag points straight at a content object holding the hex id
//! the culprit's name (plus newline) hashes to, so players check a guess with
//! `echo "Name" | git hash-object --stdin` and `git show solution`.

use crate::core::error::BuildError;
use crate::core::history::{HistoryStore, ObjectId};
use crate::core::people::{self, Person};
use tracing::info;

pub const SOLUTION_TAG: &str = "solution";

/// Public key the culprit is derived from; see [`culprit_index`].
pub const CULPRIT_KEY: usize = 2869;

/// Index of the culprit among `suspects` suspects: `CULPRIT_KEY % suspects`.
pub fn culprit_index(suspects: usize) -> usize {
    if suspects == 0 {
        return 0;
    }
    CULPRIT_KEY % suspects
}

pub fn culprit() -> Person {
    let suspects = people::suspects();
    suspects[culprit_index(suspects.len())].clone()
}

/// Bytes a correct answer hashes from.
pub fn answer(name: &str) -> String {
    format!("{}\n", name)
}

/// Pool the hash of the culprit's answer and tag it.
pub fn encode<S: HistoryStore + ?Sized>(store: &S) -> Result<ObjectId, BuildError> {
    let hash = store.hash_object(answer(&culprit().name).as_bytes())?;
    let id = store.add_pooled_object(hash.as_str().as_bytes())?;
    store.tag_object(SOLUTION_TAG, &id)?;
    info!(tag = SOLUTION_TAG, object = %id, "solution tagged");
    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::memory::MemoryStore;

    #[test]
    fn culprit_is_the_second_suspect() {
        assert_eq!(culprit_index(3), 1);
        assert_eq!(culprit().name, "Marcus Cherrypick");
        assert_eq!(culprit_index(0), 0);
    }

    #[test]
    fn tag_points_at_hash_of_answer() {
        let store = MemoryStore::new();
        let id = encode(&store).unwrap();
        assert_eq!(store.resolve_tag(SOLUTION_TAG).unwrap(), Some(id.clone()));

        let content = store.read_object(&id).unwrap();
        let expected = store.hash_object(b"Marcus Cherrypick\n").unwrap();
        assert_eq!(content, expected.as_str().as_bytes());
        assert!(!String::from_utf8(content).unwrap().contains("Marcus"));
    }

    #[test]
    fn hashing_the_answer_does_not_store_it() {
        let store = MemoryStore::new();
        encode(&store).unwrap();
        let hash = store.hash_object(answer(&culprit().name).as_bytes()).unwrap();
        assert!(store.read_object(&hash).is_err());
    }

    #[test]
    fn encoding_twice_is_rejected() {
        let store = MemoryStore::new();
        encode(&store).unwrap();
        assert!(encode(&store).is_err());
    }
}
