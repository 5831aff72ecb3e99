//! Residents of Git Town.
//!
//! Canonical persons are fixed across every generated mystery; everyone else
//! is a filler drawn from a [`Session`](crate::core::fillers::Session).

use serde::{Deserialize, Serialize};
use std::fmt;

/// A resident, committer, or both. Ordered by name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Person {
    pub name: String,
    pub email: String,
}

impl Person {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
        }
    }

    /// Local part of the email, used for per-person branch names.
    pub fn handle(&self) -> &str {
        self.email.split('@').next().unwrap_or(&self.email)
    }

    /// `(given name, surname)` pair; multi-word surnames stay joined.
    pub fn name_pair(&self) -> (String, String) {
        match self.name.split_once(' ') {
            Some((given, surname)) => (given.to_string(), surname.to_string()),
            None => (self.name.clone(), String::new()),
        }
    }
}

impl fmt::Display for Person {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} <{}>", self.name, self.email)
    }
}

const MAYOR: (&str, &str) = ("Dolores Wholfump", "mayor@gittown.gov");

const MAIN_DETECTIVE: (&str, &str) = ("Sam Bisect", "sbisect@gtpd.gov");

const OTHER_DETECTIVES: &[(&str, &str)] = &[
    ("Olive Blame", "oblame@gtpd.gov"),
    ("Hugo Fetchley", "hfetchley@gtpd.gov"),
    ("Nina Amend", "namend@gtpd.gov"),
    ("Percy Squash", "psquash@gtpd.gov"),
];

// Order matters: interview and investigation texts are numbered after it, and
// the culprit is picked by index.
const SUSPECTS: &[(&str, &str)] = &[
    ("Rebecca Stashwood", "rstashwood@rebase.org"),
    ("Marcus Cherrypick", "mcherrypick@thegit.com"),
    ("Yolanda Reflog", "yreflog@committers.org"),
];

const FACTORY_WORKERS: &[(&str, &str)] = &[
    ("Gus Rebaser", "grebaser@gitfactory.com"),
    ("Tilda Worktree", "tworktree@gitfactory.com"),
    ("Omar Stashley", "ostashley@gitfactory.com"),
    ("Ivy Cloneman", "icloneman@gitfactory.com"),
    ("Bert Headley", "bheadley@gitfactory.com"),
    ("Lena Taggart", "ltaggart@gitfactory.com"),
];

fn people(table: &[(&str, &str)]) -> Vec<Person> {
    table.iter().map(|(n, e)| Person::new(*n, *e)).collect()
}

pub fn mayor() -> Person {
    Person::new(MAYOR.0, MAYOR.1)
}

pub fn main_detective() -> Person {
    Person::new(MAIN_DETECTIVE.0, MAIN_DETECTIVE.1)
}

pub fn other_detectives() -> Vec<Person> {
    people(OTHER_DETECTIVES)
}

/// Other detectives plus the main detective.
pub fn all_detectives() -> Vec<Person> {
    let mut all = other_detectives();
    all.push(main_detective());
    all
}

pub fn suspects() -> Vec<Person> {
    people(SUSPECTS)
}

pub fn factory_workers() -> Vec<Person> {
    people(FACTORY_WORKERS)
}

/// Branch holding the main detective's access log investigation.
pub fn lead_detective_branch() -> String {
    format!("detectives/{}", main_detective().handle())
}

/// Every canonical person, sorted by name.
pub fn canonical() -> Vec<Person> {
    let mut everyone = vec![mayor()];
    everyone.extend(all_detectives());
    everyone.extend(suspects());
    everyone.extend(factory_workers());
    everyone.sort();
    everyone
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn canonical_names_are_unique() {
        let everyone = canonical();
        let pairs: HashSet<_> = everyone.iter().map(Person::name_pair).collect();
        assert_eq!(pairs.len(), everyone.len());
        let emails: HashSet<_> = everyone.iter().map(|p| p.email.as_str()).collect();
        assert_eq!(emails.len(), everyone.len());
    }

    #[test]
    fn canonical_is_sorted_by_name() {
        let everyone = canonical();
        assert!(everyone.windows(2).all(|w| w[0].name <= w[1].name));
    }

    #[test]
    fn handle_is_email_local_part() {
        assert_eq!(main_detective().handle(), "sbisect");
        assert_eq!(lead_detective_branch(), "detectives/sbisect");
    }

    #[test]
    fn main_detective_is_not_among_others() {
        assert!(!other_detectives().contains(&main_detective()));
        assert!(all_detectives().contains(&main_detective()));
    }
}
