//! Per-run generator of filler identities, identifiers, prose and timestamps.
//!
//! A [`Session`] owns the seeded random stream and the exclusion sets, so two
//! builds in the same process never interfere. Same seed = same sequences.

use crate::core::assets;
use crate::core::people::Person;
use chrono::{Duration, NaiveDateTime};
use rand::Rng;
use rand::SeedableRng;
use rand::seq::SliceRandom;
use rand_chacha::ChaCha20Rng;
use rustc_hash::FxHashSet;
use sha2::{Digest, Sha256};

const PROVIDERS: &[&str] = &["gitgle.com", "rebase.org", "committers.org", "thegit.com"];

/// Report identifiers are drawn from `ID_MIN..ID_MAX`.
const ID_MIN: u32 = 10_000;
const ID_MAX: u32 = 999_999;

pub struct Session {
    rng: ChaCha20Rng,
    given_names: Vec<String>,
    surnames: Vec<String>,
    paragraphs: Vec<String>,
    taken_names: FxHashSet<(String, String)>,
    /// How many corpus combinations `taken_names` already covers.
    corpus_taken: usize,
    taken_emails: FxHashSet<String>,
    issued_ids: FxHashSet<u32>,
}

impl Session {
    /// Start a session from arbitrary seed bytes. `reserved` persons' names are
    /// never handed out as fillers.
    pub fn new(seed: &[u8], reserved: &[Person]) -> Self {
        let key: [u8; 32] = Sha256::digest(seed).into();
        let mut given_names = assets::corpus_lines(assets::GIVEN_NAMES);
        let mut surnames = assets::corpus_lines(assets::SURNAMES);
        given_names.dedup();
        surnames.dedup();
        let taken_names: FxHashSet<_> = reserved.iter().map(Person::name_pair).collect();
        let corpus_taken = taken_names
            .iter()
            .filter(|(g, s)| given_names.contains(g) && surnames.contains(s))
            .count();
        Self {
            rng: ChaCha20Rng::from_seed(key),
            given_names,
            surnames,
            paragraphs: assets::book_paragraphs(assets::BOOK),
            taken_names,
            corpus_taken,
            taken_emails: reserved.iter().map(|p| p.email.clone()).collect(),
            issued_ids: FxHashSet::default(),
        }
    }

    pub fn rng(&mut self) -> &mut ChaCha20Rng {
        &mut self.rng
    }

    /// Next never-before-seen filler person, or `None` once every
    /// (given name, surname) combination is taken.
    pub fn next_person(&mut self) -> Option<Person> {
        let space = self.given_names.len() * self.surnames.len();
        if self.corpus_taken >= space {
            return None;
        }
        loop {
            let given = self.given_names[self.rng.gen_range(0..self.given_names.len())].clone();
            let surname = self.surnames[self.rng.gen_range(0..self.surnames.len())].clone();
            let pair = (given, surname);
            if self.taken_names.contains(&pair) {
                continue;
            }
            let (given, surname) = pair;
            let provider = PROVIDERS[self.rng.gen_range(0..PROVIDERS.len())];
            let initial = given.chars().next().map(|c| c.to_lowercase().to_string());
            let local = format!("{}{}", initial.unwrap_or_default(), surname.to_lowercase());
            let mut email = format!("{}@{}", local, provider);
            let mut suffix = 2;
            while self.taken_emails.contains(&email) {
                email = format!("{}{}@{}", local, suffix, provider);
                suffix += 1;
            }
            self.taken_emails.insert(email.clone());
            let person = Person::new(format!("{} {}", given, surname), email);
            self.taken_names.insert((given, surname));
            self.corpus_taken += 1;
            return Some(person);
        }
    }

    /// Unbounded stream of filler persons; ends only when the name space does.
    pub fn people(&mut self) -> impl Iterator<Item = Person> + '_ {
        std::iter::from_fn(move || self.next_person())
    }

    /// Next identifier not issued before in this session.
    pub fn next_id(&mut self) -> u32 {
        loop {
            let id = self.rng.gen_range(ID_MIN..ID_MAX);
            if self.issued_ids.insert(id) {
                return id;
            }
        }
    }

    pub fn ids(&mut self) -> impl Iterator<Item = u32> + '_ {
        std::iter::from_fn(move || Some(self.next_id()))
    }

    /// Between two and six consecutive corpus paragraphs, separated by blank lines.
    pub fn paragraphs(&mut self) -> String {
        let count = 2 + self.rng.gen_range(0..5);
        self.paragraph_window(count)
    }

    /// `count` consecutive paragraphs starting at a random one; shorter when the
    /// window runs past the end of the corpus.
    pub fn paragraph_window(&mut self, count: usize) -> String {
        if self.paragraphs.is_empty() {
            return String::new();
        }
        let start = self.rng.gen_range(0..self.paragraphs.len());
        let end = (start + count).min(self.paragraphs.len());
        self.paragraphs[start..end].join("\n\n")
    }

    /// Uniformly random minute in `[start, end)`.
    pub fn datetime(&mut self, start: NaiveDateTime, end: NaiveDateTime) -> NaiveDateTime {
        let minutes = (end - start).num_minutes();
        if minutes <= 0 {
            return start;
        }
        start + Duration::minutes(self.rng.gen_range(0..minutes))
    }

    /// `count` random minutes in `[start, end)`, sorted ascending.
    pub fn datetimes(
        &mut self,
        count: usize,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Vec<NaiveDateTime> {
        let mut out: Vec<_> = (0..count).map(|_| self.datetime(start, end)).collect();
        out.sort();
        out
    }

    /// Uniform pick from a non-empty slice.
    pub fn pick<'a, T>(&mut self, items: &'a [T]) -> Option<&'a T> {
        items.choose(&mut self.rng)
    }
}
