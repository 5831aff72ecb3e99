//! Streets, house slots and the town's address listing.

use crate::core::config::{Span, slugify};
use crate::core::error::BuildError;
use crate::core::fillers::Session;
use crate::core::people::Person;
use rand::Rng;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::LazyLock;

static ADDRESS_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([1-9][0-9]*) (\S.*)$").unwrap());

/// Header row of the address listing.
pub const LISTING_HEADER: &str = "Name\tAddress";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub street: String,
    /// 1-based.
    pub house: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Street {
    pub name: String,
    /// Residents by house: `residents[0]` lives at number 1.
    pub residents: Vec<Person>,
}

impl Street {
    pub fn capacity(&self) -> usize {
        self.residents.len()
    }

    pub fn tag_name(&self) -> String {
        street_tag(&self.name)
    }
}

/// Tag under which a street's chain head is published.
pub fn street_tag(street: &str) -> String {
    format!("street/{}", slugify(street))
}

/// Total assignment of residents to houses. Built once, read-only afterwards.
#[derive(Debug, Clone)]
pub struct AddressIndex {
    streets: Vec<Street>,
    by_name: BTreeMap<String, Address>,
}

impl AddressIndex {
    /// Place every canonical person in a random free house, then fill every
    /// remaining house with a fresh filler from the session.
    pub fn assign(
        session: &mut Session,
        street_names: &[String],
        capacity: Span,
        canonical: &[Person],
    ) -> Result<Self, BuildError> {
        let capacities: Vec<usize> = street_names
            .iter()
            .map(|_| session.rng().gen_range(capacity.min..=capacity.max))
            .collect();
        let total: usize = capacities.iter().sum();
        if total < canonical.len() {
            return Err(BuildError::NotEnoughHouses {
                capacity: total,
                residents: canonical.len(),
            });
        }

        let mut slots: Vec<Vec<Option<Person>>> =
            capacities.iter().map(|c| vec![None; *c]).collect();
        let mut free: Vec<(usize, usize)> = capacities
            .iter()
            .enumerate()
            .flat_map(|(s, c)| (0..*c).map(move |h| (s, h)))
            .collect();

        let mut ordered = canonical.to_vec();
        ordered.sort();
        for person in ordered {
            let pick = session.rng().gen_range(0..free.len());
            let (s, h) = free.swap_remove(pick);
            slots[s][h] = Some(person);
        }

        let mut streets = Vec::with_capacity(street_names.len());
        for (name, houses) in street_names.iter().zip(slots) {
            let mut residents = Vec::with_capacity(houses.len());
            for slot in houses {
                let person = match slot {
                    Some(person) => person,
                    None => session.next_person().ok_or(BuildError::NamePoolExhausted)?,
                };
                residents.push(person);
            }
            streets.push(Street {
                name: name.clone(),
                residents,
            });
        }
        Ok(Self::from_streets(streets))
    }

    pub fn from_streets(streets: Vec<Street>) -> Self {
        let mut by_name = BTreeMap::new();
        for street in &streets {
            for (i, person) in street.residents.iter().enumerate() {
                by_name.insert(
                    person.name.clone(),
                    Address {
                        street: street.name.clone(),
                        house: i + 1,
                    },
                );
            }
        }
        Self { streets, by_name }
    }

    pub fn streets(&self) -> &[Street] {
        &self.streets
    }

    pub fn address_of(&self, name: &str) -> Option<&Address> {
        self.by_name.get(name)
    }

    pub fn resident_at(&self, street: &str, house: usize) -> Option<&Person> {
        let street = self.streets.iter().find(|s| s.name == street)?;
        street.residents.get(house.checked_sub(1)?)
    }

    pub fn resident_count(&self) -> usize {
        self.by_name.len()
    }

    /// Tab-separated listing of every resident, sorted by name.
    pub fn listing(&self) -> String {
        let mut out = String::from(LISTING_HEADER);
        out.push('\n');
        for (name, address) in &self.by_name {
            out.push_str(&format!("{}\t{} {}\n", name, address.house, address.street));
        }
        out
    }

    /// Exchange the houses of two residents. Returns false if either is unknown.
    pub fn swap_residents(&mut self, a: &str, b: &str) -> bool {
        let (Some(addr_a), Some(addr_b)) = (self.by_name.get(a), self.by_name.get(b)) else {
            return false;
        };
        let (addr_a, addr_b) = (addr_a.clone(), addr_b.clone());
        let person_a = self.resident_at(&addr_a.street, addr_a.house).cloned();
        let person_b = self.resident_at(&addr_b.street, addr_b.house).cloned();
        let (Some(person_a), Some(person_b)) = (person_a, person_b) else {
            return false;
        };
        for street in &mut self.streets {
            if street.name == addr_a.street {
                street.residents[addr_a.house - 1] = person_b.clone();
            }
            if street.name == addr_b.street {
                street.residents[addr_b.house - 1] = person_a.clone();
            }
        }
        self.by_name.insert(a.to_string(), addr_b);
        self.by_name.insert(b.to_string(), addr_a);
        true
    }
}

/// Parse an address listing back into `name -> address`.
pub fn parse_listing(text: &str) -> Result<BTreeMap<String, Address>, String> {
    let mut lines = text.lines();
    match lines.next() {
        Some(header) if header.trim_end() == LISTING_HEADER => {}
        other => return Err(format!("unexpected listing header: {:?}", other)),
    }
    let mut out = BTreeMap::new();
    for (n, line) in lines.enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let (name, address) = line
            .split_once('\t')
            .ok_or_else(|| format!("line {}: missing tab separator", n + 2))?;
        let caps = ADDRESS_PATTERN
            .captures(address.trim_end())
            .ok_or_else(|| format!("line {}: malformed address {:?}", n + 2, address))?;
        let house = caps[1]
            .parse::<usize>()
            .map_err(|e| format!("line {}: {}", n + 2, e))?;
        out.insert(
            name.to_string(),
            Address {
                street: caps[2].to_string(),
                house,
            },
        );
    }
    Ok(out)
}
