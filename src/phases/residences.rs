//! Phase C: one tagged chain of house commits per street.
//!
//! Relative references (`street/x~3`) are how a player walks to a house: the
//! tag sits on the street commit and houses are committed in descending order,
//! so house `h` is exactly `h` hops behind it. Suspects' houses also carry a
//! pointer to their investigation file, which is only reachable through that
//! pointer or the orphan `investigations` branch.

use crate::core::address::AddressIndex;
use crate::core::assets;
use crate::core::calendar;
use crate::core::error::BuildError;
use crate::core::fillers::Session;
use crate::core::history::{HistoryStore, ObjectId, Tree};
use crate::core::people::{self, Person};
use crate::phases::commit;
use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info};

/// Per-house file naming the investigation object of its resident.
pub const INVESTIGATION_POINTER: &str = "investigation.ref";

/// Orphan branch holding every investigation object.
pub const INVESTIGATIONS_BRANCH: &str = "investigations";

#[derive(Debug, Clone, Serialize)]
pub struct StreetReport {
    pub name: String,
    pub tag: String,
    pub head: ObjectId,
    pub capacity: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResidencesReport {
    pub streets: Vec<StreetReport>,
    /// Head of the orphan investigations branch.
    pub investigations: ObjectId,
    /// Pooled investigation objects, in street then descending house order.
    pub pooled: Vec<ObjectId>,
}

/// Everything needed to write one house commit.
#[derive(Debug, Clone)]
pub struct HousePlan {
    pub house: usize,
    pub resident: Person,
    pub testimony: String,
    pub investigation: Option<&'static str>,
}

/// A street's chain, houses in descending order (the order they are
/// committed in).
#[derive(Debug, Clone)]
pub struct StreetPlan {
    pub name: String,
    pub tag: String,
    pub houses: Vec<HousePlan>,
}

#[derive(Debug, Clone)]
pub struct Chain {
    pub head: ObjectId,
    pub pooled: Vec<ObjectId>,
}

/// Draw every street's testimony from the session, in street order.
pub fn plan(session: &mut Session, index: &AddressIndex) -> Vec<StreetPlan> {
    let suspects = people::suspects();
    index
        .streets()
        .iter()
        .map(|street| {
            let houses = (1..=street.capacity())
                .rev()
                .map(|house| {
                    let resident = street.residents[house - 1].clone();
                    match suspects.iter().position(|s| *s == resident) {
                        Some(i) => HousePlan {
                            house,
                            resident,
                            testimony: assets::interview(i).unwrap_or_default().to_string(),
                            investigation: assets::investigation(i),
                        },
                        None => HousePlan {
                            house,
                            resident,
                            testimony: session.paragraphs(),
                            investigation: None,
                        },
                    }
                })
                .collect();
            StreetPlan {
                name: street.name.clone(),
                tag: street.tag_name(),
                houses,
            }
        })
        .collect()
}

/// Append one street's house commits and its street commit to `base`.
/// Touches no reference, so any number of chains can be written at once.
pub fn append_chain<S: HistoryStore + ?Sized>(
    store: &S,
    base: &ObjectId,
    street: &StreetPlan,
) -> Result<Chain, BuildError> {
    let mayor = people::mayor();
    let when = calendar::date_start();
    let tree = store.read_commit(base)?.tree;

    let mut head = base.clone();
    let mut pooled = Vec::new();
    for house in &street.houses {
        let mut house_tree = tree.clone();
        if let Some(text) = house.investigation {
            let id = store.add_pooled_object(text.as_bytes())?;
            house_tree.add_reachable_file(
                store,
                INVESTIGATION_POINTER,
                format!("{}\n", id).as_bytes(),
            )?;
            pooled.push(id);
        }
        let title = format!("{} {}", house.house, street.name);
        head = commit(store, Some(&head), &mayor, when, &title, &house.testimony, house_tree)?;
    }
    head = commit(store, Some(&head), &mayor, when, &street.name, "", tree)?;
    debug!(street = %street.name, houses = street.houses.len(), head = %head, "street chain written");
    Ok(Chain { head, pooled })
}

pub fn build<S: HistoryStore + ?Sized>(
    store: &S,
    session: &mut Session,
    base: &ObjectId,
    index: &AddressIndex,
) -> Result<ResidencesReport, BuildError> {
    let plans = plan(session, index);
    info!(streets = plans.len(), "building residences");

    let chains = plans
        .par_iter()
        .map(|street| append_chain(store, base, street))
        .collect::<Result<Vec<_>, _>>()?;

    let mut streets = Vec::with_capacity(plans.len());
    let mut pooled = Vec::new();
    for (street, chain) in plans.iter().zip(chains) {
        store.tag_object(&street.tag, &chain.head)?;
        streets.push(StreetReport {
            name: street.name.clone(),
            tag: street.tag.clone(),
            head: chain.head,
            capacity: street.houses.len(),
        });
        pooled.extend(chain.pooled);
    }

    let mut tree = Tree::new();
    for id in &pooled {
        tree.insert(id.as_str(), id.clone());
    }
    let investigations = commit(
        store,
        None,
        &people::mayor(),
        calendar::date_start(),
        "Investigations",
        "",
        tree,
    )?;
    store.set_branch(INVESTIGATIONS_BRANCH, &investigations)?;

    Ok(ResidencesReport {
        streets,
        investigations,
        pooled,
    })
}
