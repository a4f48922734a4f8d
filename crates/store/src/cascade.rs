//! Cascading delete traversal.
//!
//! Removing an object walks its outgoing strong links: a strong-link target
//! that loses its last strong incoming link (counted across all origins not
//! themselves pending removal) is scheduled for removal too, to a fixpoint.
//! Links into removed objects from surviving origins are nullified and
//! reported. Cycles, including self-links, terminate through the visited
//! set; each object is finalized exactly once.

use crate::error::Result;
use crate::keys::{ColKey, ObjKey, ObjLink, TableKey};
use crate::schema::LinkStrength;
use crate::store::Store;
use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};
use tracing::debug;

/// One removed object, in removal order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemovedRow {
    pub table: TableKey,
    pub key: ObjKey,
}

/// One link site that was set to null (or had its entry removed) because its
/// target went away. The origin object itself survives.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NullifiedLink {
    pub origin_table: TableKey,
    pub origin_col: ColKey,
    pub origin_key: ObjKey,
    pub old_target: ObjLink,
}

/// Report delivered synchronously once per top-level remove/clear call.
/// Rows directly removed by a table-level `clear()` are excluded; rows that
/// the clear implies through strong-link cascades are included.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CascadeNotification {
    pub rows: Vec<RemovedRow>,
    pub links: Vec<NullifiedLink>,
}

/// The outcome of the traversal, before any mutation is applied.
#[derive(Debug, Default)]
pub(crate) struct CascadePlan {
    /// Every object to remove, seeds first, in removal order.
    pub removals: Vec<ObjLink>,
    /// Link sites in surviving objects that must be nullified.
    pub nullifications: Vec<NullifiedLink>,
}

/// Computes the removal set and nullification reports for the given seeds.
/// Read-only; the store applies the plan afterwards so that a failure here
/// leaves the graph untouched.
pub(crate) fn collect(store: &Store, seeds: Vec<ObjLink>) -> Result<CascadePlan> {
    let mut visited: HashSet<ObjLink> = seeds.iter().copied().collect();
    let mut queue: VecDeque<ObjLink> = seeds.into();
    let mut removals = Vec::new();

    while let Some(obj) = queue.pop_front() {
        removals.push(obj);
        let spec = store.table_spec_internal(obj.table)?;
        for (col, col_spec) in spec.columns() {
            if !col_spec.is_link() || col_spec.strength != LinkStrength::Strong {
                continue;
            }
            for target in store.link_targets(obj, col)? {
                if visited.contains(&target) || !store.has_object_internal(target) {
                    continue;
                }
                if store.strong_incoming_excluding(target, &visited)? == 0 {
                    visited.insert(target);
                    queue.push_back(target);
                }
            }
        }
    }

    // Backlinks from origins that survive become nullification reports, one
    // per link occurrence, enumerated per removed object in removal order.
    let mut nullifications = Vec::new();
    for &target in &removals {
        for ((origin_table, origin_col), origins) in store.backlink_entries(target)? {
            for origin_key in origins {
                let origin = ObjLink::new(origin_table, origin_key);
                if visited.contains(&origin) {
                    continue;
                }
                nullifications.push(NullifiedLink {
                    origin_table,
                    origin_col,
                    origin_key,
                    old_target: target,
                });
            }
        }
    }

    debug!(
        removals = removals.len(),
        nullifications = nullifications.len(),
        "cascade plan collected"
    );
    Ok(CascadePlan {
        removals,
        nullifications,
    })
}
