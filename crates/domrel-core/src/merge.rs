//! Merge-by-key folding of fresh observations into a record set.
//!
//! Every probe goes through [`merge`]: record sets only ever grow, keys that
//! were not observed this time keep their old `updated_at`.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::types::{DiscoveryMethod, MergePayload, RelationshipRecord};

/// Fold `fresh` observations into `prior`.
///
/// A fresh key equal to `subject` is dropped. Existing keys keep their
/// `created_at` and get `updated_at = now`; new keys are inserted with both
/// timestamps set to `now`. The returned set is sorted by key.
#[must_use]
pub fn merge<P, I, K>(
    subject: &str,
    method: DiscoveryMethod,
    prior: Vec<RelationshipRecord<P>>,
    fresh: I,
    now: DateTime<Utc>,
) -> Vec<RelationshipRecord<P>>
where
    P: MergePayload,
    I: IntoIterator<Item = (K, P)>,
    K: Into<String>,
{
    let mut by_key: BTreeMap<String, RelationshipRecord<P>> = prior
        .into_iter()
        .map(|record| (record.key.clone(), record))
        .collect();

    let mut inserted = 0usize;
    let mut refreshed = 0usize;

    for (key, payload) in fresh {
        let key = key.into();
        if key == subject {
            continue;
        }
        match by_key.get_mut(&key) {
            Some(existing) => {
                existing.updated_at = now;
                existing.payload.refresh(payload);
                refreshed += 1;
            }
            None => {
                by_key.insert(
                    key.clone(),
                    RelationshipRecord::observed(key, method, payload, now),
                );
                inserted += 1;
            }
        }
    }

    debug!(
        subject,
        method = %method,
        inserted,
        refreshed,
        total = by_key.len(),
        "merged observations"
    );

    by_key.into_values().collect()
}

/// [`merge`] for probes whose observations carry no payload.
#[must_use]
pub fn merge_keys<I, K>(
    subject: &str,
    method: DiscoveryMethod,
    prior: Vec<RelationshipRecord>,
    fresh: I,
    now: DateTime<Utc>,
) -> Vec<RelationshipRecord>
where
    I: IntoIterator<Item = K>,
    K: Into<String>,
{
    merge(
        subject,
        method,
        prior,
        fresh.into_iter().map(|key| (key, ())),
        now,
    )
}
