// ============================================================================
// Snapshot merge
// ============================================================================

use crate::core::{ActorId, FieldId, FieldValue, LeaseKey, RecordId};
use crate::model::{AssetRecord, FieldDefinition};
use crate::reconcile::cache::{CachedAsset, LocalCache};
use crate::reconcile::snapshot::Snapshot;
use crate::reconcile::validation::{ValidationReport, Validator};
use im::OrdMap;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

/// What a merge pass changed. All zeros means the cache is untouched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileStats {
    pub records_inserted: usize,
    pub records_updated: usize,
    pub records_removed: usize,
    pub definitions_changed: usize,
    /// Individual metadata cells inserted, replaced or removed.
    pub field_writes: usize,
    pub records_revalidated: usize,
    pub labels_changed: usize,
}

impl ReconcileStats {
    pub fn is_noop(&self) -> bool {
        *self == Self::default()
    }
}

#[derive(Debug, Clone)]
pub struct ReconcileOutcome {
    pub cache: LocalCache,
    pub stats: ReconcileStats,
}

/// Folds `snapshot` into `previous` and returns the new cache.
///
/// Pure: `previous` is not modified and nothing is written anywhere else.
/// Anything whose content did not change keeps its `Arc`, so applying the same
/// snapshot twice returns a cache sharing every node with the first result.
pub fn reconcile(
    previous: &LocalCache,
    snapshot: &Snapshot,
    viewer: &ActorId,
    validator: &Validator,
) -> ReconcileOutcome {
    let mut stats = ReconcileStats::default();

    let definitions = merge_definitions(&previous.definitions, &snapshot.definitions, &mut stats);
    let definitions_changed = stats.definitions_changed > 0;

    let mut assets = previous.assets.clone();
    let mut seen: HashSet<RecordId> = HashSet::new();
    let mut validated: HashSet<RecordId> = HashSet::new();

    // A repeated id counts once; its last entry wins.
    let incoming: BTreeMap<&RecordId, &AssetRecord> = snapshot
        .assets
        .iter()
        .map(|record| (&record.id, record))
        .collect();

    for record in incoming.into_values().filter(|record| !record.deleted) {
        seen.insert(record.id.clone());

        match previous.assets.get(&record.id) {
            None => {
                let metadata: OrdMap<FieldId, Arc<FieldValue>> = record
                    .metadata
                    .iter()
                    .map(|(field, value)| (field.clone(), Arc::new(value.clone())))
                    .collect();
                let validation = Arc::new(validator.validate(&metadata, &definitions));
                stats.records_inserted += 1;
                stats.field_writes += metadata.len();
                stats.records_revalidated += 1;
                validated.insert(record.id.clone());

                assets.insert(
                    record.id.clone(),
                    Arc::new(CachedAsset {
                        id: record.id.clone(),
                        name: record.name.clone(),
                        metadata,
                        validation,
                        updated_at: record.updated_at,
                        revision: record.revision,
                    }),
                );
            }
            Some(current) if current.same_content(record) => {}
            Some(current) => {
                let (metadata, writes) = merge_metadata(&current.metadata, &record.metadata);
                let validation = if writes > 0 || definitions_changed {
                    stats.records_revalidated += 1;
                    validated.insert(record.id.clone());
                    keep_if_equal(
                        &current.validation,
                        validator.validate(&metadata, &definitions),
                    )
                } else {
                    Arc::clone(&current.validation)
                };
                stats.records_updated += 1;
                stats.field_writes += writes;

                assets.insert(
                    record.id.clone(),
                    Arc::new(CachedAsset {
                        id: record.id.clone(),
                        name: record.name.clone(),
                        metadata,
                        validation,
                        updated_at: record.updated_at,
                        revision: record.revision,
                    }),
                );
            }
        }
    }

    for id in previous.assets.keys() {
        if !seen.contains(id) {
            assets.remove(id);
            stats.records_removed += 1;
        }
    }

    if definitions_changed {
        revalidate_untouched(&mut assets, &definitions, validator, &validated, &mut stats);
    }

    let labels = merge_labels(&previous.labels, snapshot, viewer, &mut stats);

    ReconcileOutcome {
        cache: LocalCache {
            assets,
            definitions,
            labels,
        },
        stats,
    }
}

/// Cell-level merge. Returns the merged map and the number of cells written.
fn merge_metadata(
    current: &OrdMap<FieldId, Arc<FieldValue>>,
    incoming: &BTreeMap<FieldId, FieldValue>,
) -> (OrdMap<FieldId, Arc<FieldValue>>, usize) {
    let mut merged = current.clone();
    let mut writes = 0;

    for (field, value) in incoming {
        let unchanged = current.get(field).is_some_and(|existing| **existing == *value);
        if !unchanged {
            merged.insert(field.clone(), Arc::new(value.clone()));
            writes += 1;
        }
    }

    for field in current.keys() {
        if !incoming.contains_key(field) {
            merged.remove(field);
            writes += 1;
        }
    }

    (merged, writes)
}

fn merge_definitions(
    current: &OrdMap<FieldId, Arc<FieldDefinition>>,
    incoming: &[FieldDefinition],
    stats: &mut ReconcileStats,
) -> OrdMap<FieldId, Arc<FieldDefinition>> {
    let mut merged = current.clone();
    let mut seen: HashSet<&FieldId> = HashSet::new();

    let latest: BTreeMap<&FieldId, &FieldDefinition> = incoming
        .iter()
        .map(|definition| (&definition.id, definition))
        .collect();

    for definition in latest.into_values().filter(|definition| !definition.deleted) {
        seen.insert(&definition.id);
        let unchanged = current
            .get(&definition.id)
            .is_some_and(|existing| **existing == *definition);
        if !unchanged {
            merged.insert(definition.id.clone(), Arc::new(definition.clone()));
            stats.definitions_changed += 1;
        }
    }

    for id in current.keys() {
        if !seen.contains(id) {
            merged.remove(id);
            stats.definitions_changed += 1;
        }
    }

    merged
}

/// Definitions are an input of validation, so a changed definition set
/// re-validates records the merge itself left alone.
fn revalidate_untouched(
    assets: &mut OrdMap<RecordId, Arc<CachedAsset>>,
    definitions: &OrdMap<FieldId, Arc<FieldDefinition>>,
    validator: &Validator,
    validated: &HashSet<RecordId>,
    stats: &mut ReconcileStats,
) {
    let pending: Vec<Arc<CachedAsset>> = assets
        .values()
        .filter(|asset| !validated.contains(&asset.id))
        .cloned()
        .collect();

    for asset in pending {
        stats.records_revalidated += 1;
        let report = validator.validate(&asset.metadata, definitions);
        if *asset.validation != report {
            let mut updated = (*asset).clone();
            updated.validation = Arc::new(report);
            assets.insert(asset.id.clone(), Arc::new(updated));
        }
    }
}

fn merge_labels(
    current: &OrdMap<LeaseKey, Arc<str>>,
    snapshot: &Snapshot,
    viewer: &ActorId,
    stats: &mut ReconcileStats,
) -> OrdMap<LeaseKey, Arc<str>> {
    // Self-held leases carry no label; the viewer is the one editing.
    let wanted: BTreeMap<&LeaseKey, &str> = snapshot
        .leases
        .iter()
        .filter(|lease| snapshot.taken_at < lease.expires_at && &lease.holder.id != viewer)
        .map(|lease| (&lease.key, lease.holder.display.as_str()))
        .collect();

    let mut merged = current.clone();

    for key in current.keys() {
        if !wanted.contains_key(key) {
            merged.remove(key);
            stats.labels_changed += 1;
        }
    }

    for (key, display) in wanted {
        let unchanged = current.get(key).is_some_and(|label| &**label == display);
        if !unchanged {
            merged.insert(key.clone(), Arc::from(display));
            stats.labels_changed += 1;
        }
    }

    merged
}

fn keep_if_equal(current: &Arc<ValidationReport>, fresh: ValidationReport) -> Arc<ValidationReport> {
    if **current == fresh {
        Arc::clone(current)
    } else {
        Arc::new(fresh)
    }
}

