//! Keyed collection reconciler.
//!
//! Pure state transition: `reconcile(bindings, snapshots)` diffs the previous
//! keyed bindings against a full snapshot array and returns the updated
//! bindings plus a report of what was created, updated and removed. Visual
//! objects are created and destroyed only through a [`VisualFactory`]; an
//! entity that stays present keeps its visual object and only has its
//! attributes mutated.
//!
//! Removal is immediate: one snapshot without an identifier is enough to
//! destroy its binding.

use std::collections::{HashMap, HashSet};

use crate::model::EntitySnapshot;
use crate::types::Icao24;

/// Creates, mutates and destroys the visual objects bound to entities.
pub trait VisualFactory {
    type Visual;

    fn create(&mut self, snapshot: &EntitySnapshot) -> Self::Visual;

    /// Mutate an existing visual in place. Must not replace it.
    fn update(&mut self, visual: &mut Self::Visual, snapshot: &EntitySnapshot);

    fn set_highlight(&mut self, visual: &mut Self::Visual, highlighted: bool);

    fn destroy(&mut self, visual: Self::Visual);
}

/// One identifier bound to one persistent visual object.
#[derive(Debug)]
pub struct Binding<V> {
    pub icao24: Icao24,
    pub visual: V,
    /// Latest snapshot applied, kept so presentation can be re-derived
    /// (e.g. after a unit change) without waiting for the next poll.
    pub snapshot: EntitySnapshot,
    pub first_cycle: u64,
    pub last_cycle: u64,
}

/// The reconciler's entire state: the keyed bindings and the selection.
#[derive(Debug)]
pub struct Bindings<V> {
    entries: HashMap<Icao24, Binding<V>>,
    selected: Option<Icao24>,
    cycle: u64,
}

impl<V> Default for Bindings<V> {
    fn default() -> Self {
        Bindings {
            entries: HashMap::new(),
            selected: None,
            cycle: 0,
        }
    }
}

/// What one reconciliation pass did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub cycle: u64,
    pub created: Vec<Icao24>,
    pub updated: Vec<Icao24>,
    pub removed: Vec<Icao24>,
    /// The selected identifier was removed and the selection cleared.
    pub selection_lost: bool,
}

impl<V> Bindings<V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of completed reconciliation cycles.
    pub fn cycle(&self) -> u64 {
        self.cycle
    }

    pub fn get(&self, icao24: &Icao24) -> Option<&Binding<V>> {
        self.entries.get(icao24)
    }

    pub fn contains(&self, icao24: &Icao24) -> bool {
        self.entries.contains_key(icao24)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Binding<V>> {
        self.entries.values()
    }

    pub fn selected(&self) -> Option<Icao24> {
        self.selected
    }

    /// Change the selection and recompute highlighting for every binding.
    ///
    /// Selecting an identifier that has no binding is ignored. Returns
    /// whether the selection changed.
    pub fn select<F>(&mut self, icao24: Option<Icao24>, factory: &mut F) -> bool
    where
        F: VisualFactory<Visual = V>,
    {
        if let Some(id) = icao24 {
            if !self.entries.contains_key(&id) {
                tracing::debug!(icao = %id, "select ignored: no binding");
                return false;
            }
        }
        if icao24 == self.selected {
            return false;
        }
        self.selected = icao24;
        for binding in self.entries.values_mut() {
            factory.set_highlight(&mut binding.visual, Some(binding.icao24) == icao24);
        }
        true
    }

    /// Re-apply each binding's latest snapshot, e.g. after preferences change.
    pub fn refresh<F>(&mut self, factory: &mut F)
    where
        F: VisualFactory<Visual = V>,
    {
        for binding in self.entries.values_mut() {
            factory.update(&mut binding.visual, &binding.snapshot);
        }
    }

    /// Destroy every binding.
    pub fn clear<F>(&mut self, factory: &mut F)
    where
        F: VisualFactory<Visual = V>,
    {
        for (_, binding) in self.entries.drain() {
            factory.destroy(binding.visual);
        }
        self.selected = None;
    }
}

/// Reconcile previous bindings against a new snapshot array.
///
/// The final state does not depend on the order of `snapshots`, except that
/// when one identifier appears more than once the last occurrence wins.
pub fn reconcile<F: VisualFactory>(
    mut bindings: Bindings<F::Visual>,
    snapshots: &[EntitySnapshot],
    factory: &mut F,
) -> (Bindings<F::Visual>, ReconcileReport) {
    bindings.cycle += 1;
    let cycle = bindings.cycle;
    let mut report = ReconcileReport {
        cycle,
        ..ReconcileReport::default()
    };

    let present: HashSet<Icao24> = snapshots.iter().map(|s| s.icao24).collect();

    // Removals first so a destroyed visual is never touched by an update.
    let absent: Vec<Icao24> = bindings
        .entries
        .keys()
        .filter(|id| !present.contains(id))
        .copied()
        .collect();
    for id in absent {
        if let Some(binding) = bindings.entries.remove(&id) {
            factory.destroy(binding.visual);
            report.removed.push(id);
        }
        if bindings.selected == Some(id) {
            bindings.selected = None;
            report.selection_lost = true;
        }
    }

    let mut seen: HashSet<Icao24> = HashSet::with_capacity(snapshots.len());
    for snap in snapshots {
        let id = snap.icao24;
        let highlighted = bindings.selected == Some(id);
        match bindings.entries.get_mut(&id) {
            Some(binding) => {
                factory.update(&mut binding.visual, snap);
                factory.set_highlight(&mut binding.visual, highlighted);
                binding.snapshot = snap.clone();
                binding.last_cycle = cycle;
                if seen.insert(id) {
                    report.updated.push(id);
                }
            }
            None => {
                let mut visual = factory.create(snap);
                factory.set_highlight(&mut visual, highlighted);
                bindings.entries.insert(
                    id,
                    Binding {
                        icao24: id,
                        visual,
                        snapshot: snap.clone(),
                        first_cycle: cycle,
                        last_cycle: cycle,
                    },
                );
                seen.insert(id);
                report.created.push(id);
            }
        }
    }

    // duplicates inside one array were counted as updates of a fresh binding
    report.updated.retain(|id| !report.created.contains(id));

    tracing::debug!(
        cycle,
        created = report.created.len(),
        updated = report.updated.len(),
        removed = report.removed.len(),
        "reconciled"
    );

    (bindings, report)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
