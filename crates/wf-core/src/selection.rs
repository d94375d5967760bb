//! Owner → region → instance selection for batch actions.
//!
//! Removal cascades: an emptied instance set deletes its region entry, and an
//! emptied region map deletes its owner entry. The top-level map therefore
//! has no keys exactly when nothing is selected.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::debug;

use crate::types::{InstanceId, OwnerId, RegionId, VpnInstance};

/// Snapshot of a selection, in the shape submitted to the control plane.
pub type Selection = BTreeMap<OwnerId, BTreeMap<RegionId, BTreeSet<InstanceId>>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Toggle {
    Add,
    Remove,
}

/// Mutex-guarded selection set shared by the coordinator and its callers.
#[derive(Debug, Default)]
pub struct TargetSet {
    inner: Mutex<Selection>,
}

impl TargetSet {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Selection> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add or remove one instance. Without a region this is a no-op.
    pub fn toggle(
        &self,
        toggle: Toggle,
        owner: &OwnerId,
        region: Option<&RegionId>,
        instance: &InstanceId,
    ) {
        let Some(region) = region else {
            debug!(owner = %owner, instance = %instance, "ignoring selection without a region");
            return;
        };

        let mut targets = self.lock();
        match toggle {
            Toggle::Add => {
                targets
                    .entry(owner.clone())
                    .or_default()
                    .entry(region.clone())
                    .or_default()
                    .insert(instance.clone());
            }
            Toggle::Remove => {
                let Some(regions) = targets.get_mut(owner) else {
                    return;
                };
                if let Some(instances) = regions.get_mut(region) {
                    instances.remove(instance);
                    if instances.is_empty() {
                        regions.remove(region);
                    }
                }
                if regions.is_empty() {
                    targets.remove(owner);
                }
            }
        }
    }

    /// Toggle a listed instance.
    pub fn toggle_instance(&self, toggle: Toggle, instance: &VpnInstance) {
        self.toggle(toggle, &instance.owner, instance.region.as_ref(), &instance.id);
    }

    pub fn is_selected(&self, owner: &OwnerId, region: &RegionId, instance: &InstanceId) -> bool {
        self.lock()
            .get(owner)
            .and_then(|regions| regions.get(region))
            .is_some_and(|instances| instances.contains(instance))
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Number of selected instances.
    pub fn len(&self) -> usize {
        self.lock()
            .values()
            .flat_map(|regions| regions.values())
            .map(BTreeSet::len)
            .sum()
    }

    pub fn snapshot(&self) -> Selection {
        self.lock().clone()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }
}
