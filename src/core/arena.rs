use crate::domain::model::{Cluster, MarkerKey};
use crate::domain::ports::{MapService, MarkerHandle};
use crate::domain::visual::MarkerVisual;
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Clone)]
pub struct MarkerEntry {
    pub handle: MarkerHandle,
    pub cluster: Cluster,
    pub visual: MarkerVisual,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileStats {
    pub added: usize,
    pub removed: usize,
    pub updated: usize,
}

/// Host markers owned by the engine, keyed by feature or cluster.
#[derive(Debug, Default)]
pub struct MarkerArena {
    entries: BTreeMap<MarkerKey, MarkerEntry>,
    by_handle: HashMap<MarkerHandle, MarkerKey>,
}

impl MarkerArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &MarkerKey) -> Option<&MarkerEntry> {
        self.entries.get(key)
    }

    pub fn key_for(&self, handle: MarkerHandle) -> Option<&MarkerKey> {
        self.by_handle.get(&handle)
    }

    pub fn entries(&self) -> impl Iterator<Item = (&MarkerKey, &MarkerEntry)> {
        self.entries.iter()
    }

    /// Bring the host surface in line with `desired`: drop markers that
    /// vanished, add new ones, and push icon changes only where the visual
    /// differs.
    pub fn reconcile<M: MapService + ?Sized>(
        &mut self,
        map: &mut M,
        desired: Vec<(Cluster, MarkerVisual)>,
    ) -> ReconcileStats {
        let mut stats = ReconcileStats::default();
        let wanted: BTreeMap<MarkerKey, (Cluster, MarkerVisual)> = desired
            .into_iter()
            .map(|(cluster, visual)| (cluster.key.clone(), (cluster, visual)))
            .collect();

        let stale: Vec<MarkerKey> = self
            .entries
            .keys()
            .filter(|key| !wanted.contains_key(*key))
            .cloned()
            .collect();
        for key in stale {
            if let Some(entry) = self.entries.remove(&key) {
                map.remove_marker(entry.handle);
                self.by_handle.remove(&entry.handle);
                stats.removed += 1;
            }
        }

        for (key, (cluster, visual)) in wanted {
            match self.entries.get_mut(&key) {
                Some(entry) => {
                    if entry.visual != visual {
                        map.set_icon(entry.handle, &visual);
                        if entry.visual.z_index != visual.z_index {
                            map.set_z_index(entry.handle, visual.z_index);
                        }
                        entry.visual = visual;
                        stats.updated += 1;
                    }
                    entry.cluster = cluster;
                }
                None => {
                    let handle = map.add_marker(cluster.position, &visual);
                    map.set_z_index(handle, visual.z_index);
                    self.by_handle.insert(handle, key.clone());
                    self.entries.insert(
                        key,
                        MarkerEntry {
                            handle,
                            cluster,
                            visual,
                        },
                    );
                    stats.added += 1;
                }
            }
        }

        stats
    }

    /// Restyle a single marker if present. Returns whether anything changed.
    pub fn restyle<M: MapService + ?Sized>(
        &mut self,
        map: &mut M,
        key: &MarkerKey,
        visual: MarkerVisual,
    ) -> bool {
        let Some(entry) = self.entries.get_mut(key) else {
            return false;
        };
        if entry.visual == visual {
            return false;
        }
        map.set_icon(entry.handle, &visual);
        if entry.visual.z_index != visual.z_index {
            map.set_z_index(entry.handle, visual.z_index);
        }
        entry.visual = visual;
        true
    }

    /// Remove every marker from the host surface.
    pub fn release_all<M: MapService + ?Sized>(&mut self, map: &mut M) -> usize {
        let released = self.entries.len();
        for (_, entry) in std::mem::take(&mut self.entries) {
            map.remove_marker(entry.handle);
        }
        self.by_handle.clear();
        released
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::headless_map::HeadlessMap;
    use crate::config::MarkerConfig;
    use crate::core::marker::MarkerRenderer;
    use crate::domain::model::LatLng;

    fn bubble(id: u64, count: usize) -> (Cluster, MarkerVisual) {
        let cluster = Cluster {
            key: MarkerKey::Cluster(id),
            position: LatLng::new(25.0, 121.0 + id as f64 * 0.01),
            count,
            member_feature_ids: (0..count).map(|i| format!("{}-{}", id, i)).collect(),
        };
        let visual = MarkerRenderer::new(MarkerConfig::default()).render_cluster(&cluster);
        (cluster, visual)
    }

    #[test]
    fn test_reconcile_adds_updates_and_removes() {
        let mut map = HeadlessMap::new(LatLng::new(25.0, 121.0), 12, 800, 600);
        let mut arena = MarkerArena::new();

        let stats = arena.reconcile(&mut map, vec![bubble(1, 3), bubble(2, 5)]);
        assert_eq!(stats, ReconcileStats { added: 2, removed: 0, updated: 0 });
        assert_eq!(map.marker_count(), 2);

        let handle = arena.get(&MarkerKey::Cluster(1)).unwrap().handle;
        assert_eq!(arena.key_for(handle), Some(&MarkerKey::Cluster(1)));

        // cluster 1 grows into the next size band, cluster 2 disappears
        let stats = arena.reconcile(&mut map, vec![bubble(1, 30), bubble(3, 2)]);
        assert_eq!(stats, ReconcileStats { added: 1, removed: 1, updated: 1 });
        assert_eq!(map.marker_count(), 2);
        assert_eq!(arena.get(&MarkerKey::Cluster(1)).unwrap().handle, handle);
    }

    #[test]
    fn test_unchanged_visuals_are_not_pushed() {
        let mut map = HeadlessMap::new(LatLng::new(25.0, 121.0), 12, 800, 600);
        let mut arena = MarkerArena::new();

        arena.reconcile(&mut map, vec![bubble(1, 3)]);
        let stats = arena.reconcile(&mut map, vec![bubble(1, 3)]);
        assert_eq!(stats, ReconcileStats::default());
    }

    #[test]
    fn test_release_all_empties_host() {
        let mut map = HeadlessMap::new(LatLng::new(25.0, 121.0), 12, 800, 600);
        let mut arena = MarkerArena::new();
        arena.reconcile(&mut map, vec![bubble(1, 3), bubble(2, 4)]);

        assert_eq!(arena.release_all(&mut map), 2);
        assert!(arena.is_empty());
        assert_eq!(map.marker_count(), 0);
    }
}
