//! Hierarchical greedy clustering.
//!
//! Features are indexed once in normalised mercator space. Levels are built
//! from `max_zoom + 1` (one node per feature) down to `min_zoom`: at each zoom
//! the nodes of the level above are visited in order, and every node not yet
//! claimed becomes a seed that absorbs all unclaimed nodes within the pixel
//! radius. Passes repeat at the same zoom until no two nodes lie within the
//! radius of each other.
//!
//! Seeds are visited in ascending feature id at the leaf level and in
//! creation order above it, so when a node is within reach of two seeds the
//! one visited first (lowest feature id) claims it. The radius test is
//! inclusive.

use crate::config::ClusterConfig;
use crate::core::features::order_by_provider_then_price;
use crate::core::projection::{latitude_from_y, longitude_from_x, mercator_x, mercator_y};
use crate::domain::model::{BoundingBox, Cluster, Feature, LatLng, MarkerKey, Viewport};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Deepest zoom the index builds levels for; larger configured values are
/// clamped to it.
pub const MAX_CLUSTER_ZOOM: u8 = 24;

#[derive(Debug, Clone)]
struct Node {
    x: f64,
    y: f64,
    count: usize,
    feature: Option<usize>,
    children: Vec<usize>,
    parent: Option<usize>,
    created_zoom: u8,
    visited_pass: u32,
}

/// Uniform grid over one level, cell size equal to the query radius.
struct GridIndex {
    cell_size: f64,
    cells: HashMap<(i64, i64), Vec<(usize, f64, f64)>>,
}

impl GridIndex {
    fn new(cell_size: f64) -> Self {
        Self {
            cell_size,
            cells: HashMap::new(),
        }
    }

    fn cell_coords(&self, x: f64, y: f64) -> (i64, i64) {
        (
            (x / self.cell_size).floor() as i64,
            (y / self.cell_size).floor() as i64,
        )
    }

    fn add(&mut self, id: usize, x: f64, y: f64) {
        let coords = self.cell_coords(x, y);
        self.cells.entry(coords).or_default().push((id, x, y));
    }

    /// Ids within `radius` of the point, ascending.
    fn within(&self, x: f64, y: f64, radius: f64) -> Vec<usize> {
        let mut result = Vec::new();
        let r_sq = radius * radius;
        let min_c = self.cell_coords(x - radius, y - radius);
        let max_c = self.cell_coords(x + radius, y + radius);

        for cx in min_c.0..=max_c.0 {
            for cy in min_c.1..=max_c.1 {
                if let Some(entries) = self.cells.get(&(cx, cy)) {
                    for &(id, ex, ey) in entries {
                        let dx = ex - x;
                        let dy = ey - y;
                        if dx * dx + dy * dy <= r_sq {
                            result.push(id);
                        }
                    }
                }
            }
        }
        result.sort_unstable();
        result
    }
}

/// What the presentation layer gets when a cluster is opened.
#[derive(Debug, Clone)]
pub struct ClusterActivation {
    /// Members grouped by provider, each group ascending by price.
    pub features: Vec<Arc<Feature>>,
    pub bounds: BoundingBox,
}

pub struct ClusterIndex {
    features: Vec<Arc<Feature>>,
    feature_index: HashMap<String, usize>,
    nodes: Vec<Node>,
    levels: Vec<Vec<usize>>,
    min_zoom: u8,
    max_zoom: u8,
    radius_px: f64,
    tile_size: f64,
}

impl ClusterIndex {
    pub fn build(features: &[Arc<Feature>], config: &ClusterConfig) -> Self {
        let mut features = features.to_vec();
        features.sort_by(|a, b| a.id.cmp(&b.id));

        let max_zoom = config.max_zoom.min(MAX_CLUSTER_ZOOM);
        if max_zoom != config.max_zoom {
            tracing::warn!(
                "Clamping cluster max_zoom {} to {}",
                config.max_zoom,
                MAX_CLUSTER_ZOOM
            );
        }
        let min_zoom = config.min_zoom.min(max_zoom);
        let leaf_zoom = max_zoom + 1;

        let nodes: Vec<Node> = features
            .iter()
            .enumerate()
            .map(|(i, feature)| Node {
                x: mercator_x(feature.position.lng),
                y: mercator_y(feature.position.lat),
                count: 1,
                feature: Some(i),
                children: Vec::new(),
                parent: None,
                created_zoom: leaf_zoom,
                visited_pass: 0,
            })
            .collect();

        let feature_index = features
            .iter()
            .enumerate()
            .map(|(i, feature)| (feature.id.clone(), i))
            .collect();

        let mut levels = vec![Vec::new(); usize::from(leaf_zoom) + 1];
        levels[usize::from(leaf_zoom)] = (0..nodes.len()).collect();

        let mut index = Self {
            features,
            feature_index,
            nodes,
            levels,
            min_zoom,
            max_zoom,
            radius_px: config.radius_px,
            tile_size: config.tile_size,
        };

        let mut pass = 0u32;
        for zoom in (min_zoom..=max_zoom).rev() {
            let radius = index.radius_at(zoom);
            let mut current = index.levels[usize::from(zoom) + 1].clone();
            loop {
                pass += 1;
                let (next, merged) = index.cluster_pass(&current, zoom, radius, config.min_points, pass);
                current = next;
                if !merged {
                    break;
                }
            }
            index.levels[usize::from(zoom)] = current;
        }

        tracing::debug!(
            "Indexed {} features into {} nodes across zoom {}..={}",
            index.features.len(),
            index.nodes.len(),
            min_zoom,
            max_zoom
        );
        index
    }

    /// Cluster radius at `zoom` in normalised mercator units.
    pub fn radius_at(&self, zoom: u8) -> f64 {
        self.radius_px / (self.tile_size * 2f64.powi(i32::from(zoom)))
    }

    fn cluster_pass(
        &mut self,
        level: &[usize],
        zoom: u8,
        radius: f64,
        min_points: usize,
        pass: u32,
    ) -> (Vec<usize>, bool) {
        let mut grid = GridIndex::new(radius);
        for &id in level {
            grid.add(id, self.nodes[id].x, self.nodes[id].y);
        }

        let mut next = Vec::with_capacity(level.len());
        let mut merged_any = false;

        for &seed in level {
            if self.nodes[seed].visited_pass == pass {
                continue;
            }
            self.nodes[seed].visited_pass = pass;

            let mut members = vec![seed];
            let mut total = self.nodes[seed].count;
            for neighbor in grid.within(self.nodes[seed].x, self.nodes[seed].y, radius) {
                if self.nodes[neighbor].visited_pass == pass {
                    continue;
                }
                self.nodes[neighbor].visited_pass = pass;
                total += self.nodes[neighbor].count;
                members.push(neighbor);
            }

            if members.len() > 1 && total >= min_points.max(2) {
                let (mut wx, mut wy) = (0.0, 0.0);
                for &m in &members {
                    let node = &self.nodes[m];
                    wx += node.x * node.count as f64;
                    wy += node.y * node.count as f64;
                }

                let id = self.nodes.len();
                for &m in &members {
                    self.nodes[m].parent = Some(id);
                }
                self.nodes.push(Node {
                    x: wx / total as f64,
                    y: wy / total as f64,
                    count: total,
                    feature: None,
                    children: members,
                    parent: None,
                    created_zoom: zoom,
                    visited_pass: pass,
                });
                next.push(id);
                merged_any = true;
            } else {
                next.extend(members);
            }
        }

        (next, merged_any)
    }

    fn clamp_zoom(&self, zoom: u8) -> usize {
        usize::from(zoom.clamp(self.min_zoom, self.max_zoom + 1))
    }

    fn node_position(&self, id: usize) -> LatLng {
        let node = &self.nodes[id];
        match node.feature {
            Some(f) => self.features[f].position,
            None => LatLng::new(latitude_from_y(node.y), longitude_from_x(node.x)),
        }
    }

    fn leaf_indices(&self, id: usize) -> Vec<usize> {
        let mut leaves = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let node = &self.nodes[current];
            match node.feature {
                Some(f) => leaves.push(f),
                None => stack.extend(node.children.iter().copied()),
            }
        }
        leaves.sort_unstable();
        leaves
    }

    fn to_cluster(&self, id: usize) -> Cluster {
        let node = &self.nodes[id];
        match node.feature {
            Some(f) => {
                let feature = &self.features[f];
                Cluster {
                    key: MarkerKey::Feature(feature.id.clone()),
                    position: feature.position,
                    count: 1,
                    member_feature_ids: vec![feature.id.clone()],
                }
            }
            None => Cluster {
                key: MarkerKey::Cluster(id as u64),
                position: self.node_position(id),
                count: node.count,
                member_feature_ids: self
                    .leaf_indices(id)
                    .into_iter()
                    .map(|f| self.features[f].id.clone())
                    .collect(),
            },
        }
    }

    fn cluster_node(&self, cluster_id: u64) -> Option<usize> {
        let id = usize::try_from(cluster_id).ok()?;
        self.nodes.get(id).filter(|n| n.feature.is_none()).map(|_| id)
    }

    /// Clusters and singletons at `zoom` whose position lies inside `bbox`.
    pub fn clusters(&self, bbox: &BoundingBox, zoom: u8) -> Vec<Cluster> {
        let level = &self.levels[self.clamp_zoom(zoom)];
        level
            .iter()
            .filter(|&&id| bbox.contains(self.node_position(id)))
            .map(|&id| self.to_cluster(id))
            .collect()
    }

    /// Every feature under a cluster, ascending by id.
    pub fn leaves(&self, cluster_id: u64) -> Option<Vec<Arc<Feature>>> {
        let id = self.cluster_node(cluster_id)?;
        Some(
            self.leaf_indices(id)
                .into_iter()
                .map(|f| Arc::clone(&self.features[f]))
                .collect(),
        )
    }

    /// What the cluster splits into: its descendants that are visible at
    /// [`expansion_zoom`](Self::expansion_zoom).
    pub fn children(&self, cluster_id: u64) -> Option<Vec<Cluster>> {
        let id = self.cluster_node(cluster_id)?;
        let zoom = self.expansion_zoom(cluster_id)?;
        let visible: HashSet<usize> = self.levels[self.clamp_zoom(zoom)].iter().copied().collect();

        // nodes merged in a later pass at the same zoom are never shown, so
        // descend through them
        let mut result = Vec::new();
        let mut stack: Vec<usize> = self.nodes[id].children.iter().rev().copied().collect();
        while let Some(node) = stack.pop() {
            if visible.contains(&node) || self.nodes[node].feature.is_some() {
                result.push(self.to_cluster(node));
            } else {
                stack.extend(self.nodes[node].children.iter().rev().copied());
            }
        }
        Some(result)
    }

    /// Zoom at which the cluster breaks apart.
    pub fn expansion_zoom(&self, cluster_id: u64) -> Option<u8> {
        let id = self.cluster_node(cluster_id)?;
        Some((self.nodes[id].created_zoom + 1).min(self.max_zoom + 1))
    }

    /// Members reordered provider-then-price plus the region covering them.
    pub fn activate(&self, cluster: &Cluster) -> Option<ClusterActivation> {
        let members: Vec<Arc<Feature>> = cluster
            .member_feature_ids
            .iter()
            .filter_map(|id| self.feature_index.get(id))
            .map(|&f| Arc::clone(&self.features[f]))
            .collect();

        let bounds = BoundingBox::covering(members.iter().map(|f| &f.position))?;
        Some(ClusterActivation {
            features: order_by_provider_then_price(&members),
            bounds,
        })
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

pub struct Clusterer {
    config: ClusterConfig,
}

impl Clusterer {
    pub fn new(config: ClusterConfig) -> Self {
        Self { config }
    }

    pub fn index(&self, features: &[Arc<Feature>]) -> ClusterIndex {
        ClusterIndex::build(features, &self.config)
    }

    /// One-shot partition of `features` for a viewport.
    pub fn cluster(&self, features: &[Arc<Feature>], viewport: &Viewport) -> Vec<Cluster> {
        self.index(features).clusters(&viewport.bounds, viewport.zoom)
    }
}
