use crate::domain::model::{Feature, FeatureId, Listing, ProviderGroup, UNKNOWN_PROVIDER};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

/// Output of one ingestion. Replaced wholesale on the next ingestion.
#[derive(Debug, Clone, Default)]
pub struct FeatureSet {
    pub features: Vec<Arc<Feature>>,
    pub groups_by_provider: BTreeMap<String, ProviderGroup>,
    by_id: HashMap<FeatureId, usize>,
    lowest_price_ids: HashSet<FeatureId>,
}

impl FeatureSet {
    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Arc<Feature>> {
        self.by_id.get(id).map(|&i| &self.features[i])
    }

    pub fn group(&self, provider_id: &str) -> Option<&ProviderGroup> {
        self.groups_by_provider.get(provider_id)
    }

    /// True when the feature heads its provider group.
    pub fn is_lowest_price(&self, id: &str) -> bool {
        self.lowest_price_ids.contains(id)
    }
}

pub struct FeatureBuilder;

impl FeatureBuilder {
    /// Resolve listings into features and provider groups.
    ///
    /// Listings without a usable position are skipped, as are repeated ids
    /// after their first occurrence.
    pub fn build(listings: &[Listing]) -> FeatureSet {
        let mut features = Vec::with_capacity(listings.len());
        let mut by_id = HashMap::with_capacity(listings.len());
        let mut dropped_positions = 0usize;

        for listing in listings {
            let Some(position) = listing.position.as_ref().and_then(|p| p.resolve()) else {
                dropped_positions += 1;
                tracing::debug!("Skipping listing {} without a usable position", listing.id);
                continue;
            };

            if by_id.contains_key(&listing.id) {
                tracing::warn!("Duplicate listing id {}, keeping the first occurrence", listing.id);
                continue;
            }

            let provider_id = listing
                .provider_id
                .as_deref()
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .unwrap_or(UNKNOWN_PROVIDER)
                .to_string();

            by_id.insert(listing.id.clone(), features.len());
            features.push(Arc::new(Feature {
                id: listing.id.clone(),
                provider_id,
                price: listing.price,
                position,
                payload: listing.payload.clone(),
            }));
        }

        if dropped_positions > 0 {
            tracing::warn!(
                "Dropped {} of {} listings with missing or invalid positions",
                dropped_positions,
                listings.len()
            );
        }

        let groups_by_provider = group_by_provider(&features);
        let lowest_price_ids = groups_by_provider
            .values()
            .filter_map(|group| group.lowest_price())
            .map(|feature| feature.id.clone())
            .collect();

        FeatureSet {
            features,
            groups_by_provider,
            by_id,
            lowest_price_ids,
        }
    }
}

/// Group by provider and stable-sort every group ascending by price.
pub fn group_by_provider(features: &[Arc<Feature>]) -> BTreeMap<String, ProviderGroup> {
    let mut groups: BTreeMap<String, ProviderGroup> = BTreeMap::new();
    for feature in features {
        groups
            .entry(feature.provider_id.clone())
            .or_insert_with(|| ProviderGroup {
                provider_id: feature.provider_id.clone(),
                features: Vec::new(),
            })
            .features
            .push(Arc::clone(feature));
    }

    for group in groups.values_mut() {
        // sort_by is stable; total_cmp keeps NaN prices from breaking the order
        group.features.sort_by(|a, b| a.price.total_cmp(&b.price));
    }
    groups
}

/// Provider-then-price ordering used when a cluster is opened.
pub fn order_by_provider_then_price(features: &[Arc<Feature>]) -> Vec<Arc<Feature>> {
    group_by_provider(features)
        .into_values()
        .flat_map(|group| group.features)
        .collect()
}
