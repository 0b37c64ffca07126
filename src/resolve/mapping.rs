use crate::error::ConfigError;
use crate::operation::{ResourceRef, TemporaryId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Where a placeholder points.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MappingTarget {
    Alias(TemporaryId),
    Resolved(ResourceRef),
}

/// Outcome of following a placeholder through the map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    Resolved(ResourceRef),
    /// The chain ends at a placeholder with no entry yet.
    Unmapped(TemporaryId),
    /// The alias chain loops back on itself.
    Cyclic,
}

/// Bidirectional placeholder map for one batch.
///
/// Forward: placeholder to alias or resolved reference. Reverse: resolved
/// reference (`owner/repo#N`) to every placeholder that names it.
#[derive(Debug, Clone, Default)]
pub struct TemporaryIdMap {
    forward: BTreeMap<TemporaryId, MappingTarget>,
    reverse: BTreeMap<String, BTreeSet<TemporaryId>>,
}

impl TemporaryIdMap {
    /// Seed from `config.temporary_ids` (`aw_x = "owner/repo#12"` or
    /// `aw_x = "aw_y"`).
    pub fn from_seeds(seeds: &BTreeMap<String, String>) -> Result<Self, ConfigError> {
        let mut map = Self::default();
        for (key, value) in seeds {
            let id = TemporaryId::parse(key).ok_or_else(|| {
                ConfigError::Validation(format!("temporary_ids: '{key}' is not a temporary id"))
            })?;
            if let Some(target) = TemporaryId::parse(value) {
                if target == id {
                    return Err(ConfigError::Validation(format!(
                        "temporary_ids: '{key}' aliases itself"
                    )));
                }
                map.record_alias(id, target);
            } else {
                let resolved: ResourceRef = value.parse().map_err(|e| {
                    ConfigError::Validation(format!("temporary_ids: '{key}': {e}"))
                })?;
                map.record_resolved(id, resolved);
            }
        }
        if let Some(id) = map.forward.keys().find(|id| map.follow(id) == Lookup::Cyclic) {
            return Err(ConfigError::Validation(format!(
                "temporary_ids: alias chain through '{id}' is cyclic"
            )));
        }
        Ok(map)
    }

    pub fn record_resolved(&mut self, id: TemporaryId, resolved: ResourceRef) {
        let key = resolved.to_string();
        if let Some(MappingTarget::Resolved(previous)) =
            self.forward.insert(id.clone(), MappingTarget::Resolved(resolved))
            && let Some(ids) = self.reverse.get_mut(&previous.to_string())
        {
            ids.remove(&id);
        }
        self.reverse.entry(key).or_default().insert(id);
    }

    pub fn record_alias(&mut self, id: TemporaryId, target: TemporaryId) {
        self.forward.insert(id, MappingTarget::Alias(target));
    }

    pub fn contains(&self, id: &TemporaryId) -> bool {
        self.forward.contains_key(id)
    }

    pub fn is_empty(&self) -> bool {
        self.forward.is_empty()
    }

    pub fn len(&self) -> usize {
        self.forward.len()
    }

    pub fn target(&self, id: &TemporaryId) -> Option<&MappingTarget> {
        self.forward.get(id)
    }

    /// Follow alias chains from `id`.
    pub fn follow(&self, id: &TemporaryId) -> Lookup {
        let mut seen = BTreeSet::new();
        let mut current = id;
        loop {
            if !seen.insert(current) {
                return Lookup::Cyclic;
            }
            match self.forward.get(current) {
                Some(MappingTarget::Resolved(r)) => return Lookup::Resolved(r.clone()),
                Some(MappingTarget::Alias(next)) => current = next,
                None => return Lookup::Unmapped(current.clone()),
            }
        }
    }

    pub fn resolve(&self, id: &TemporaryId) -> Option<ResourceRef> {
        match self.follow(id) {
            Lookup::Resolved(r) => Some(r),
            Lookup::Unmapped(_) | Lookup::Cyclic => None,
        }
    }

    /// Placeholders recorded as resolving directly to `resolved`.
    pub fn placeholders_for(&self, resolved: &ResourceRef) -> Vec<&TemporaryId> {
        self.reverse
            .get(&resolved.to_string())
            .map(|ids| ids.iter().collect())
            .unwrap_or_default()
    }

    /// Flat view for the summary: resolved entries as `owner/repo#N`,
    /// dangling aliases as the placeholder they point to.
    pub fn snapshot(&self) -> BTreeMap<String, String> {
        self.forward
            .keys()
            .map(|id| {
                let value = match self.follow(id) {
                    Lookup::Resolved(r) => r.to_string(),
                    Lookup::Unmapped(end) => end.to_string(),
                    Lookup::Cyclic => String::new(),
                };
                (id.to_string(), value)
            })
            .collect()
    }
}
