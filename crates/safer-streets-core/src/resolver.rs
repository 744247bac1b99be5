//! Name-to-area resolution over the loaded area registry

use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::error::{CoreError, Result};
use crate::model::{Area, AreaId, AreaSummary};

/// Outcome of resolving a user-supplied force or area name.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution<'a> {
    Found(&'a Area),
    /// Candidates sorted by id. The caller must choose.
    Ambiguous(Vec<AreaSummary>),
    NotFound,
}

impl<'a> Resolution<'a> {
    /// Turn the outcome into a result, keeping the original query for errors.
    pub fn into_result(self, query: &str) -> Result<&'a Area> {
        match self {
            Resolution::Found(area) => Ok(area),
            Resolution::Ambiguous(candidates) => Err(CoreError::AmbiguousArea {
                query: query.to_string(),
                candidates,
            }),
            Resolution::NotFound => Err(CoreError::AreaNotFound {
                query: query.to_string(),
            }),
        }
    }
}

/// The area registry with lookup tables for names and aliases.
#[derive(Debug, Clone, Default)]
pub struct AreaIndex {
    areas: BTreeMap<AreaId, Area>,
    names: HashMap<String, BTreeSet<AreaId>>,
    aliases: HashMap<String, BTreeSet<AreaId>>,
}

impl AreaIndex {
    /// Build the index. Fails with the offending id if two areas share one.
    pub fn build(areas: impl IntoIterator<Item = Area>) -> std::result::Result<Self, AreaId> {
        let mut index = AreaIndex::default();
        for area in areas {
            if index.areas.contains_key(&area.id) {
                return Err(area.id);
            }
            index
                .names
                .entry(normalize(&area.name))
                .or_default()
                .insert(area.id.clone());
            for alias in &area.aliases {
                index
                    .aliases
                    .entry(normalize(alias))
                    .or_default()
                    .insert(area.id.clone());
            }
            index.areas.insert(area.id.clone(), area);
        }
        Ok(index)
    }

    pub fn get(&self, id: &AreaId) -> Option<&Area> {
        self.areas.get(id)
    }

    pub fn contains(&self, id: &AreaId) -> bool {
        self.areas.contains_key(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Area> {
        self.areas.values()
    }

    pub fn len(&self) -> usize {
        self.areas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.areas.is_empty()
    }

    /// Every area, in id order.
    pub fn list(&self) -> Vec<AreaSummary> {
        self.areas.values().map(Area::summary).collect()
    }

    /// Resolve a name: canonical id, then display name, then alias.
    pub fn resolve(&self, query: &str) -> Resolution<'_> {
        let trimmed = query.trim();
        if trimmed.is_empty() {
            return Resolution::NotFound;
        }

        if let Some(area) = self.areas.get(&AreaId::from(trimmed)) {
            return Resolution::Found(area);
        }

        let key = normalize(trimmed);
        for table in [&self.names, &self.aliases] {
            if let Some(ids) = table.get(&key) {
                return self.pick(ids);
            }
        }
        Resolution::NotFound
    }

    fn pick(&self, ids: &BTreeSet<AreaId>) -> Resolution<'_> {
        let mut matched: Vec<&Area> = ids.iter().filter_map(|id| self.areas.get(id)).collect();
        match matched.len() {
            0 => Resolution::NotFound,
            1 => Resolution::Found(matched.remove(0)),
            _ => Resolution::Ambiguous(matched.into_iter().map(Area::summary).collect()),
        }
    }
}

/// Lowercase and collapse runs of whitespace.
fn normalize(s: &str) -> String {
    s.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}
