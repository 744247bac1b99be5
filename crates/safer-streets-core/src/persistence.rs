//! Stability of a subject's classification across ordered snapshots

use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};
use crate::model::{AreaId, Snapshot};

/// Comparison of two consecutive snapshots in which the subject is present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transition {
    pub from: String,
    pub to: String,
    pub from_class: String,
    pub to_class: String,
    pub unchanged: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistenceReport<K = AreaId> {
    pub subject: K,
    /// Every snapshot id considered, in order.
    pub snapshots: Vec<String>,
    /// Snapshots with a classification for the subject.
    pub present: usize,
    /// Snapshots without one; skipped from comparison.
    pub gaps: Vec<String>,
    pub transitions: Vec<Transition>,
    /// Fraction of transitions with an unchanged classification. `None`
    /// when fewer than two snapshots contain the subject.
    pub stability: Option<f64>,
    /// Classification in the most recent snapshot containing the subject.
    pub latest: Option<String>,
}

impl<K> PersistenceReport<K> {
    pub fn changes(&self) -> usize {
        self.transitions.iter().filter(|t| !t.unchanged).count()
    }
}

/// Measure how stable `subject`'s classification is over `snapshots`.
///
/// Snapshots are taken in the order given. Fails only when no snapshot
/// classifies the subject.
pub fn analyze_persistence<K>(subject: &K, snapshots: &[Snapshot<K>]) -> Result<PersistenceReport<K>>
where
    K: Ord + Clone + Display,
{
    let mut gaps = Vec::new();
    let mut present: Vec<(&str, &str)> = Vec::new();
    for snapshot in snapshots {
        match snapshot.classification(subject) {
            Some(class) => present.push((snapshot.id(), class)),
            None => gaps.push(snapshot.id().to_string()),
        }
    }

    if present.is_empty() {
        return Err(CoreError::insufficient_data(
            subject,
            format!("none of {} snapshots contain it", snapshots.len()),
        ));
    }

    let transitions: Vec<Transition> = present
        .windows(2)
        .map(|pair| {
            let (from, from_class) = pair[0];
            let (to, to_class) = pair[1];
            Transition {
                from: from.to_string(),
                to: to.to_string(),
                from_class: from_class.to_string(),
                to_class: to_class.to_string(),
                unchanged: from_class == to_class,
            }
        })
        .collect();

    let stability = if transitions.is_empty() {
        None
    } else {
        let unchanged = transitions.iter().filter(|t| t.unchanged).count();
        Some(unchanged as f64 / transitions.len() as f64)
    };

    Ok(PersistenceReport {
        subject: subject.clone(),
        snapshots: snapshots.iter().map(|s| s.id().to_string()).collect(),
        present: present.len(),
        gaps,
        latest: present.last().map(|(_, class)| class.to_string()),
        transitions,
        stability,
    })
}
