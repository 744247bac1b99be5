//! Page view models assembled from session calls

use std::fmt;

use safer_streets_core::hotspots::CellFrequency;
use safer_streets_core::{Area, AreaSummary, PersistenceReport, Record};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::client::RepetitionRequest;
use crate::error::ClientError;
use crate::session::Session;

/// A force with its land area.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AreaView {
    pub area: Area,
    pub area_km2: Option<f64>,
}

impl AreaView {
    pub async fn load(session: &mut Session, force: &str) -> Result<Self, ClientError> {
        let area = session.area(force).await?;
        let area_km2 = match session.pfa_area(area.id.as_str()).await {
            Ok(response) => Some(response.area_km2),
            Err(ClientError::NotFound(_)) => None,
            Err(e) => return Err(e),
        };
        Ok(Self { area, area_km2 })
    }
}

impl fmt::Display for AreaView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.area.name, self.area.id)?;
        if let Some(km2) = self.area_km2 {
            write!(f, ": {:.1} km²", km2)?;
        }
        Ok(())
    }
}

/// Values of one demographics-style dataset for one force.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DemographicsView {
    pub area: AreaSummary,
    pub dataset: String,
    pub classification: Option<String>,
    pub values: Map<String, Value>,
}

impl DemographicsView {
    pub async fn load(session: &mut Session, force: &str, dataset: &str) -> Result<Self, ClientError> {
        let area = session.area(force).await?;
        let record = session.record(dataset, area.id.as_str()).await?;
        Ok(Self {
            area: area.summary(),
            dataset: dataset.to_string(),
            classification: record.classification,
            values: record.values,
        })
    }
}

impl fmt::Display for DemographicsView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} in {}", self.dataset, self.area.name)?;
        for (key, value) in &self.values {
            writeln!(f, "  {:<20} {}", key, value)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonRow {
    pub area: AreaSummary,
    /// `None` when the dataset has no record for this force.
    pub record: Option<Record>,
}

/// One dataset across several forces.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonView {
    pub dataset: String,
    pub rows: Vec<ComparisonRow>,
}

impl ComparisonView {
    /// Every force must resolve. A force without a record gets an empty row.
    pub async fn load(session: &mut Session, dataset: &str, forces: &[&str]) -> Result<Self, ClientError> {
        let mut rows = Vec::with_capacity(forces.len());
        for force in forces {
            let area = session.area(force).await?.summary();
            let record = match session.record(dataset, area.id.as_str()).await {
                Ok(record) => Some(record),
                Err(ClientError::NotFound(_)) => None,
                Err(e) => return Err(e),
            };
            rows.push(ComparisonRow { area, record });
        }
        Ok(Self {
            dataset: dataset.to_string(),
            rows,
        })
    }

    /// Value of `key` for each row, in row order.
    pub fn column(&self, key: &str) -> Vec<Option<&Value>> {
        self.rows
            .iter()
            .map(|row| row.record.as_ref().and_then(|r| r.values.get(key)))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HotspotWindowRow {
    pub label: String,
    pub captured_pct: f64,
    pub predicted_pct: Option<f64>,
    pub gini: f64,
    /// Share of cells holding half the window's crime.
    pub l_50: f64,
}

/// Summary of hotspot repetition for one force and crime category.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HotspotView {
    pub area: AreaSummary,
    pub category: String,
    pub n_hotspots: usize,
    pub windows: Vec<HotspotWindowRow>,
    pub mean_captured_pct: f64,
    pub mean_predicted_pct: Option<f64>,
    /// Cells that were hotspots most often, most frequent first.
    pub recurring: Vec<CellFrequency>,
}

impl HotspotView {
    pub const MAX_RECURRING: usize = 10;

    pub async fn load(
        session: &mut Session,
        force: &str,
        category: &str,
        request: &RepetitionRequest,
    ) -> Result<Self, ClientError> {
        let area = session.area(force).await?.summary();
        let repetition = session.repetition(area.id.as_str(), category, request).await?;

        let windows: Vec<HotspotWindowRow> = repetition
            .windows
            .iter()
            .map(|w| HotspotWindowRow {
                label: w.label.clone(),
                captured_pct: w.captured_pct,
                predicted_pct: w.prediction.as_ref().map(|p| p.predicted_pct),
                gini: w.gini,
                l_50: w.lorenz.l_50,
            })
            .collect();
        let captured: Vec<f64> = windows.iter().map(|w| w.captured_pct).collect();
        let predicted: Vec<f64> = windows.iter().filter_map(|w| w.predicted_pct).collect();

        Ok(Self {
            area,
            category: repetition.category,
            n_hotspots: repetition.params.n_hotspots,
            mean_captured_pct: mean(&captured).unwrap_or(0.0),
            mean_predicted_pct: mean(&predicted),
            windows,
            recurring: repetition.cells.into_iter().take(Self::MAX_RECURRING).collect(),
        })
    }
}

impl fmt::Display for HotspotView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} in {}: top {} cells capture {:.1}% of crime on average",
            self.category, self.area.name, self.n_hotspots, self.mean_captured_pct
        )?;
        for w in &self.windows {
            match w.predicted_pct {
                Some(p) => writeln!(f, "  {:<22} {:>5.1}%  next {:>5.1}%", w.label, w.captured_pct, p)?,
                None => writeln!(f, "  {:<22} {:>5.1}%", w.label, w.captured_pct)?,
            }
        }
        Ok(())
    }
}

/// Stability of a force's classification over a series, with a readable label.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PersistenceView {
    pub report: PersistenceReport,
    pub label: &'static str,
}

impl PersistenceView {
    pub async fn load(session: &mut Session, force: &str, series: &str) -> Result<Self, ClientError> {
        let report = session.persistence(force, series).await?;
        Ok(Self::from_report(report))
    }

    pub fn from_report(report: PersistenceReport) -> Self {
        Self {
            label: stability_label(report.stability),
            report,
        }
    }
}

impl fmt::Display for PersistenceView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.report.subject, self.label)?;
        if let Some(score) = self.report.stability {
            write!(f, " ({:.0}% unchanged)", score * 100.0)?;
        }
        if !self.report.gaps.is_empty() {
            write!(f, ", missing from {}", self.report.gaps.join(", "))?;
        }
        Ok(())
    }
}

pub fn stability_label(stability: Option<f64>) -> &'static str {
    match stability {
        None => "not enough history",
        Some(s) if s >= 0.8 => "stable",
        Some(s) if s >= 0.5 => "mixed",
        Some(_) => "volatile",
    }
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}
