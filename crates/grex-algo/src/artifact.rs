//! On-disk result artifact: named result arrays plus reliability scalars,
//! stored as JSON and used for regression fixtures.

use crate::opf::{BlockResults, DispatchResults};
use crate::reliability::ReliabilityResults;
use crate::{StudyError, StudyResult};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;
use tracing::info;

/// Solve output keyed the way downstream tooling reads it.
///
/// Dispatch arrays are indexed `[block][entity]`; investment arrays are
/// per slot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultArtifact {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pg: Vec<Vec<f64>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub th: Vec<Vec<f64>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sl: Vec<Vec<f64>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pf: Vec<Vec<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub xpf: Option<Vec<f64>>,
    #[serde(rename = "invT", default, skip_serializing_if = "Option::is_none")]
    pub inv_t: Option<Vec<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub objective: Option<f64>,
    #[serde(rename = "LOLP", default, skip_serializing_if = "Option::is_none")]
    pub lolp: Option<f64>,
    #[serde(rename = "EPNS", default, skip_serializing_if = "Option::is_none")]
    pub epns: Option<f64>,
    #[serde(rename = "LOLE", default, skip_serializing_if = "Option::is_none")]
    pub lole: Option<f64>,
    #[serde(rename = "EENS", default, skip_serializing_if = "Option::is_none")]
    pub eens: Option<f64>,
}

impl ResultArtifact {
    pub fn from_dispatch(results: &DispatchResults) -> Self {
        fn per_block(results: &DispatchResults, f: fn(&BlockResults) -> &Vec<f64>) -> Vec<Vec<f64>> {
            results.blocks.iter().map(|b| f(b).clone()).collect()
        }
        let investment = results.investment.as_ref();
        Self {
            pg: per_block(results, |b| &b.pg),
            th: per_block(results, |b| &b.theta),
            sl: per_block(results, |b| &b.shed),
            pf: per_block(results, |b| &b.flow),
            xpf: investment.map(|inv| inv.slot_flow.clone()),
            inv_t: investment.map(|inv| {
                inv.slot_built
                    .iter()
                    .map(|&built| if built { 1.0 } else { 0.0 })
                    .collect()
            }),
            objective: Some(results.objective),
            ..Self::default()
        }
    }

    pub fn with_reliability(mut self, reliability: &ReliabilityResults) -> Self {
        self.lolp = Some(reliability.lolp);
        self.epns = Some(reliability.epns);
        self.lole = Some(reliability.lole);
        self.eens = Some(reliability.eens);
        self
    }

    pub fn save(&self, path: impl AsRef<Path>) -> StudyResult<()> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|e| {
            StudyError::Artifact(format!("creating {}: {e}", path.display()))
        })?;
        serde_json::to_writer_pretty(BufWriter::new(file), self)
            .map_err(|e| StudyError::Artifact(format!("writing {}: {e}", path.display())))?;
        info!(path = %path.display(), "wrote result artifact");
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> StudyResult<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .map_err(|e| StudyError::Artifact(format!("opening {}: {e}", path.display())))?;
        serde_json::from_reader(BufReader::new(file))
            .map_err(|e| StudyError::Artifact(format!("parsing {}: {e}", path.display())))
    }
}
