use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use embx_core::{centroid, cosine_similarity, dominant_dimension};
use serde::{Deserialize, Serialize};

use crate::compare::ComparisonRow;
use crate::error::EngineError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RankBy {
    /// Keep request order and assign no ranks.
    #[default]
    None,
    Latency,
    Cost,
    /// Agreement with the consensus vector of the compatible rows.
    Quality,
}

impl RankBy {
    pub const ALL: [Self; 4] = [Self::None, Self::Latency, Self::Cost, Self::Quality];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Latency => "latency",
            Self::Cost => "cost",
            Self::Quality => "quality",
        }
    }
}

impl fmt::Display for RankBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RankBy {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|mode| mode.as_str() == wanted)
            .ok_or_else(|| {
                EngineError::Configuration(format!(
                    "unknown rank mode '{s}'; expected one of none, latency, cost, quality"
                ))
            })
    }
}

/// Scores each successful row by cosine similarity to the centroid of the
/// rows sharing the dominant dimension. Rows of any other dimension get no
/// score and are flagged.
pub(crate) fn assign_quality_scores(rows: &mut [ComparisonRow]) {
    let Some(dims) = dominant_dimension(
        rows.iter()
            .filter_map(|r| r.vector.as_ref().map(Vec::len)),
    ) else {
        return;
    };
    let Some(center) = centroid(
        rows.iter().filter_map(|r| r.vector.as_deref()),
        dims,
    ) else {
        return;
    };

    for row in rows.iter_mut() {
        let Some(vector) = row.vector.as_deref() else {
            continue;
        };
        if vector.len() == dims {
            row.quality_score = cosine_similarity(vector, &center);
            row.dimension_mismatch = false;
        } else {
            row.quality_score = None;
            row.dimension_mismatch = true;
        }
    }
}

/// Orders rows by `by` and numbers the successful ones from 1. Failed rows
/// sort last and stay unranked; ties fall back to provider id.
pub(crate) fn rank_rows(rows: &mut [ComparisonRow], by: RankBy) {
    if by == RankBy::None {
        for row in rows.iter_mut() {
            row.rank = None;
        }
        return;
    }

    rows.sort_by(|a, b| {
        tier(a, by)
            .cmp(&tier(b, by))
            .then_with(|| metric(a, b, by))
            .then_with(|| a.provider.cmp(&b.provider))
    });

    let mut next = 1_usize;
    for row in rows.iter_mut() {
        if row.is_ok() {
            row.rank = Some(next);
            next += 1;
        } else {
            row.rank = None;
        }
    }
}

fn tier(row: &ComparisonRow, by: RankBy) -> u8 {
    match (row.is_ok(), by == RankBy::Quality && row.dimension_mismatch) {
        (false, _) => 2,
        (true, true) => 1,
        (true, false) => 0,
    }
}

fn metric(a: &ComparisonRow, b: &ComparisonRow, by: RankBy) -> Ordering {
    match by {
        RankBy::None => Ordering::Equal,
        RankBy::Latency => a.latency_ms.total_cmp(&b.latency_ms),
        RankBy::Cost => known_first(a.cost_usd, b.cost_usd, |x, y| x.total_cmp(&y)),
        RankBy::Quality => known_first(a.quality_score, b.quality_score, |x, y| y.total_cmp(&x)),
    }
}

fn known_first(a: Option<f64>, b: Option<f64>, cmp: impl Fn(f64, f64) -> Ordering) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => cmp(x, y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
