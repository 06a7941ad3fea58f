use serde::{Deserialize, Serialize};

use crate::index::Summary;

/// Where a search result's score came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoreType {
    Bm25,
    Embedding,
    Hybrid,
}

impl std::fmt::Display for ScoreType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScoreType::Bm25 => write!(f, "bm25"),
            ScoreType::Embedding => write!(f, "embedding"),
            ScoreType::Hybrid => write!(f, "hybrid"),
        }
    }
}

/// One search result with score provenance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoredResult {
    pub summary: Summary,
    pub score: f64,
    pub score_type: ScoreType,
}

/// Result list with narrowing helpers that do not re-run the search.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Results(pub Vec<ScoredResult>);

impl Results {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ScoredResult> {
        self.0.iter()
    }

    pub fn ids(&self) -> Vec<String> {
        self.0.iter().map(|r| r.summary.id.clone()).collect()
    }

    pub fn summaries(&self) -> Vec<Summary> {
        self.0.iter().map(|r| r.summary.clone()).collect()
    }

    pub fn filter_by_namespace(&self, namespace: &str) -> Results {
        Results(self.0.iter().filter(|r| r.summary.namespace == namespace).cloned().collect())
    }

    pub fn filter_by_min_score(&self, min_score: f64) -> Results {
        Results(self.0.iter().filter(|r| r.score >= min_score).cloned().collect())
    }
}

impl IntoIterator for Results {
    type Item = ScoredResult;
    type IntoIter = std::vec::IntoIter<ScoredResult>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Results {
    type Item = &'a ScoredResult;
    type IntoIter = std::slice::Iter<'a, ScoredResult>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
