//! Brute-force nearest-neighbour ranking over stored product embeddings.
//!
//! Every search scores the query against all candidates; there is no index. Cost grows
//! linearly with the number of embedded products.

use crate::domain::embedding::{cosine_similarity, UnitVector};
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

/// Number of matches returned by a similarity search.
pub const DEFAULT_SEARCH_LIMIT: usize = 5;

/// A product considered for ranking.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub id: i32,
    pub name: String,
    pub embedding: Option<Vec<f32>>,
}

/// One ranked match.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct SearchHit {
    pub id: i32,
    pub name: String,
    /// Cosine similarity in `[-1.0, 1.0]`.
    pub score: f32,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RankError {
    #[error("product {id} has a {found}-dim embedding, query has {expected} dims")]
    DimensionMismatch {
        id: i32,
        expected: usize,
        found: usize,
    },
}

/// Scores `candidates` against `query` and returns the best `limit` matches.
///
/// Candidates without an embedding are skipped. Ordering is by descending score; equal
/// scores keep the order of `candidates`.
pub fn rank(
    query: &UnitVector,
    candidates: &[Candidate],
    limit: usize,
) -> Result<Vec<SearchHit>, RankError> {
    let mut scored: Vec<(usize, f32)> = Vec::with_capacity(candidates.len());
    for (idx, candidate) in candidates.iter().enumerate() {
        let Some(embedding) = candidate.embedding.as_deref() else {
            continue;
        };
        let score = cosine_similarity(query.as_slice(), embedding).map_err(|mismatch| {
            RankError::DimensionMismatch {
                id: candidate.id,
                expected: mismatch.left,
                found: mismatch.right,
            }
        })?;
        scored.push((idx, score));
    }

    // sort_by is stable
    scored.sort_by(|a, b| b.1.total_cmp(&a.1));
    scored.truncate(limit);

    Ok(scored
        .into_iter()
        .map(|(idx, score)| SearchHit {
            id: candidates[idx].id,
            name: candidates[idx].name.clone(),
            score,
        })
        .collect())
}
