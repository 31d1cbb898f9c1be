use crate::errors::FleetqlResult;

/// Pairwise relevance scorer for second-pass ranking.
pub trait IReranker: Send + Sync {
    /// Score how relevant `candidate` is to `query`. Higher is better.
    /// Scores are only compared against each other within one call site,
    /// so no particular range is required.
    fn score(&self, query: &str, candidate: &str) -> FleetqlResult<f64>;

    /// Human-readable scorer name.
    fn name(&self) -> &str;
}
