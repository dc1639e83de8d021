//! External suggestion oracle port

use async_trait::async_trait;

use crate::types::{Suggestion, SuggestionContext};
use crate::ResolverResult;

/// Proposes alternative bumps when conflicts remain unresolved.
///
/// Suggestions are untrusted: every one is re-validated against the
/// registry and the unresolved peer ranges before it is queued.
#[async_trait]
pub trait SuggestionOracle: Send + Sync {
    async fn suggest_alternatives(&self, context: &SuggestionContext) -> ResolverResult<Vec<Suggestion>>;
}
