//! ECL delegation through the terminology server client

use crate::{
    db::TerminologyQueryService, metrics::ECL_QUERIES_TOTAL, models::ConceptRow, Result,
};
use async_trait::async_trait;
use lexicon_ecl_client::EclClient;

#[async_trait]
impl TerminologyQueryService for EclClient {
    #[tracing::instrument(skip(self), fields(base_url = %self.base_url()))]
    async fn query_expression(&self, expression: &str) -> Result<Vec<ConceptRow>> {
        match self.query(expression).await {
            Ok(concepts) => {
                ECL_QUERIES_TOTAL.with_label_values(&["success"]).inc();
                tracing::debug!(count = concepts.len(), "ECL query answered");
                Ok(concepts
                    .into_iter()
                    .map(|c| {
                        let display = c.display().to_string();
                        ConceptRow::new(c.concept_id, display)
                    })
                    .collect())
            }
            Err(e) => {
                let status = if e.is_retryable() { "retryable_error" } else { "error" };
                ECL_QUERIES_TOTAL.with_label_values(&[status]).inc();
                tracing::warn!(error = %e, "ECL query failed");
                Err(e.into())
            }
        }
    }
}
