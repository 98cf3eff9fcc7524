//! GraphQL schema exposed to the chat orchestrator.

use std::sync::Arc;

use async_graphql::{Context, EmptyMutation, EmptySubscription, MergedObject, Object, Result,
    SimpleObject};

use crate::{analysis::AnalysisResult, router::QueryRouter};

/// A set of queries defined in the schema.
///
/// This is exposed only for [`Schema`], and not used directly.
#[derive(Default, MergedObject)]
pub(crate) struct Query(AnalyzeQuery);

pub(crate) type Schema = async_graphql::Schema<Query, EmptyMutation, EmptySubscription>;

#[derive(SimpleObject)]
pub(crate) struct AnalyzeResponse {
    query: String,
    analysis: AnalysisResult,
    timestamp: String,
}

#[derive(Default)]
pub(crate) struct AnalyzeQuery;

#[Object]
impl AnalyzeQuery {
    /// Routes a natural-language query to the datasets that can answer it.
    async fn analyze(&self, ctx: &Context<'_>, query: String) -> Result<AnalyzeResponse> {
        let router = ctx.data::<Arc<QueryRouter>>()?;
        let analysis = router.route(&query).await?;
        Ok(AnalyzeResponse {
            query,
            analysis,
            timestamp: chrono::Utc::now().to_rfc3339(),
        })
    }
}

pub(crate) fn schema(router: Arc<QueryRouter>) -> Schema {
    Schema::build(Query::default(), EmptyMutation, EmptySubscription)
        .data(router)
        .finish()
}
