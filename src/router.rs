//! Query router and entity disambiguator.
//!
//! `route` decides whether a query is answered from structured zoning
//! tables, unstructured legal text, or both. The delegated classifier is
//! not trusted: its entity list is re-normalized, the city name is filtered
//! out, and the routing rules below override whatever it claims when the
//! pre-screen says otherwise.

use std::sync::Arc;

use anyhow::{Context as _, Result};
use tracing::{info, warn};

use crate::{
    analysis::{
        AnalysisResult, EntitySet, Intent, LegalMetadata, QueryKind, Strategy, DATASET_DOCUMENTS,
        DATASET_REGIME, DATASET_RISK, DATASET_ZOTS_BAIRROS,
    },
    city,
    classify::{Classify, RawAnalysis},
    instructions, normalize,
    screening::{self, LegalScreen, Screen},
    settings::MissingBairroPolicy,
};

pub(crate) const CLARIFICATION_MESSAGE: &str =
    "Para informações precisas sobre construção, por favor informe o bairro onde está localizado o endereço.";

pub(crate) struct QueryRouter {
    classifier: Arc<dyn Classify>,
    missing_bairro: MissingBairroPolicy,
    max_retries: u32,
}

impl QueryRouter {
    pub(crate) fn new(
        classifier: Arc<dyn Classify>,
        missing_bairro: MissingBairroPolicy,
        max_retries: u32,
    ) -> Self {
        Self {
            classifier,
            missing_bairro,
            max_retries,
        }
    }

    /// Analyzes a query and returns the routing decision. Fails only when
    /// the delegated classifier call fails.
    pub(crate) async fn route(&self, query: &str) -> Result<AnalysisResult> {
        let query = query.trim();
        let screen = screening::screen(query);

        if let Some(legal) = &screen.legal {
            info!(query, "legal-article query; skipping classifier");
            return Ok(legal_result(legal));
        }
        if screen.is_objectives_query {
            info!(query, "predefined-objectives query; skipping classifier");
            return Ok(objectives_result());
        }

        let city_mentioned = city::mentions_city(query);
        let adjusted = if city_mentioned {
            let stripped = city::strip_city_mentions(query);
            info!(original = query, adjusted = %stripped, "city mention stripped before classification");
            stripped
        } else {
            query.to_string()
        };

        let instructions = instructions::build(&screen);
        let raw = self.classify_with_retry(&adjusted, &instructions).await?;

        Ok(self.finish(query, &screen, city_mentioned, raw))
    }

    async fn classify_with_retry(&self, query: &str, instructions: &str) -> Result<RawAnalysis> {
        let mut attempt = 0;
        loop {
            match self.classifier.classify(query, instructions).await {
                Ok(raw) => return Ok(raw),
                Err(e) if attempt < self.max_retries => {
                    attempt += 1;
                    warn!(attempt, error = %e, "classifier call failed; retrying");
                }
                Err(e) => return Err(e).context("query analysis failed"),
            }
        }
    }

    fn finish(
        &self,
        original: &str,
        screen: &Screen,
        city_mentioned: bool,
        raw: RawAnalysis,
    ) -> AnalysisResult {
        let mut entities = EntitySet::default();
        for zot in &raw.entities.zots {
            entities.insert_zot(zot);
        }

        // Second defense layer: the instruction forbids the city name, but
        // the classifier does not always comply.
        let mut city_filtered = false;
        for bairro in &raw.entities.bairros {
            if city::is_city_entry(bairro) {
                warn!(entry = %bairro, "removed city name from bairro entities");
                city_filtered = true;
            } else {
                entities.insert_bairro(bairro);
            }
        }
        for parametro in &raw.entities.parametros {
            entities.insert_parametro(parametro);
        }

        // Merge terms the classifier missed.
        for zot in normalize::extract_zone_terms(original) {
            entities.insert_zot(&zot);
        }
        for bairro in normalize::extract_bairro_terms(original) {
            entities.insert_bairro(&bairro);
        }
        if screen.is_short_query
            && entities.bairros.is_empty()
            && !screen.has_construction_terms
            && !screen.is_counting_query
            && !screen.is_risk_query
            && !screen.is_objectives_query
            && !city_mentioned
        {
            if let Some(candidate) = normalize::short_query_candidate(original) {
                entities.insert_bairro(&candidate);
            }
        }

        let mut result = AnalysisResult {
            intent: Intent::parse(&raw.intent),
            strategy: Strategy::parse(&raw.strategy),
            entities,
            is_construction_query: raw.is_construction_query || screen.is_construction_query,
            required_datasets: known_datasets(&raw.required_datasets),
            confidence: raw.confidence.clamp(0.0, 1.0),
            query_kind: QueryKind::parse(&raw.query_kind),
            needs_risk_data: raw.needs_risk_data || screen.is_risk_query,
            needs_clarification: raw.needs_clarification,
            clarification_message: raw.clarification_message,
            metadata: None,
        };

        if result.needs_risk_data {
            result.query_kind = QueryKind::Risk;
            result.intent = Intent::Tabular;
            result.strategy = Strategy::StructuredOnly;
            result.is_construction_query = false;
            result.push_dataset(DATASET_RISK);
        } else if screen.is_counting_query {
            result.query_kind = QueryKind::Counting;
            result.intent = Intent::Tabular;
            result.strategy = Strategy::StructuredOnly;
            result.is_construction_query = false;
            result.push_dataset(DATASET_ZOTS_BAIRROS);
        } else if screen.is_max_height_query {
            result.intent = Intent::Tabular;
            result.strategy = Strategy::StructuredOnly;
            result.is_construction_query = false;
            result.push_dataset_front(DATASET_REGIME);
        } else if (city_mentioned || city_filtered) && result.entities.bairros.is_empty() {
            // A query about the city as a whole never routes to per-bairro
            // tables; it is a generic, conceptual question.
            info!(query = original, "city-wide query; routing to unstructured retrieval");
            result.intent = Intent::Conceptual;
            result.strategy = Strategy::UnstructuredOnly;
            result.is_construction_query = false;
            result.query_kind = QueryKind::General;
            result.required_datasets = vec![DATASET_DOCUMENTS.to_string()];
            result.needs_clarification = false;
            result.clarification_message = None;
        } else if result.is_construction_query {
            result.query_kind = QueryKind::Regime;
            if result.entities.bairros.is_empty() && result.entities.zots.is_empty() {
                // No location at all. Never guess a bairro here; what happens
                // next is the caller's policy.
                warn!(
                    query = original,
                    policy = ?self.missing_bairro,
                    "construction query without a bairro"
                );
                match self.missing_bairro {
                    MissingBairroPolicy::Clarify => {
                        result.needs_clarification = true;
                        result.clarification_message = Some(CLARIFICATION_MESSAGE.to_string());
                        result.required_datasets.clear();
                    }
                    MissingBairroPolicy::Generic => {
                        result.intent = Intent::Conceptual;
                        result.strategy = Strategy::UnstructuredOnly;
                        result.required_datasets = vec![DATASET_DOCUMENTS.to_string()];
                    }
                }
            } else {
                result.strategy = Strategy::StructuredOnly;
                if result.intent == Intent::Conceptual {
                    result.intent = Intent::Tabular;
                }
                result.push_dataset_front(DATASET_REGIME);
                result.push_dataset(DATASET_ZOTS_BAIRROS);
            }
        }

        if !result.needs_clarification
            && matches!(result.strategy, Strategy::UnstructuredOnly | Strategy::Hybrid)
        {
            result.push_dataset(DATASET_DOCUMENTS);
        }

        result
    }
}

fn known_datasets(raw: &[String]) -> Vec<String> {
    const KNOWN: [&str; 4] = [
        DATASET_REGIME,
        DATASET_ZOTS_BAIRROS,
        DATASET_RISK,
        DATASET_DOCUMENTS,
    ];
    let mut datasets = Vec::new();
    for id in raw {
        if KNOWN.contains(&id.as_str()) && !datasets.contains(id) {
            datasets.push(id.clone());
        }
    }
    datasets
}

fn legal_result(legal: &LegalScreen) -> AnalysisResult {
    let mut entities = EntitySet::default();
    for parametro in ["artigo", "lei", "luos", "pdus"] {
        entities.insert_parametro(parametro);
    }
    AnalysisResult {
        intent: Intent::LegalArticle,
        strategy: Strategy::Hybrid,
        entities,
        is_construction_query: false,
        required_datasets: vec![DATASET_DOCUMENTS.to_string()],
        confidence: 0.95,
        query_kind: QueryKind::LegalArticle,
        needs_risk_data: false,
        needs_clarification: false,
        clarification_message: None,
        metadata: Some(LegalMetadata {
            requires_citation: true,
            expected_articles: legal.expected_articles.clone(),
            legal_keywords: legal.laws.clone(),
        }),
    }
}

fn objectives_result() -> AnalysisResult {
    AnalysisResult {
        intent: Intent::PredefinedObjectives,
        strategy: Strategy::Predefined,
        confidence: 1.0,
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::{
        testing::{FailingClassifier, StubClassifier},
        RawEntities,
    };

    fn router_with(raw: RawAnalysis, policy: MissingBairroPolicy) -> QueryRouter {
        QueryRouter::new(Arc::new(StubClassifier::new(raw)), policy, 0)
    }

    fn conceptual_raw() -> RawAnalysis {
        RawAnalysis {
            intent: "conceptual".to_string(),
            strategy: "unstructured_only".to_string(),
            confidence: 0.9,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn city_only_query_routes_to_unstructured() {
        let router = router_with(conceptual_raw(), MissingBairroPolicy::Clarify);
        let result = router
            .route("Altura máxima da construção dos prédios em porto alegre")
            .await
            .unwrap();
        assert!(result.entities.bairros.is_empty());
        assert_eq!(result.intent, Intent::Conceptual);
        assert_eq!(result.strategy, Strategy::UnstructuredOnly);
        assert!(!result.is_construction_query);
        assert_eq!(result.required_datasets, vec![DATASET_DOCUMENTS]);
    }

    #[tokio::test]
    async fn city_name_is_filtered_even_when_classifier_misbehaves() {
        let raw = RawAnalysis {
            intent: "tabular".to_string(),
            strategy: "structured_only".to_string(),
            entities: RawEntities {
                bairros: vec!["Porto Alegre".to_string(), "PORTO  ALEGRE".to_string()],
                ..Default::default()
            },
            is_construction_query: true,
            ..Default::default()
        };
        let router = router_with(raw, MissingBairroPolicy::Clarify);
        let result = router
            .route("o que posso construir em Porto Alegre?")
            .await
            .unwrap();
        assert!(result.entities.bairros.is_empty());
        assert_eq!(result.strategy, Strategy::UnstructuredOnly);
        assert!(!result.is_construction_query);
    }

    #[tokio::test]
    async fn bairro_construction_query_gets_regime_dataset() {
        let raw = RawAnalysis {
            intent: "tabular".to_string(),
            strategy: "structured_only".to_string(),
            entities: RawEntities {
                bairros: vec!["Três Figueiras".to_string()],
                parametros: vec!["altura máxima".to_string()],
                ..Default::default()
            },
            is_construction_query: true,
            query_kind: "regime".to_string(),
            ..Default::default()
        };
        let router = router_with(raw, MissingBairroPolicy::Clarify);
        let result = router
            .route("Qual a altura máxima no bairro Três Figueiras?")
            .await
            .unwrap();
        assert_eq!(result.entities.bairros, vec!["TRÊS FIGUEIRAS"]);
        assert!(result.is_construction_query);
        assert_eq!(result.required_datasets[0], DATASET_REGIME);
        assert_eq!(result.query_kind, QueryKind::Regime);
    }

    #[tokio::test]
    async fn zone_listing_query_accesses_structured_data() {
        let raw = RawAnalysis {
            intent: "tabular".to_string(),
            strategy: "structured_only".to_string(),
            entities: RawEntities {
                bairros: vec!["Centro Histórico".to_string()],
                ..Default::default()
            },
            ..Default::default()
        };
        let router = router_with(raw, MissingBairroPolicy::Clarify);
        let result = router
            .route("Quais são as zonas do Centro Histórico?")
            .await
            .unwrap();
        assert_eq!(result.entities.bairros, vec!["CENTRO HISTÓRICO"]);
        assert_eq!(result.strategy, Strategy::StructuredOnly);
        assert!(result.required_datasets.contains(&DATASET_REGIME.to_string()));
    }

    #[tokio::test]
    async fn construction_query_without_bairro_asks_for_clarification() {
        let router = router_with(conceptual_raw(), MissingBairroPolicy::Clarify);
        let result = router.route("qual a altura máxima permitida?").await.unwrap();
        assert!(result.entities.bairros.is_empty());
        assert!(result.is_construction_query);
        assert!(result.needs_clarification);
        assert_eq!(
            result.clarification_message.as_deref(),
            Some(CLARIFICATION_MESSAGE)
        );
        assert!(result.required_datasets.is_empty());
    }

    #[tokio::test]
    async fn construction_query_without_bairro_can_fall_back_to_generic() {
        let router = router_with(conceptual_raw(), MissingBairroPolicy::Generic);
        let result = router.route("qual a altura máxima permitida?").await.unwrap();
        assert!(result.entities.bairros.is_empty());
        assert!(!result.needs_clarification);
        assert_eq!(result.intent, Intent::Conceptual);
        assert_eq!(result.strategy, Strategy::UnstructuredOnly);
        assert_eq!(result.required_datasets, vec![DATASET_DOCUMENTS]);
    }

    #[tokio::test]
    async fn legal_query_never_reaches_the_classifier() {
        let classifier = Arc::new(FailingClassifier::new());
        let router = QueryRouter::new(classifier.clone(), MissingBairroPolicy::Clarify, 0);
        let result = router
            .route("Qual o artigo sobre a altura máxima?")
            .await
            .unwrap();
        assert_eq!(result.intent, Intent::LegalArticle);
        assert_eq!(result.strategy, Strategy::Hybrid);
        let metadata = result.metadata.expect("legal metadata");
        assert!(metadata.requires_citation);
        assert_eq!(metadata.expected_articles, vec!["Art. 81"]);
        assert_eq!(classifier.calls(), 0);
    }

    #[tokio::test]
    async fn counting_query_is_structured_and_not_construction() {
        let router = router_with(conceptual_raw(), MissingBairroPolicy::Clarify);
        let result = router.route("Quantos bairros tem Porto Alegre?").await.unwrap();
        assert_eq!(result.query_kind, QueryKind::Counting);
        assert_eq!(result.intent, Intent::Tabular);
        assert_eq!(result.strategy, Strategy::StructuredOnly);
        assert!(!result.is_construction_query);
        assert!(result
            .required_datasets
            .contains(&DATASET_ZOTS_BAIRROS.to_string()));
    }

    #[tokio::test]
    async fn risk_query_requires_risk_dataset() {
        let router = router_with(conceptual_raw(), MissingBairroPolicy::Clarify);
        let result = router
            .route("Quais bairros têm risco de inundação?")
            .await
            .unwrap();
        assert!(result.needs_risk_data);
        assert_eq!(result.query_kind, QueryKind::Risk);
        assert!(!result.is_construction_query);
        assert!(result.required_datasets.contains(&DATASET_RISK.to_string()));
    }

    #[tokio::test]
    async fn aggregated_max_height_query_reads_the_regime_table() {
        let router = router_with(conceptual_raw(), MissingBairroPolicy::Clarify);
        let result = router
            .route("Qual a altura máxima mais alta permitida?")
            .await
            .unwrap();
        assert_eq!(result.intent, Intent::Tabular);
        assert_eq!(result.strategy, Strategy::StructuredOnly);
        assert!(!result.is_construction_query);
        assert!(!result.needs_clarification);
        assert_eq!(result.required_datasets[0], DATASET_REGIME);
    }

    #[tokio::test]
    async fn short_query_is_treated_as_a_bairro_lookup() {
        let raw = RawAnalysis {
            intent: "tabular".to_string(),
            strategy: "structured_only".to_string(),
            is_construction_query: true,
            ..Default::default()
        };
        let router = router_with(raw, MissingBairroPolicy::Clarify);
        let result = router.route("três figueiras").await.unwrap();
        assert_eq!(result.entities.bairros, vec!["TRÊS FIGUEIRAS"]);
        assert_eq!(result.required_datasets[0], DATASET_REGIME);
        assert!(result
            .required_datasets
            .contains(&DATASET_ZOTS_BAIRROS.to_string()));
    }

    #[tokio::test]
    async fn routing_is_idempotent_with_a_deterministic_classifier() {
        let raw = RawAnalysis {
            intent: "tabular".to_string(),
            strategy: "structured_only".to_string(),
            entities: RawEntities {
                bairros: vec!["Petrópolis".to_string()],
                ..Default::default()
            },
            is_construction_query: true,
            ..Default::default()
        };
        let query = "o que posso construir no bairro Petrópolis?";
        let router = router_with(raw, MissingBairroPolicy::Clarify);
        let first = router.route(query).await.unwrap();
        let second = router.route(query).await.unwrap();
        assert_eq!(first.required_datasets, second.required_datasets);
        assert_eq!(first.entities.bairros, second.entities.bairros);
    }

    #[tokio::test]
    async fn classifier_failure_propagates_after_retries() {
        let classifier = Arc::new(FailingClassifier::new());
        let router = QueryRouter::new(classifier.clone(), MissingBairroPolicy::Clarify, 1);
        let error = router
            .route("qual a altura máxima permitida?")
            .await
            .unwrap_err();
        assert!(error.to_string().contains("query analysis failed"));
        assert_eq!(classifier.calls(), 2);
    }

    #[tokio::test]
    async fn zone_mention_scopes_structured_lookup_without_bairro() {
        let raw = RawAnalysis {
            intent: "tabular".to_string(),
            strategy: "structured_only".to_string(),
            is_construction_query: true,
            ..Default::default()
        };
        let router = router_with(raw, MissingBairroPolicy::Clarify);
        let result = router.route("qual a altura máxima na zot 7?").await.unwrap();
        assert_eq!(result.entities.zots, vec!["ZOT 07"]);
        assert!(!result.needs_clarification);
        assert_eq!(result.required_datasets[0], DATASET_REGIME);
    }
}
