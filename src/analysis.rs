//! Data model for query analysis results.
//!
//! An [`AnalysisResult`] is produced fresh for every incoming query and handed
//! to the orchestrator as JSON; it has no persistent identity.

use async_graphql::{Enum, SimpleObject};
use serde::{Deserialize, Serialize};

use crate::{city, normalize};

/// Structured zoning parameters per bairro and zone.
pub(crate) const DATASET_REGIME: &str = "regime_urbanistico";
/// Mapping between ZOT codes and bairros.
pub(crate) const DATASET_ZOTS_BAIRROS: &str = "zots_bairros";
/// Flood-protection and disaster-risk table.
pub(crate) const DATASET_RISK: &str = "bairros_risco_desastre";
/// Unstructured legal text (LUOS and PDUS sections).
pub(crate) const DATASET_DOCUMENTS: &str = "document_sections";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Enum, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum Intent {
    #[default]
    Conceptual,
    Tabular,
    Hybrid,
    LegalArticle,
    PredefinedObjectives,
}

impl Intent {
    pub(crate) fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "conceptual" => Intent::Conceptual,
            "tabular" => Intent::Tabular,
            "legal_article" => Intent::LegalArticle,
            "predefined_objectives" => Intent::PredefinedObjectives,
            _ => Intent::Hybrid,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Enum, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum Strategy {
    StructuredOnly,
    #[default]
    UnstructuredOnly,
    Hybrid,
    Predefined,
}

impl Strategy {
    pub(crate) fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "structured_only" => Strategy::StructuredOnly,
            "unstructured_only" => Strategy::UnstructuredOnly,
            "predefined" => Strategy::Predefined,
            _ => Strategy::Hybrid,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Enum, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum QueryKind {
    Regime,
    Risk,
    Counting,
    #[default]
    General,
    LegalArticle,
}

impl QueryKind {
    pub(crate) fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "regime" => QueryKind::Regime,
            "risk" => QueryKind::Risk,
            "counting" => QueryKind::Counting,
            "legal_article" => QueryKind::LegalArticle,
            _ => QueryKind::General,
        }
    }
}

/// Entities extracted from a query, normalized and deduplicated.
///
/// `bairros` never contains the city name; [`EntitySet::insert_bairro`]
/// rejects it regardless of casing or spacing.
#[derive(Debug, Clone, Default, PartialEq, Eq, SimpleObject, Serialize, Deserialize)]
pub(crate) struct EntitySet {
    pub(crate) bairros: Vec<String>,
    pub(crate) zots: Vec<String>,
    pub(crate) parametros: Vec<String>,
}

impl EntitySet {
    /// Normalizes and inserts a bairro name, keeping insertion order.
    /// Entries equal to or containing the city name are dropped.
    pub(crate) fn insert_bairro(&mut self, raw: &str) -> bool {
        let normalized = normalize::normalize_bairro(raw);
        if normalized.is_empty() || city::is_city_entry(&normalized) {
            return false;
        }
        if self.bairros.contains(&normalized) {
            return false;
        }
        self.bairros.push(normalized);
        true
    }

    pub(crate) fn insert_zot(&mut self, raw: &str) {
        let normalized = normalize::normalize_zone(raw);
        if !normalized.is_empty() && !self.zots.contains(&normalized) {
            self.zots.push(normalized);
        }
    }

    pub(crate) fn insert_parametro(&mut self, raw: &str) {
        let trimmed = raw.trim().to_lowercase();
        if !trimmed.is_empty() && !self.parametros.contains(&trimmed) {
            self.parametros.push(trimmed);
        }
    }
}

/// Citation metadata attached to legal-article queries.
#[derive(Debug, Clone, Default, PartialEq, Eq, SimpleObject, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct LegalMetadata {
    pub(crate) requires_citation: bool,
    pub(crate) expected_articles: Vec<String>,
    pub(crate) legal_keywords: Vec<String>,
}

/// The routing decision for a single query.
#[derive(Debug, Clone, Default, PartialEq, SimpleObject, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AnalysisResult {
    pub(crate) intent: Intent,
    pub(crate) strategy: Strategy,
    pub(crate) entities: EntitySet,
    pub(crate) is_construction_query: bool,
    pub(crate) required_datasets: Vec<String>,
    pub(crate) confidence: f64,
    #[serde(rename = "queryType")]
    #[graphql(name = "queryType")]
    pub(crate) query_kind: QueryKind,
    pub(crate) needs_risk_data: bool,
    pub(crate) needs_clarification: bool,
    pub(crate) clarification_message: Option<String>,
    pub(crate) metadata: Option<LegalMetadata>,
}

impl AnalysisResult {
    /// Appends a dataset if it is not already required.
    pub(crate) fn push_dataset(&mut self, id: &str) {
        if !self.required_datasets.iter().any(|d| d == id) {
            self.required_datasets.push(id.to_string());
        }
    }

    /// Puts a dataset at the front of the list, moving it there if present.
    pub(crate) fn push_dataset_front(&mut self, id: &str) {
        self.required_datasets.retain(|d| d != id);
        self.required_datasets.insert(0, id.to_string());
    }
}
