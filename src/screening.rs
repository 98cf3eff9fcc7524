//! Keyword pre-screen run before the classifier call.
//!
//! A pure regex/keyword pass over the query. Its flags are embedded in the
//! classifier instructions and drive the fast paths that never reach the
//! classifier at all (legal-article and predefined-objectives queries).
//! Matching happens on an accent-folded lowercase copy so "inundação" and
//! "inundacao" behave the same.

use std::sync::LazyLock;

use regex::Regex;

use crate::normalize::remove_accents;

const COEFICIENTE_TERMS: &[&str] = &[
    "coeficiente de aproveitamento",
    "indice de aproveitamento",
    "potencial construtivo",
    "indice construtivo",
    "aproveitamento",
    "coeficiente",
    "ca maximo",
    "ca basico",
];

const OCUPACAO_TERMS: &[&str] = &[
    "taxa de ocupacao",
    "indice de ocupacao",
    "taxa maxima de ocupacao",
    "ocupacao",
];

const ALTURA_TERMS: &[&str] = &[
    "altura maxima",
    "gabarito",
    "limite de altura",
    "altura permitida",
    "altura da edificacao",
    "altura do predio",
    "altura da construcao",
    "metros de altura",
    "cota maxima",
    "limite vertical",
    "restricao de altura",
    "altura",
];

const CONSTRUCTION_TERMS: &[&str] = &[
    "o que pode ser construido",
    "o que posso construir",
    "posso construir",
    "construir",
    "construido",
    "edificar",
    "edificacao",
    "regime urbanistico",
    "parametros construtivos",
    "parametros urbanisticos",
    "indices urbanisticos",
    "regras de construcao",
    "area construida",
    "terreno",
    "lote",
];

const COUNTING_TERMS: &[&str] = &[
    "quantos",
    "quantas",
    "quantidade",
    "total de",
    "numero de",
    "listar",
    "liste",
    "lista",
    "media",
    "indice medio",
];

const RISK_TERMS: &[&str] = &[
    "cota de inundacao",
    "acima da cota",
    "abaixo da cota",
    "area de risco",
    "zona de risco",
    "inundacao",
    "alagamento",
    "enchente",
    "cheia",
    "deslizamento",
    "vendaval",
    "granizo",
    "desastre",
    "risco",
];

const OBJECTIVES_TERMS: &[&str] = &[
    "principais objetivos",
    "objetivos do plano diretor",
    "cinco principais",
    "objetivos",
    "objetivo",
];

static NEIGHBORHOOD_INFO: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:o que|quais?|qual)\s+(?:e|sao|tem|existe|ha)\s+(?:em|no|na)\s+[a-z\s]+\??$")
        .unwrap()
});

static GENERAL_LEGAL: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"\bartigo\s*\d+",
        r"\bart\.?\s*\d+",
        r"\binciso\s+[ivx]+",
        r"\bparagrafo\s*\d+",
        r"§\s*\d+",
        r"\bluos\b",
        r"\bpdus\b",
        r"\blei\s+(?:complementar\s+)?n[º°o]?\.?\s*\d+",
        r"qual\s+artigo",
        r"que\s+artigo",
        r"onde\s+esta.*lei",
        r"lei\s+que\s+trata",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

struct LegalMapping {
    pattern: &'static str,
    articles: &'static [&'static str],
    law: &'static str,
}

const LEGAL_MAPPINGS: &[LegalMapping] = &[
    LegalMapping {
        pattern: r"certificacao.*sustentabilidade|sustentabilidade.*ambiental",
        articles: &["Art. 81, Inciso III"],
        law: "LUOS",
    },
    LegalMapping {
        pattern: r"4[º°]?\s*distrito|quarto\s+distrito",
        articles: &["Art. 74"],
        law: "LUOS",
    },
    LegalMapping {
        pattern: r"altura\s+maxima.*artigo|artigo.*altura\s+maxima",
        articles: &["Art. 81"],
        law: "LUOS",
    },
    LegalMapping {
        pattern: r"coeficiente.*aproveitamento.*artigo|artigo.*coeficiente",
        articles: &["Art. 82"],
        law: "LUOS",
    },
    LegalMapping {
        pattern: r"\bzeis\b.*artigo|artigo.*\bzeis\b",
        articles: &["Art. 92"],
        law: "PDUS",
    },
    LegalMapping {
        pattern: r"outorga\s+onerosa",
        articles: &["Art. 86"],
        law: "LUOS",
    },
    LegalMapping {
        pattern: r"estudo.*impacto.*vizinhanca|\beiv\b",
        articles: &["Art. 89"],
        law: "LUOS",
    },
    LegalMapping {
        pattern: r"recuos?\s+obrigatorios?",
        articles: &["Art. 83"],
        law: "LUOS",
    },
    LegalMapping {
        pattern: r"areas?\s+de\s+preservacao\s+permanente",
        articles: &["Art. 95"],
        law: "PDUS",
    },
    LegalMapping {
        pattern: r"instrumentos.*politica.*urbana",
        articles: &["Art. 78"],
        law: "LUOS",
    },
];

static LEGAL_MAPPING_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    LEGAL_MAPPINGS
        .iter()
        .map(|m| Regex::new(m.pattern).unwrap())
        .collect()
});

/// Signals from a legal-article query: which articles the answer should cite.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct LegalScreen {
    pub(crate) expected_articles: Vec<String>,
    pub(crate) laws: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct Screen {
    pub(crate) is_construction_query: bool,
    pub(crate) has_construction_terms: bool,
    pub(crate) has_bairro_or_zone: bool,
    pub(crate) is_counting_query: bool,
    pub(crate) is_risk_query: bool,
    pub(crate) is_max_height_query: bool,
    pub(crate) is_short_query: bool,
    pub(crate) is_objectives_query: bool,
    pub(crate) legal: Option<LegalScreen>,
}

fn contains_any(folded: &str, terms: &[&str]) -> bool {
    terms.iter().any(|t| folded.contains(t))
}

fn screen_legal(folded: &str) -> Option<LegalScreen> {
    let mut expected_articles = Vec::new();
    let mut laws = Vec::new();
    for (mapping, pattern) in LEGAL_MAPPINGS.iter().zip(LEGAL_MAPPING_PATTERNS.iter()) {
        if pattern.is_match(folded) {
            for article in mapping.articles {
                if !expected_articles.iter().any(|a| a == article) {
                    expected_articles.push((*article).to_string());
                }
            }
            if !laws.iter().any(|l| l == mapping.law) {
                laws.push(mapping.law.to_string());
            }
        }
    }
    let is_legal =
        !expected_articles.is_empty() || GENERAL_LEGAL.iter().any(|p| p.is_match(folded));
    if !is_legal {
        return None;
    }
    if laws.is_empty() {
        laws = vec!["LUOS".to_string(), "PDUS".to_string()];
    }
    Some(LegalScreen {
        expected_articles,
        laws,
    })
}

pub(crate) fn screen(query: &str) -> Screen {
    let folded = remove_accents(&query.trim().to_lowercase());

    let legal = screen_legal(&folded);

    let has_construction_terms = contains_any(&folded, CONSTRUCTION_TERMS)
        || contains_any(&folded, COEFICIENTE_TERMS)
        || contains_any(&folded, OCUPACAO_TERMS)
        || contains_any(&folded, ALTURA_TERMS);
    let has_bairro_or_zone =
        folded.contains("bairro") || folded.contains("zot") || folded.contains("zona");

    let has_counting_terms = contains_any(&folded, COUNTING_TERMS);
    let is_counting_query = has_counting_terms && has_bairro_or_zone;
    let is_risk_query = contains_any(&folded, RISK_TERMS);
    let is_objectives_query = contains_any(&folded, OBJECTIVES_TERMS);

    let is_max_height_query = folded.contains("maior altura")
        || (folded.contains("altura") && folded.contains("mais alta"))
        || (folded.contains("altura") && folded.contains("maxima") && folded.contains("maior"));

    let word_count = folded.split_whitespace().count();
    let is_short_query = (1..=3).contains(&word_count);
    let might_be_neighborhood = is_short_query || NEIGHBORHOOD_INFO.is_match(&folded);

    let asks_for_neighborhood_data = !is_counting_query
        && !is_max_height_query
        && ((has_construction_terms && has_bairro_or_zone)
            || (might_be_neighborhood
                && !is_objectives_query
                && !is_risk_query
                && legal.is_none())
            || folded.contains("zot")
            || folded.contains("zona")
            || folded.contains("regime")
            || folded.contains("urbanistico")
            || folded.contains("indice")
            || folded.contains("coeficiente")
            || folded.contains("altura")
            || folded.contains("potencial")
            || folded.contains("construtivo"));

    Screen {
        is_construction_query: asks_for_neighborhood_data && !is_risk_query,
        has_construction_terms,
        has_bairro_or_zone,
        is_counting_query,
        is_risk_query,
        is_max_height_query,
        is_short_query,
        is_objectives_query,
        legal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn height_query_is_construction() {
        let screen = screen("qual a altura máxima permitida?");
        assert!(screen.is_construction_query);
        assert!(!screen.is_counting_query);
        assert!(!screen.is_max_height_query);
    }

    #[test]
    fn counting_query_is_never_construction() {
        let screen = screen("Quantos bairros tem Porto Alegre?");
        assert!(screen.is_counting_query);
        assert!(!screen.is_construction_query);
    }

    #[test]
    fn risk_query_is_flagged() {
        let screen = screen("Quais bairros têm risco de inundação?");
        assert!(screen.is_risk_query);
        assert!(!screen.is_construction_query);
    }

    #[test]
    fn aggregated_max_height_is_not_construction() {
        let screen = screen("Qual a altura máxima mais alta permitida?");
        assert!(screen.is_max_height_query);
        assert!(!screen.is_construction_query);
    }

    #[test]
    fn short_query_looks_like_a_bairro() {
        let screen = screen("três figueiras");
        assert!(screen.is_short_query);
        assert!(screen.is_construction_query);
    }

    #[test]
    fn mapped_legal_queries_carry_expected_articles() {
        let screen = screen("Qual o artigo sobre a altura máxima?");
        let legal = screen.legal.expect("legal screen");
        assert_eq!(legal.expected_articles, vec!["Art. 81"]);
        assert_eq!(legal.laws, vec!["LUOS"]);
    }

    #[test]
    fn zeis_is_legal_only_next_to_artigo() {
        let screen = screen("Quais bairros possuem ZEIS?");
        assert!(screen.legal.is_none());

        let screen = super::screen("Qual artigo define as ZEIS?");
        let legal = screen.legal.expect("legal screen");
        assert_eq!(legal.expected_articles, vec!["Art. 92"]);
        assert_eq!(legal.laws, vec!["PDUS"]);
    }

    #[test]
    fn flood_synonyms_are_risk_queries() {
        let screen = screen("Quais são as áreas de cheia?");
        assert!(screen.is_risk_query);
        assert!(!screen.is_construction_query);
    }

    #[test]
    fn general_legal_patterns_default_to_both_laws() {
        let screen = screen("qual artigo trata disso?");
        let legal = screen.legal.expect("legal screen");
        assert!(legal.expected_articles.is_empty());
        assert_eq!(legal.laws, vec!["LUOS", "PDUS"]);
    }

    #[test]
    fn objectives_query_is_flagged() {
        let screen = screen("Quais são os principais objetivos do plano diretor?");
        assert!(screen.is_objectives_query);
    }
}
