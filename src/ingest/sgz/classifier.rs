use super::normalizer::fold_text;
use crate::domain::TechnicalArea;

/// Keyword lists driving technical-area classification. Reporting correctness
/// depends entirely on keeping these synchronized with the upstream service
/// taxonomy, so they live here as plain editable data.
///
/// Matching is an accent/case-folded substring check. The greenery list is
/// consulted first: a service type matching both lists classifies as
/// greenery. Swap the two checks in `classify` to change that policy.
const PARKS_AND_GREENERY_KEYWORDS: &[&str] = &[
    "PODA",
    "ARVORE",
    "CORTE DE GRAMA",
    "ROCAGEM",
    "CAPINA",
    "JARDIM",
    "PRACA",
    "CANTEIRO",
    "VEGETACAO",
    "MATO ALTO",
];

const MAINTENANCE_KEYWORDS: &[&str] = &[
    "SERRALHERIA",
    "TAPA-BURACO",
    "TAPA BURACO",
    "BURACO",
    "PAVIMENTA",
    "GUIA",
    "SARJETA",
    "CALCADA",
    "PASSEIO",
    "BOCA DE LOBO",
    "GALERIA",
    "DRENAGEM",
    "ILUMINACAO",
    "PINTURA",
    "ALAMBRADO",
    "MURO",
    "SINALIZACAO",
];

/// Classify a free-text service-type string into a technical area.
///
/// Pure function: no match means unclassified (`None`), never a rejection.
pub fn classify(service_type: &str) -> Option<TechnicalArea> {
    let folded = fold_text(service_type);
    if folded.is_empty() {
        return None;
    }

    if matches_any(&folded, PARKS_AND_GREENERY_KEYWORDS) {
        return Some(TechnicalArea::ParksAndGreenery);
    }
    if matches_any(&folded, MAINTENANCE_KEYWORDS) {
        return Some(TechnicalArea::Maintenance);
    }

    None
}

fn matches_any(folded: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|keyword| folded.contains(keyword))
}
