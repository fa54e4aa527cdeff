//! Expense categories and keyword-based category normalization
//!
//! The model is asked for a short PT-BR category word but nothing enforces it,
//! so every category that reaches the store goes through [`normalize_category`].
//! Rules are tested in order and the first match wins: "restaurante" hits
//! `alimentacao` before anything else, and tokens like "extra" only count as
//! `mercado` when no earlier rule matched.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Closed set of expense categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Alimentacao,
    Transporte,
    Lazer,
    Saude,
    Educacao,
    Mercado,
    Outros,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Alimentacao => "alimentacao",
            Self::Transporte => "transporte",
            Self::Lazer => "lazer",
            Self::Saude => "saude",
            Self::Educacao => "educacao",
            Self::Mercado => "mercado",
            Self::Outros => "outros",
        }
    }

    /// Get all categories
    pub fn all() -> &'static [Category] {
        &[
            Self::Alimentacao,
            Self::Transporte,
            Self::Lazer,
            Self::Saude,
            Self::Educacao,
            Self::Mercado,
            Self::Outros,
        ]
    }
}

impl std::str::FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "alimentacao" => Ok(Self::Alimentacao),
            "transporte" => Ok(Self::Transporte),
            "lazer" => Ok(Self::Lazer),
            "saude" => Ok(Self::Saude),
            "educacao" => Ok(Self::Educacao),
            "mercado" => Ok(Self::Mercado),
            "outros" => Ok(Self::Outros),
            _ => Err(format!("Unknown category: {}", s)),
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Keyword rules in priority order
const RULES: &[(&str, Category)] = &[
    ("aliment|rest|food|lanch|caf|bar", Category::Alimentacao),
    ("uber|99|transp|bus|metr|gas|combust|estac", Category::Transporte),
    ("cinema|lazer|entreten|netflix|spotify|game", Category::Lazer),
    ("saude|farm|clinic|medic|plano", Category::Saude),
    ("escola|curso|facul|educ", Category::Educacao),
    (
        "mercad|super|hort|atacad|carref|extra|pao de acucar",
        Category::Mercado,
    ),
];

fn compiled_rules() -> &'static [(Regex, Category)] {
    static COMPILED: OnceLock<Vec<(Regex, Category)>> = OnceLock::new();
    COMPILED.get_or_init(|| {
        RULES
            .iter()
            .filter_map(|(pattern, category)| {
                Regex::new(pattern).ok().map(|regex| (regex, *category))
            })
            .collect()
    })
}

/// Map free text (usually the model's category suggestion) to a [`Category`]
///
/// Never fails: empty, absent or unrecognized input yields [`Category::Outros`].
pub fn normalize_category(text: Option<&str>) -> Category {
    let text = text.unwrap_or_default().to_lowercase();
    if text.is_empty() {
        return Category::Outros;
    }

    compiled_rules()
        .iter()
        .find(|(regex, _)| regex.is_match(&text))
        .map(|(_, category)| *category)
        .unwrap_or(Category::Outros)
}

/// Decode a stored category value
///
/// Exact wire words map directly; anything else is normalized so stored
/// records always land in the closed set.
pub fn category_from_stored(value: &str) -> Category {
    value
        .parse()
        .unwrap_or_else(|_| normalize_category(Some(value)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_food_keywords() {
        assert_eq!(normalize_category(Some("restaurante")), Category::Alimentacao);
        assert_eq!(normalize_category(Some("Alimentação")), Category::Alimentacao);
        assert_eq!(normalize_category(Some("lanchonete")), Category::Alimentacao);
        assert_eq!(normalize_category(Some("Café do Ponto")), Category::Alimentacao);
    }

    #[test]
    fn test_empty_and_missing_input() {
        assert_eq!(normalize_category(None), Category::Outros);
        assert_eq!(normalize_category(Some("")), Category::Outros);
        assert_eq!(normalize_category(Some("xyz")), Category::Outros);
    }

    #[test]
    fn test_each_rule() {
        assert_eq!(normalize_category(Some("Uber")), Category::Transporte);
        assert_eq!(normalize_category(Some("combustivel")), Category::Transporte);
        assert_eq!(normalize_category(Some("99 Taxi")), Category::Transporte);
        assert_eq!(normalize_category(Some("Netflix")), Category::Lazer);
        assert_eq!(normalize_category(Some("farmacia")), Category::Saude);
        assert_eq!(normalize_category(Some("curso de ingles")), Category::Educacao);
        assert_eq!(normalize_category(Some("Supermercado")), Category::Mercado);
        assert_eq!(normalize_category(Some("pao de acucar")), Category::Mercado);
    }

    #[test]
    fn test_first_rule_wins() {
        // "bar" (alimentacao) is checked before "extra" (mercado)
        assert_eq!(normalize_category(Some("bar extra")), Category::Alimentacao);
        // "gas" (transporte) is checked before "game" (lazer)
        assert_eq!(normalize_category(Some("gas game")), Category::Transporte);
    }

    #[test]
    fn test_wire_words_normalize_to_themselves() {
        for category in Category::all() {
            assert_eq!(normalize_category(Some(category.as_str())), *category);
        }
    }

    #[test]
    fn test_from_str_and_display() {
        assert_eq!("MERCADO".parse::<Category>().unwrap(), Category::Mercado);
        assert!("groceries".parse::<Category>().is_err());
        assert_eq!(Category::Saude.to_string(), "saude");
    }

    #[test]
    fn test_category_from_stored() {
        assert_eq!(category_from_stored("lazer"), Category::Lazer);
        assert_eq!(category_from_stored("Supermercado"), Category::Mercado);
        assert_eq!(category_from_stored("???"), Category::Outros);
    }

    #[test]
    fn test_serde_wire_form() {
        let json = serde_json::to_string(&Category::Alimentacao).unwrap();
        assert_eq!(json, "\"alimentacao\"");
        let back: Category = serde_json::from_str("\"educacao\"").unwrap();
        assert_eq!(back, Category::Educacao);
    }
}
