use std::cmp::Ordering;

use serde::Serialize;

use crate::model::InventoryRecord;

// Fixed score tiers for the smart-mode match ladder; strictly descending so
// the match kind alone decides rank between tiers.
const SCORE_EXACT_NAME: f64 = 1000.0;
const SCORE_NAME_PREFIX: f64 = 900.0;
const SCORE_NAME_CONTAINS: f64 = 800.0;
const SCORE_BASE_EXACT: f64 = 700.0;
const SCORE_BASE_PREFIX: f64 = 600.0;
const SCORE_BASE_CONTAINS: f64 = 500.0;
const SCORE_EXACT_FIELD: f64 = 1000.0;

/// Per-term, per-field contribution on the multi-term fallback path.
const SCORE_TERM_FIELD: f64 = 40.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchMode {
    Exact,
    Smart,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    ExactField,
    ExactName,
    NamePrefix,
    NameContains,
    BaseNameExact,
    BaseNamePrefix,
    BaseNameContains,
    MultiTerm,
}

impl MatchKind {
    pub fn as_str(self) -> &'static str {
        match self {
            MatchKind::ExactField => "exact_field",
            MatchKind::ExactName => "exact_name",
            MatchKind::NamePrefix => "name_prefix",
            MatchKind::NameContains => "name_contains",
            MatchKind::BaseNameExact => "base_name_exact",
            MatchKind::BaseNamePrefix => "base_name_prefix",
            MatchKind::BaseNameContains => "base_name_contains",
            MatchKind::MultiTerm => "multi_term",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ScoredMatch<'a> {
    pub item: &'a InventoryRecord,
    pub score: f64,
    pub kind: MatchKind,
}

/// Item name with every parenthesized segment removed, trimmed and lowercased,
/// so "Max Candy (4 for 5)" ranks under "max candy".
pub fn base_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut depth = 0_u32;

    for ch in name.chars() {
        match ch {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            _ if depth == 0 => out.push(ch),
            _ => {}
        }
    }

    out.split_whitespace()
        .collect::<Vec<&str>>()
        .join(" ")
        .to_lowercase()
}

/// Rank a catalog snapshot against a free-text query. Items that match
/// neither path are omitted, not zero-scored. Results are ordered by score
/// descending, ties broken by case-insensitive name.
pub fn search<'a>(
    catalog: &'a [InventoryRecord],
    query: &str,
    mode: SearchMode,
) -> Vec<ScoredMatch<'a>> {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return Vec::new();
    }

    let mut matches: Vec<ScoredMatch<'a>> = catalog
        .iter()
        .filter_map(|item| match mode {
            SearchMode::Exact => classify_exact(item, &query),
            SearchMode::Smart => classify_smart(item, &query),
        })
        .collect();

    matches.sort_by(|left, right| {
        right
            .score
            .total_cmp(&left.score)
            .then_with(|| name_key(&left.item.name).cmp(&name_key(&right.item.name)))
    });

    matches
}

fn classify_exact<'a>(item: &'a InventoryRecord, query: &str) -> Option<ScoredMatch<'a>> {
    let fields = [
        item.name.to_lowercase(),
        item.category.to_lowercase(),
        item.price.to_lowercase(),
        item.stock.to_string(),
    ];

    if fields.iter().any(|field| field == query) {
        return Some(ScoredMatch {
            item,
            score: SCORE_EXACT_FIELD,
            kind: MatchKind::ExactField,
        });
    }

    None
}

fn classify_smart<'a>(item: &'a InventoryRecord, query: &str) -> Option<ScoredMatch<'a>> {
    let name = item.name.to_lowercase();
    let base = base_name(&item.name);

    let tier = if name == query {
        Some((SCORE_EXACT_NAME, MatchKind::ExactName))
    } else if name.starts_with(query) {
        Some((SCORE_NAME_PREFIX, MatchKind::NamePrefix))
    } else if name.contains(query) {
        Some((SCORE_NAME_CONTAINS, MatchKind::NameContains))
    } else if base == query {
        Some((SCORE_BASE_EXACT, MatchKind::BaseNameExact))
    } else if base.starts_with(query) {
        Some((SCORE_BASE_PREFIX, MatchKind::BaseNamePrefix))
    } else if base.contains(query) {
        Some((SCORE_BASE_CONTAINS, MatchKind::BaseNameContains))
    } else {
        None
    };

    if let Some((score, kind)) = tier {
        return Some(ScoredMatch { item, score, kind });
    }

    let terms: Vec<&str> = query.split_whitespace().collect();
    if terms.len() < 2 {
        return None;
    }

    let fields = [
        name,
        item.category.to_lowercase(),
        item.price.to_lowercase(),
        item.stock.to_string(),
    ];

    let mut score = 0.0;
    for term in &terms {
        let hits = fields.iter().filter(|field| field.contains(*term)).count();
        if hits == 0 {
            return None;
        }
        score += hits as f64 * SCORE_TERM_FIELD;
    }

    Some(ScoredMatch {
        item,
        score,
        kind: MatchKind::MultiTerm,
    })
}

fn name_key(name: &str) -> String {
    name.to_lowercase()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    Name,
    Price,
    Stock,
    Category,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

/// No-query listing order: the selected field with the selected direction,
/// values that cannot be compared (unparseable price, empty text) always
/// last, ties broken by case-insensitive name for stable pagination.
pub fn sort_catalog(items: &mut [InventoryRecord], field: SortField, direction: SortDirection) {
    items.sort_by(|left, right| {
        field_cmp(left, right, field, direction)
            .then_with(|| name_key(&left.name).cmp(&name_key(&right.name)))
    });
}

fn field_cmp(
    left: &InventoryRecord,
    right: &InventoryRecord,
    field: SortField,
    direction: SortDirection,
) -> Ordering {
    match field {
        SortField::Name => directed_text(&left.name, &right.name, direction),
        SortField::Category => directed_text(&left.category, &right.category, direction),
        SortField::Stock => directed(left.stock.cmp(&right.stock), direction),
        SortField::Price => match (left.unit_price(), right.unit_price()) {
            (Some(a), Some(b)) => directed(a.total_cmp(&b), direction),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        },
    }
}

fn directed_text(left: &str, right: &str, direction: SortDirection) -> Ordering {
    let left = left.trim();
    let right = right.trim();
    match (left.is_empty(), right.is_empty()) {
        (false, true) => Ordering::Less,
        (true, false) => Ordering::Greater,
        (true, true) => Ordering::Equal,
        (false, false) => directed(
            left.to_lowercase().cmp(&right.to_lowercase()),
            direction,
        ),
    }
}

fn directed(ordering: Ordering, direction: SortDirection) -> Ordering {
    match direction {
        SortDirection::Asc => ordering,
        SortDirection::Desc => ordering.reverse(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: i64, name: &str, price: &str, stock: u32, category: &str) -> InventoryRecord {
        InventoryRecord {
            id,
            name: name.to_string(),
            price: price.to_string(),
            stock,
            category: category.to_string(),
        }
    }

    fn catalog() -> Vec<InventoryRecord> {
        vec![
            record(1, "Nova", "18", 100, "SNACKS"),
            record(2, "Nova Cheese", "20.00", 40, "SNACKS"),
            record(3, "Max Candy (4 for 5)", "1.25", 200, "CANDIES"),
            record(4, "Royal 8oz", "180", 24, "BEVERAGES"),
        ]
    }

    #[test]
    fn exact_mode_matches_whole_fields_only() {
        let catalog = catalog();

        let hits = search(&catalog, "18", SearchMode::Exact);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].item.name, "Nova");

        // "180" is not an exact match for "18" in any field.
        let hits = search(&catalog, "180", SearchMode::Exact);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].item.name, "Royal 8oz");

        let hits = search(&catalog, "snacks", SearchMode::Exact);
        assert_eq!(hits.len(), 2);
    }

    #[test]
    fn smart_mode_ranks_exact_above_prefix_above_contains() {
        let catalog = vec![
            record(1, "Nova Cheese", "20", 10, "SNACKS"),
            record(2, "Nova", "18", 10, "SNACKS"),
            record(3, "Super Nova", "25", 10, "SNACKS"),
        ];

        let hits = search(&catalog, "nova", SearchMode::Smart);
        let names: Vec<&str> = hits.iter().map(|hit| hit.item.name.as_str()).collect();
        assert_eq!(names, vec!["Nova", "Nova Cheese", "Super Nova"]);
        assert_eq!(hits[0].kind, MatchKind::ExactName);
        assert_eq!(hits[1].kind, MatchKind::NamePrefix);
        assert_eq!(hits[2].kind, MatchKind::NameContains);
    }

    #[test]
    fn smart_mode_falls_back_to_base_name_for_annotated_items() {
        let catalog = vec![record(1, "Max Candy (4 for 5)", "1.25", 200, "CANDIES")];

        let hits = search(&catalog, "max candy", SearchMode::Smart);
        assert_eq!(hits.len(), 1);
        // The raw name still starts with the query, so the name tier wins.
        assert_eq!(hits[0].kind, MatchKind::NamePrefix);

        // A query spanning the removed segment only matches the base name.
        let catalog = vec![record(1, "Coke (1.5L) Zero", "75", 12, "BEVERAGES")];
        let hits = search(&catalog, "coke zero", SearchMode::Smart);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].kind, MatchKind::BaseNameExact);
    }

    #[test]
    fn smart_mode_multi_term_requires_every_term() {
        let catalog = catalog();

        let hits = search(&catalog, "nova snacks", SearchMode::Smart);
        let names: Vec<&str> = hits.iter().map(|hit| hit.item.name.as_str()).collect();
        assert_eq!(names, vec!["Nova", "Nova Cheese"]);
        assert!(hits.iter().all(|hit| hit.kind == MatchKind::MultiTerm));

        // "royal" never co-occurs with "snacks" on one record.
        let hits = search(&catalog, "royal snacks", SearchMode::Smart);
        assert!(hits.is_empty());
    }

    #[test]
    fn smart_mode_omits_non_matches_entirely() {
        let binding = catalog();
        let hits = search(&binding, "tide", SearchMode::Smart);
        assert!(hits.is_empty());
    }

    #[test]
    fn equal_scores_tie_break_alphabetically_regardless_of_insert_order() {
        let catalog = vec![
            record(1, "big zesto orange", "10", 5, "BEVERAGES"),
            record(2, "Apple Zesto", "10", 5, "BEVERAGES"),
        ];

        let hits = search(&catalog, "zesto", SearchMode::Smart);
        assert_eq!(hits[0].item.name, "Apple Zesto");
        assert_eq!(hits[1].item.name, "big zesto orange");
        assert_eq!(hits[0].score, hits[1].score);
    }

    #[test]
    fn base_name_strips_parenthetical_segments() {
        assert_eq!(base_name("Max Candy (4 for 5)"), "max candy");
        assert_eq!(base_name("Coke (1.5L) Zero"), "coke zero");
        assert_eq!(base_name("Nova"), "nova");
    }

    #[test]
    fn sort_catalog_places_unparseable_prices_last_in_both_directions() {
        let mut items = vec![
            record(1, "B Item", "not-a-price", 1, "X"),
            record(2, "A Item", "20.00", 1, "X"),
            record(3, "C Item", "5.00", 1, "X"),
        ];

        sort_catalog(&mut items, SortField::Price, SortDirection::Asc);
        let names: Vec<&str> = items.iter().map(|item| item.name.as_str()).collect();
        assert_eq!(names, vec!["C Item", "A Item", "B Item"]);

        sort_catalog(&mut items, SortField::Price, SortDirection::Desc);
        let names: Vec<&str> = items.iter().map(|item| item.name.as_str()).collect();
        assert_eq!(names, vec!["A Item", "C Item", "B Item"]);
    }

    #[test]
    fn sort_catalog_by_stock_descending() {
        let mut items = catalog();
        sort_catalog(&mut items, SortField::Stock, SortDirection::Desc);
        assert_eq!(items[0].name, "Max Candy (4 for 5)");
        assert_eq!(items.last().unwrap().name, "Royal 8oz");
    }
}
