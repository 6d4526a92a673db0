use anyhow::{Context, Result};
use regex::Regex;
use serde::Serialize;

use crate::bulk::{BulkPriceParser, BulkPricing};
use crate::model::InventoryRecord;
use crate::util::{pesos, round2};

const SCORE_EXACT_QUERY: f64 = 1000.0;
const SCORE_QUERY_IN_NAME: f64 = 400.0;
const TERM_LENGTH_WEIGHT: f64 = 10.0;
const WHOLE_WORD_BONUS: f64 = 25.0;

/// Heuristic acceptance knobs. The coverage threshold and lead ratio have no
/// derivation beyond field tuning, so they stay named and overridable instead
/// of inlined.
#[derive(Debug, Clone, Copy)]
pub struct QuoteConfig {
    /// Minimum fraction of query terms that must appear in an item's name for
    /// it to be a candidate at all.
    pub term_coverage_threshold: f64,
    /// Score at which the top candidate is accepted without looking at the
    /// runner-up. Only the exact-description tier reaches this.
    pub high_confidence_score: f64,
    /// The top candidate must beat the runner-up by more than this factor.
    pub lead_ratio: f64,
    /// Floor the top score must also clear when winning on lead ratio alone.
    pub min_lead_score: f64,
    /// Candidate names shown back when the resolver refuses to guess.
    pub max_suggestions: usize,
}

impl Default for QuoteConfig {
    fn default() -> Self {
        Self {
            term_coverage_threshold: 0.6,
            high_confidence_score: 500.0,
            lead_ratio: 2.0,
            min_lead_score: 50.0,
            max_suggestions: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BulkQuoteTerms {
    pub pack_size: u32,
    pub pack_price: f64,
    pub full_packs: u32,
    pub remainder: u32,
    pub packs_subtotal: f64,
    pub remainder_subtotal: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct PriceQuote {
    pub item_name: String,
    pub category: String,
    pub stock: u32,
    pub requested: u32,
    pub unit_price: f64,
    pub bulk: Option<BulkQuoteTerms>,
    pub total: f64,
}

/// Outcome of one price-checker query. Everything here is a recoverable,
/// user-correctable condition; the process never fails on bad input.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum QuoteReply {
    Quote(PriceQuote),
    Ambiguous {
        query: String,
        candidates: Vec<String>,
    },
    NoMatch {
        query: String,
    },
    UsageHelp,
}

impl QuoteReply {
    /// Display-ready text for the conversational UI.
    pub fn render(&self) -> String {
        match self {
            QuoteReply::Quote(quote) => render_quote(quote),
            QuoteReply::Ambiguous { query, candidates } => {
                let mut lines = vec![format!("Multiple items match \"{query}\":")];
                for name in candidates {
                    lines.push(format!("  - {name}"));
                }
                lines.push("Please be more specific.".to_string());
                lines.join("\n")
            }
            QuoteReply::NoMatch { query } => {
                format!("No item matching \"{query}\" was found.")
            }
            QuoteReply::UsageHelp => {
                "Ask like: \"7 v fresh\" (a quantity followed by the item name).".to_string()
            }
        }
    }
}

fn render_quote(quote: &PriceQuote) -> String {
    let mut lines = vec![format!(
        "{} x {} = {}",
        quote.requested,
        quote.item_name,
        pesos(quote.total)
    )];

    if let Some(bulk) = &quote.bulk {
        if bulk.full_packs > 0 {
            lines.push(format!(
                "  {} pack(s) of {} @ {} = {}",
                bulk.full_packs,
                bulk.pack_size,
                pesos(bulk.pack_price),
                pesos(bulk.packs_subtotal)
            ));
        }
        if bulk.remainder > 0 {
            lines.push(format!(
                "  {} pc(s) @ {} = {}",
                bulk.remainder,
                pesos(quote.unit_price),
                pesos(bulk.remainder_subtotal)
            ));
        }
        lines.push(format!(
            "Unit price: {} ({} for {})",
            pesos(quote.unit_price),
            bulk.pack_size,
            pesos(bulk.pack_price)
        ));
    } else {
        lines.push(format!("Unit price: {}", pesos(quote.unit_price)));
    }

    lines.push(format!("Stock: {}", quote.stock));
    lines.join("\n")
}

/// Resolves "quantity + item" utterances against a catalog snapshot and
/// prices the result, preferring a clarification request over a wrong guess.
#[derive(Debug)]
pub struct PriceQuoteResolver {
    bulk: BulkPriceParser,
    query_shape: Regex,
    config: QuoteConfig,
}

impl PriceQuoteResolver {
    pub fn new() -> Result<Self> {
        Self::with_config(QuoteConfig::default())
    }

    pub fn with_config(config: QuoteConfig) -> Result<Self> {
        Ok(Self {
            bulk: BulkPriceParser::new()?,
            query_shape: Regex::new(r"^(\d+)\s+(.+)$")
                .context("failed to compile price query pattern")?,
            config,
        })
    }

    pub fn resolve(&self, catalog: &[InventoryRecord], query: &str) -> QuoteReply {
        let query = query.trim();
        let Some(captures) = self.query_shape.captures(query) else {
            return QuoteReply::UsageHelp;
        };

        let quantity: u32 = match captures[1].parse() {
            Ok(value) if value >= 1 => value,
            _ => return QuoteReply::UsageHelp,
        };
        let description = captures[2].trim().to_lowercase();

        let mut candidates: Vec<(&InventoryRecord, f64)> = catalog
            .iter()
            .filter_map(|item| {
                self.score_item(item, &description)
                    .map(|score| (item, score))
            })
            .collect();

        candidates.sort_by(|left, right| {
            right
                .1
                .total_cmp(&left.1)
                .then_with(|| left.0.name.to_lowercase().cmp(&right.0.name.to_lowercase()))
        });

        if candidates.is_empty() {
            return QuoteReply::NoMatch {
                query: description,
            };
        }

        let top_score = candidates[0].1;
        let runner_up = candidates.get(1).map(|(_, score)| *score);
        if !self.confident(top_score, runner_up) {
            return QuoteReply::Ambiguous {
                query: description,
                candidates: candidates
                    .iter()
                    .take(self.config.max_suggestions)
                    .map(|(item, _)| item.name.clone())
                    .collect(),
            };
        }

        QuoteReply::Quote(self.price(candidates[0].0, quantity))
    }

    /// Relevance score for one item, or `None` when the item does not clear
    /// the term-coverage threshold.
    fn score_item(&self, item: &InventoryRecord, description: &str) -> Option<f64> {
        let name = item.name.to_lowercase();

        if name == *description {
            return Some(SCORE_EXACT_QUERY);
        }
        if name.contains(description) {
            return Some(SCORE_QUERY_IN_NAME);
        }

        let terms: Vec<&str> = description
            .split_whitespace()
            .filter(|term| term.len() > 1)
            .collect();
        if terms.is_empty() {
            return None;
        }

        let words: Vec<&str> = name
            .split(|c: char| !c.is_alphanumeric())
            .filter(|word| !word.is_empty())
            .collect();

        let mut matched = 0_usize;
        let mut score = 0.0;
        for term in &terms {
            if !name.contains(*term) {
                continue;
            }
            matched += 1;
            score += term.len() as f64 * TERM_LENGTH_WEIGHT;
            if words.iter().any(|word| word == term) {
                score += WHOLE_WORD_BONUS;
            }
        }

        let coverage = matched as f64 / terms.len() as f64;
        if coverage < self.config.term_coverage_threshold {
            return None;
        }

        Some(score)
    }

    /// Conservative acceptance: a sole candidate, an unambiguously high
    /// score, or a clear lead over the runner-up. Anything else is reported
    /// back as ambiguous.
    fn confident(&self, top: f64, runner_up: Option<f64>) -> bool {
        let Some(runner_up) = runner_up else {
            return true;
        };
        if top >= self.config.high_confidence_score {
            return true;
        }
        top > runner_up * self.config.lead_ratio && top >= self.config.min_lead_score
    }

    fn price(&self, item: &InventoryRecord, quantity: u32) -> PriceQuote {
        match self.bulk.pricing(&item.name, &item.price) {
            BulkPricing::Bulk {
                quantity: pack_size,
                pack_price,
                unit_price,
            } => {
                let full_packs = quantity / pack_size;
                let remainder = quantity % pack_size;
                let packs_subtotal = round2(full_packs as f64 * pack_price);
                let remainder_subtotal = round2(remainder as f64 * unit_price);

                PriceQuote {
                    item_name: item.name.clone(),
                    category: item.category.clone(),
                    stock: item.stock,
                    requested: quantity,
                    unit_price,
                    bulk: Some(BulkQuoteTerms {
                        pack_size,
                        pack_price,
                        full_packs,
                        remainder,
                        packs_subtotal,
                        remainder_subtotal,
                    }),
                    total: round2(packs_subtotal + remainder_subtotal),
                }
            }
            BulkPricing::Unit { unit_price } => PriceQuote {
                item_name: item.name.clone(),
                category: item.category.clone(),
                stock: item.stock,
                requested: quantity,
                unit_price,
                bulk: None,
                total: round2(quantity as f64 * unit_price),
            },
        }
    }
}
