use anyhow::{Context, Result};
use regex::Regex;

use crate::util::{format_amount, round2};

/// Effective pricing for one catalog item after bulk detection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BulkPricing {
    Bulk {
        quantity: u32,
        pack_price: f64,
        unit_price: f64,
    },
    Unit {
        unit_price: f64,
    },
}

/// Normalized bulk terms lifted out of free text.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BulkTerms {
    pub quantity: u32,
    pub pack_price: f64,
    pub unit_price: f64,
}

/// Detects bulk-pricing expressions ("4 for 5", "3 pcs for 10", "4 pieces = 5")
/// in item names and price fields. Templates are tried in order; the first
/// match wins.
#[derive(Debug)]
pub struct BulkPriceParser {
    templates: Vec<Regex>,
    annotation: Regex,
}

impl BulkPriceParser {
    pub fn new() -> Result<Self> {
        let templates = vec![
            Regex::new(r"(?i)\b(\d+)\s*(?:candy|candies|pcs|pieces|pc)\s*(?:for|=)\s*(\d+(?:\.\d+)?)")
                .context("failed to compile unit-worded bulk template")?,
            Regex::new(r"(?i)\b(\d+)\s*(?:for|=)\s*(\d+(?:\.\d+)?)")
                .context("failed to compile plain bulk template")?,
        ];
        let annotation = Regex::new(r"(?i)^(.*\S)\s*\(\s*(\d+)\s+for\s+(\d+(?:\.\d+)?)\s*\)\s*$")
            .context("failed to compile bulk name annotation pattern")?;

        Ok(Self {
            templates,
            annotation,
        })
    }

    /// First matching bulk template in `text`. A quantity of zero is a
    /// non-match, never a divide-by-zero.
    pub fn detect(&self, text: &str) -> Option<BulkTerms> {
        for template in &self.templates {
            let Some(captures) = template.captures(text) else {
                continue;
            };

            let quantity = captures
                .get(1)
                .and_then(|m| m.as_str().parse::<u32>().ok());
            let pack_price = captures
                .get(2)
                .and_then(|m| m.as_str().parse::<f64>().ok());
            let (Some(quantity), Some(pack_price)) = (quantity, pack_price) else {
                continue;
            };
            if quantity < 1 || pack_price <= 0.0 {
                continue;
            }

            return Some(BulkTerms {
                quantity,
                pack_price,
                unit_price: round2(pack_price / quantity as f64),
            });
        }

        None
    }

    /// Effective pricing for an item: bulk terms embedded in the name win,
    /// then bulk text in the price field, then the plain numeric price.
    pub fn pricing(&self, name: &str, price: &str) -> BulkPricing {
        if let Some(terms) = self.detect(name).or_else(|| self.detect(price)) {
            return BulkPricing::Bulk {
                quantity: terms.quantity,
                pack_price: terms.pack_price,
                unit_price: terms.unit_price,
            };
        }

        BulkPricing::Unit {
            unit_price: price.trim().parse().unwrap_or(0.0),
        }
    }

    /// Decompose a display name of the exact composed form
    /// "<base> (<qty> for <price>)" back into its parts. Inverse of
    /// [`compose_bulk_name`]; used by the edit workflow to seed bulk terms.
    pub fn extract_annotation(&self, name: &str) -> Option<(String, u32, f64)> {
        let captures = self.annotation.captures(name)?;
        let base = captures.get(1)?.as_str().trim().to_string();
        let quantity: u32 = captures.get(2)?.as_str().parse().ok()?;
        let pack_price: f64 = captures.get(3)?.as_str().parse().ok()?;
        if quantity < 1 {
            return None;
        }

        Some((base, quantity, pack_price))
    }
}

/// Display name for an item sold in packs: "Max Candy (4 for 5)".
pub fn compose_bulk_name(base: &str, quantity: u32, pack_price: f64) -> String {
    format!(
        "{} ({} for {})",
        base.trim(),
        quantity,
        format_amount(pack_price)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parser() -> BulkPriceParser {
        BulkPriceParser::new().expect("templates should compile")
    }

    #[test]
    fn detect_handles_the_known_template_shapes() {
        let parser = parser();

        for text in [
            "4 for 5",
            "4 candy for 5 pesos",
            "3 pcs for 10",
            "4 pieces = 5",
            "V Fresh (4 for 5)",
        ] {
            let terms = parser.detect(text);
            assert!(terms.is_some(), "expected bulk terms in {text:?}");
        }

        let terms = parser.detect("4 for 5").unwrap();
        assert_eq!(terms.quantity, 4);
        assert_eq!(terms.pack_price, 5.0);
        assert_eq!(terms.unit_price, 1.25);
    }

    #[test]
    fn detect_rejects_zero_quantity() {
        let parser = parser();
        assert_eq!(parser.detect("0 for 5"), None);
        assert_eq!(parser.detect("0 pcs for 10"), None);
    }

    #[test]
    fn detect_rejects_plain_text() {
        let parser = parser();
        assert_eq!(parser.detect("Lucky Me Pancit Canton"), None);
        assert_eq!(parser.detect("18.00"), None);
    }

    #[test]
    fn pricing_prefers_name_annotation_over_price_field() {
        let parser = parser();
        let pricing = parser.pricing("Max Candy (4 for 5)", "1.25");
        assert_eq!(
            pricing,
            BulkPricing::Bulk {
                quantity: 4,
                pack_price: 5.0,
                unit_price: 1.25,
            }
        );
    }

    #[test]
    fn pricing_falls_back_to_numeric_price() {
        let parser = parser();
        assert_eq!(
            parser.pricing("Nova", "18.00"),
            BulkPricing::Unit { unit_price: 18.0 }
        );
        assert_eq!(
            parser.pricing("Nova", "n/a"),
            BulkPricing::Unit { unit_price: 0.0 }
        );
    }

    #[test]
    fn compose_then_extract_round_trips() {
        let parser = parser();

        for (base, quantity, pack_price) in [
            ("Max Candy", 4, 5.0),
            ("V Fresh", 4, 5.0),
            ("Mik Mik", 3, 10.0),
            ("Sip Sarap", 2, 4.5),
        ] {
            let name = compose_bulk_name(base, quantity, pack_price);
            let (got_base, got_quantity, got_pack_price) = parser
                .extract_annotation(&name)
                .unwrap_or_else(|| panic!("annotation should extract from {name:?}"));

            assert_eq!(got_base, base);
            assert_eq!(got_quantity, quantity);
            assert_eq!(got_pack_price, pack_price);
        }
    }

    #[test]
    fn extract_annotation_tolerates_extra_whitespace() {
        let parser = parser();
        let (base, quantity, pack_price) = parser
            .extract_annotation("Max Candy ( 4 for 5 )")
            .expect("whitespace-padded annotation should extract");
        assert_eq!(base, "Max Candy");
        assert_eq!(quantity, 4);
        assert_eq!(pack_price, 5.0);
    }

    #[test]
    fn extract_annotation_ignores_non_bulk_parentheses() {
        let parser = parser();
        assert_eq!(parser.extract_annotation("Chips (spicy)"), None);
        assert_eq!(parser.extract_annotation("Nova"), None);
    }
}
