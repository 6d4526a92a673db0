use serde::{Deserialize, Serialize};

/// One catalog row. `price` is the canonical two-decimal string form; for bulk
/// items the pack terms live in the name annotation and `price` holds the
/// derived unit price.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryRecord {
    pub id: i64,
    pub name: String,
    pub price: String,
    pub stock: u32,
    pub category: String,
}

impl InventoryRecord {
    pub fn unit_price(&self) -> Option<f64> {
        self.price.trim().parse::<f64>().ok()
    }
}

/// Item fields as supplied at creation time, before storage assigns an id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewItem {
    pub name: String,
    pub price: String,
    pub stock: u32,
    pub category: String,
}

/// Partial update: `None` fields keep their stored value.
#[derive(Debug, Clone, Default)]
pub struct ItemPatch {
    pub name: Option<String>,
    pub price: Option<String>,
    pub stock: Option<u32>,
    pub category: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub name: String,
    pub description: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityEntry {
    pub id: i64,
    pub actor: String,
    pub action: String,
    pub detail: String,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImportCounts {
    pub rows_seen: usize,
    pub products_parsed: usize,
    pub items_inserted: usize,
    pub duplicates_skipped: usize,
    pub rows_skipped: usize,
    pub categories_created: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImportRunManifest {
    pub manifest_version: u32,
    pub run_id: String,
    pub status: String,
    pub started_at: String,
    pub finished_at: String,
    pub source_file: String,
    pub source_sha256: String,
    pub sheet: String,
    pub strategy: String,
    pub counts: ImportCounts,
    pub warnings: Vec<String>,
}
