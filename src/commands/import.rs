use std::collections::BTreeSet;

use anyhow::{Context, Result, bail};
use calamine::{Data, Reader, open_workbook_auto};
use chrono::Utc;
use tracing::{info, warn};

use crate::cli::{ImportArgs, ImportLayout};
use crate::commands::{open_session, open_store};
use crate::ingest::SpreadsheetIngester;
use crate::model::{ImportCounts, ImportRunManifest};
use crate::util::{now_utc_string, sha256_file, utc_compact_string, write_json_pretty};

pub fn run(args: ImportArgs) -> Result<()> {
    let started_ts = Utc::now();
    let started_at = now_utc_string();
    let run_id = format!("import-{}", utc_compact_string(started_ts));

    let mut store = open_store(&args.store)?;
    let session = open_session(&store, &args.store)?;

    let source_sha256 = sha256_file(&args.file)?;
    info!(
        file = %args.file.display(),
        run_id = %run_id,
        layout = args.layout.as_str(),
        "starting import"
    );

    let (sheet, rows) = read_sheet(&args)?;

    let ingester = SpreadsheetIngester::new()?;
    let outcome = match args.layout {
        ImportLayout::Auto => ingester.ingest(&rows)?,
        ImportLayout::Flexible => ingester.ingest_flexible(&rows)?,
    };

    for warning in &outcome.warnings {
        warn!(warning = %warning, "import row warning");
    }

    // Every category named in the batch must resolve to a registry entry
    // before its items land.
    let unique_categories: BTreeSet<String> = outcome
        .records
        .iter()
        .map(|record| record.category.clone())
        .collect();
    let mut categories_created = 0_usize;
    for category in &unique_categories {
        if store.ensure_category(&session, category, "auto-created from upload")? {
            categories_created += 1;
        }
    }

    let mut records = outcome.records;
    for record in &mut records {
        record.category = store.resolve_category(&record.category)?;
    }

    let stats = store.import_batch(&session, &records)?;

    let manifest = ImportRunManifest {
        manifest_version: 1,
        run_id: run_id.clone(),
        status: "completed".to_string(),
        started_at,
        finished_at: now_utc_string(),
        source_file: args.file.display().to_string(),
        source_sha256,
        sheet,
        strategy: outcome.strategy.as_str().to_string(),
        counts: ImportCounts {
            rows_seen: outcome.rows_seen,
            products_parsed: records.len(),
            items_inserted: stats.inserted,
            duplicates_skipped: stats.duplicates_skipped,
            rows_skipped: outcome.rows_skipped,
            categories_created,
        },
        warnings: outcome.warnings,
    };

    let manifest_path = args.manifest_path.clone().unwrap_or_else(|| {
        args.store
            .store_root
            .join("manifests")
            .join(format!("import_run_{}.json", utc_compact_string(started_ts)))
    });
    write_json_pretty(&manifest_path, &manifest)?;
    info!(path = %manifest_path.display(), "wrote import run manifest");

    info!(
        strategy = outcome.strategy.as_str(),
        inserted = stats.inserted,
        duplicates_skipped = stats.duplicates_skipped,
        rows_skipped = outcome.rows_skipped,
        categories_created,
        "import completed"
    );

    Ok(())
}

fn read_sheet(args: &ImportArgs) -> Result<(String, Vec<Vec<String>>)> {
    let mut workbook = open_workbook_auto(&args.file)
        .with_context(|| format!("failed to open workbook: {}", args.file.display()))?;

    let sheet_names = workbook.sheet_names().to_vec();
    if sheet_names.is_empty() {
        bail!("workbook has no sheets: {}", args.file.display());
    }

    let sheet = match &args.sheet {
        Some(name) => {
            if !sheet_names.iter().any(|candidate| candidate == name) {
                bail!(
                    "sheet {:?} not found; available sheets: {}",
                    name,
                    sheet_names.join(", ")
                );
            }
            name.clone()
        }
        None => sheet_names[0].clone(),
    };

    let range = workbook
        .worksheet_range(&sheet)
        .with_context(|| format!("failed to read sheet {sheet:?}"))?;

    let rows = range
        .rows()
        .map(|row| row.iter().map(cell_text).collect())
        .collect();

    Ok((sheet, rows))
}

/// Spreadsheet cells arrive loosely typed; integral floats render without a
/// trailing ".0" so "18" stays "18".
fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(text) => text.trim().to_string(),
        Data::Float(value) if value.fract() == 0.0 && value.abs() < 1e15 => {
            format!("{}", *value as i64)
        }
        Data::Float(value) => format!("{value}"),
        Data::Int(value) => value.to_string(),
        Data::Bool(value) => value.to_string(),
        other => other.to_string().trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cell_text_renders_integral_floats_without_decimals() {
        assert_eq!(cell_text(&Data::Float(18.0)), "18");
        assert_eq!(cell_text(&Data::Float(12.5)), "12.5");
        assert_eq!(cell_text(&Data::Int(7)), "7");
        assert_eq!(cell_text(&Data::String("  Nova ".to_string())), "Nova");
        assert_eq!(cell_text(&Data::Empty), "");
    }
}
