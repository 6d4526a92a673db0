use std::fs;

use anyhow::Result;
use tracing::{info, warn};

use crate::cli::StatusArgs;
use crate::commands::open_store;

pub fn run(args: StatusArgs) -> Result<()> {
    let db_path = args.store.resolved_db_path();

    info!(store_root = %args.store.store_root.display(), "status requested");

    if !db_path.exists() {
        warn!(path = %db_path.display(), "database file missing");
        return Ok(());
    }

    let store = open_store(&args.store)?;
    let counts = store.counts()?;

    info!(
        path = %db_path.display(),
        schema_version = %store.schema_version()?,
        revision = store.revision()?,
        items = counts.items,
        categories = counts.categories,
        activity_entries = counts.activity_entries,
        out_of_stock = counts.out_of_stock,
        "database status"
    );

    report_latest_import_manifest(&args);
    Ok(())
}

fn report_latest_import_manifest(args: &StatusArgs) {
    let manifest_dir = args.store.store_root.join("manifests");
    let Ok(entries) = fs::read_dir(&manifest_dir) else {
        warn!(path = %manifest_dir.display(), "no import manifests yet");
        return;
    };

    let mut manifests: Vec<String> = entries
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| entry.file_name().into_string().ok())
        .filter(|name| name.starts_with("import_run_") && name.ends_with(".json"))
        .collect();
    manifests.sort();

    match manifests.last() {
        Some(latest) => info!(
            manifest_count = manifests.len(),
            latest = %latest,
            "import manifests"
        ),
        None => warn!(path = %manifest_dir.display(), "no import manifests yet"),
    }
}
