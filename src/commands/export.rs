use anyhow::{Context, Result};
use tracing::info;

use crate::cli::ExportArgs;
use crate::commands::open_store;
use crate::util::ensure_directory;

/// Fixed export header; the import side's flexible layout recognizes it.
const EXPORT_HEADER: [&str; 4] = ["Item Name", "Price", "Stock", "Category"];

pub fn run(args: ExportArgs) -> Result<()> {
    let store = open_store(&args.store)?;
    let items = store.list_items()?;

    if let Some(parent) = args.out.parent() {
        if !parent.as_os_str().is_empty() {
            ensure_directory(parent)?;
        }
    }

    let mut writer = csv::Writer::from_path(&args.out)
        .with_context(|| format!("failed to create {}", args.out.display()))?;

    writer
        .write_record(EXPORT_HEADER)
        .context("failed to write export header")?;
    for item in &items {
        writer
            .write_record([
                item.name.as_str(),
                item.price.as_str(),
                &item.stock.to_string(),
                item.category.as_str(),
            ])
            .with_context(|| format!("failed to write export row for {:?}", item.name))?;
    }
    writer.flush().context("failed to flush export file")?;

    info!(
        path = %args.out.display(),
        count = items.len(),
        "export completed"
    );
    Ok(())
}
