use std::io::{self, Write};

use anyhow::{Context, Result, bail};
use tracing::info;

use crate::bulk::{BulkPriceParser, compose_bulk_name};
use crate::cli::{AddArgs, ClearArgs, EditArgs, ListArgs, RemoveArgs, SortDirectionArg, SortFieldArg};
use crate::commands::{open_session, open_store};
use crate::model::{InventoryRecord, ItemPatch, NewItem};
use crate::search::{SortDirection, SortField, sort_catalog};
use crate::util::format_price;

pub fn run_add(args: AddArgs) -> Result<()> {
    let mut store = open_store(&args.store)?;
    let session = open_session(&store, &args.store)?;

    let (name, price) = match (args.price, args.bulk_qty, args.bulk_price) {
        (Some(price), None, None) => {
            if price <= 0.0 {
                bail!("price must be positive");
            }
            (args.name.clone(), format_price(price))
        }
        (None, Some(quantity), Some(pack_price)) => {
            if quantity < 1 {
                bail!("bulk quantity must be at least 1");
            }
            if pack_price <= 0.0 {
                bail!("bulk price must be positive");
            }
            (
                compose_bulk_name(&args.name, quantity, pack_price),
                format_price(pack_price / quantity as f64),
            )
        }
        (Some(_), _, _) => bail!("use either --price or --bulk-qty/--bulk-price, not both"),
        _ => bail!("provide --price, or both --bulk-qty and --bulk-price"),
    };

    let category = store.resolve_category(args.category.as_deref().unwrap_or_default())?;
    let record = store.create_item(
        &session,
        &NewItem {
            name,
            price,
            stock: args.stock,
            category,
        },
    )?;

    info!(
        id = record.id,
        name = %record.name,
        price = %record.price,
        stock = record.stock,
        category = %record.category,
        "item added"
    );
    Ok(())
}

pub fn run_edit(args: EditArgs) -> Result<()> {
    let mut store = open_store(&args.store)?;
    let session = open_session(&store, &args.store)?;
    let current = store.get_item(args.id)?;

    let mut patch = ItemPatch {
        stock: args.stock,
        ..ItemPatch::default()
    };

    if args.bulk_qty.is_some() || args.bulk_price.is_some() {
        // Re-derive the annotated name: unchanged halves of the bulk terms
        // come from the current name's suffix.
        let parser = BulkPriceParser::new()?;
        let existing = parser.extract_annotation(&current.name);

        let base = args
            .name
            .clone()
            .or_else(|| existing.as_ref().map(|(base, _, _)| base.clone()))
            .unwrap_or_else(|| current.name.clone());
        let quantity = args
            .bulk_qty
            .or(existing.as_ref().map(|(_, quantity, _)| *quantity));
        let pack_price = args
            .bulk_price
            .or(existing.as_ref().map(|(_, _, pack_price)| *pack_price));

        let (Some(quantity), Some(pack_price)) = (quantity, pack_price) else {
            bail!("bulk terms are incomplete: provide both --bulk-qty and --bulk-price");
        };
        if quantity < 1 {
            bail!("bulk quantity must be at least 1");
        }
        if pack_price <= 0.0 {
            bail!("bulk price must be positive");
        }

        patch.name = Some(compose_bulk_name(&base, quantity, pack_price));
        patch.price = Some(format_price(pack_price / quantity as f64));
    } else {
        patch.name = args.name;
        if let Some(price) = args.price {
            if price <= 0.0 {
                bail!("price must be positive");
            }
            patch.price = Some(format_price(price));
        }
    }

    if let Some(category) = &args.category {
        patch.category = Some(store.resolve_category(category)?);
    }

    let record = store.update_item(&session, args.id, &patch)?;
    info!(
        id = record.id,
        name = %record.name,
        price = %record.price,
        stock = record.stock,
        category = %record.category,
        "item updated"
    );
    Ok(())
}

pub fn run_remove(args: RemoveArgs) -> Result<()> {
    let mut store = open_store(&args.store)?;
    let session = open_session(&store, &args.store)?;

    store.delete_item(&session, args.id)?;
    info!(id = args.id, "item removed");
    Ok(())
}

pub fn run_clear(args: ClearArgs) -> Result<()> {
    if !args.yes {
        bail!("clearing removes every item; pass --yes to confirm");
    }

    let mut store = open_store(&args.store)?;
    let session = open_session(&store, &args.store)?;

    let count = store.clear_items(&session)?;
    info!(removed = count, "catalog cleared");
    Ok(())
}

pub fn run_list(args: ListArgs) -> Result<()> {
    let store = open_store(&args.store)?;

    let mut items = store.list_items()?;
    if args.in_stock_only {
        items.retain(|item| item.stock > 0);
    }
    sort_catalog(&mut items, sort_field(args.sort_by), sort_direction(args.direction));

    info!(count = items.len(), "list completed");

    if args.json {
        let mut output = io::BufWriter::new(io::stdout().lock());
        serde_json::to_writer_pretty(&mut output, &items)
            .context("failed to serialize item list")?;
        writeln!(output)?;
        output.flush()?;
        return Ok(());
    }

    write_item_table(&items)
}

fn write_item_table(items: &[InventoryRecord]) -> Result<()> {
    let mut output = io::BufWriter::new(io::stdout().lock());

    writeln!(output, "{:>5}  {:<36}  {:>10}  {:>6}  CATEGORY", "ID", "NAME", "PRICE", "STOCK")?;
    for item in items {
        writeln!(
            output,
            "{:>5}  {:<36}  {:>10}  {:>6}  {}",
            item.id, item.name, item.price, item.stock, item.category
        )?;
    }

    output.flush()?;
    Ok(())
}

fn sort_field(arg: SortFieldArg) -> SortField {
    match arg {
        SortFieldArg::Name => SortField::Name,
        SortFieldArg::Price => SortField::Price,
        SortFieldArg::Stock => SortField::Stock,
        SortFieldArg::Category => SortField::Category,
    }
}

fn sort_direction(arg: SortDirectionArg) -> SortDirection {
    match arg {
        SortDirectionArg::Asc => SortDirection::Asc,
        SortDirectionArg::Desc => SortDirection::Desc,
    }
}
