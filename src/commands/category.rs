use std::io::{self, Write};

use anyhow::{Context, Result};
use tracing::info;

use crate::cli::{CategoryArgs, CategoryCommand};
use crate::commands::{open_session, open_store};

pub fn run(args: CategoryArgs) -> Result<()> {
    match args.command {
        CategoryCommand::Add(args) => {
            let mut store = open_store(&args.store)?;
            let session = open_session(&store, &args.store)?;

            let created = store.ensure_category(
                &session,
                &args.name,
                args.description.as_deref().unwrap_or(""),
            )?;
            if created {
                info!(name = %args.name, "category added");
            } else {
                info!(name = %args.name, "category already exists");
            }
            Ok(())
        }
        CategoryCommand::List(args) => {
            let store = open_store(&args.store)?;
            let categories = store.list_categories()?;

            if args.json {
                let mut output = io::BufWriter::new(io::stdout().lock());
                serde_json::to_writer_pretty(&mut output, &categories)
                    .context("failed to serialize category list")?;
                writeln!(output)?;
                output.flush()?;
                return Ok(());
            }

            let mut output = io::BufWriter::new(io::stdout().lock());
            for category in &categories {
                writeln!(
                    output,
                    "{}\t{}",
                    category.name,
                    category.description.as_deref().unwrap_or("")
                )?;
            }
            output.flush()?;
            Ok(())
        }
        CategoryCommand::Rename(args) => {
            let mut store = open_store(&args.store)?;
            let session = open_session(&store, &args.store)?;

            let items_updated = store.rename_category(&session, &args.from, &args.to)?;
            info!(
                from = %args.from,
                to = %args.to,
                items_updated,
                "category renamed"
            );
            Ok(())
        }
        CategoryCommand::Remove(args) => {
            let mut store = open_store(&args.store)?;
            let session = open_session(&store, &args.store)?;

            store.delete_category(&session, &args.name)?;
            info!(name = %args.name, "category removed");
            Ok(())
        }
    }
}
