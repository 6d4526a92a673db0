use std::io::{self, Write};

use anyhow::{Context, Result};
use tracing::info;

use crate::cli::PriceArgs;
use crate::commands::open_store;
use crate::quote::{PriceQuoteResolver, QuoteReply};

pub fn run(args: PriceArgs) -> Result<()> {
    let store = open_store(&args.store)?;
    let catalog = store.list_items()?;

    let resolver = PriceQuoteResolver::new()?;
    let reply = resolver.resolve(&catalog, &args.query);

    let kind = match &reply {
        QuoteReply::Quote(_) => "quote",
        QuoteReply::Ambiguous { .. } => "ambiguous",
        QuoteReply::NoMatch { .. } => "no_match",
        QuoteReply::UsageHelp => "usage_help",
    };
    info!(query = %args.query, kind = %kind, "price check completed");

    let mut output = io::BufWriter::new(io::stdout().lock());
    if args.json {
        serde_json::to_writer_pretty(&mut output, &reply)
            .context("failed to serialize price reply")?;
        writeln!(output)?;
    } else {
        writeln!(output, "{}", reply.render())?;
    }
    output.flush()?;
    Ok(())
}
