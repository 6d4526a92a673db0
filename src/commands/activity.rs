use std::io::{self, Write};

use anyhow::Result;

use crate::cli::ActivityArgs;
use crate::commands::open_store;

pub fn run(args: ActivityArgs) -> Result<()> {
    let store = open_store(&args.store)?;
    let entries = store.recent_activity(args.limit)?;

    let mut output = io::BufWriter::new(io::stdout().lock());
    for entry in &entries {
        writeln!(
            output,
            "{}\t{}\t{}\t{}\t{}",
            entry.id, entry.created_at, entry.actor, entry.action, entry.detail
        )?;
    }
    output.flush()?;
    Ok(())
}
