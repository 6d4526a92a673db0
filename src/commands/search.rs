use std::io::{self, Write};

use anyhow::{Context, Result, bail};
use serde::Serialize;
use tracing::info;

use crate::cli::{SearchArgs, SearchModeArg};
use crate::commands::open_store;
use crate::model::InventoryRecord;
use crate::search::{MatchKind, SearchMode, search};

#[derive(Debug, Serialize)]
struct SearchResult {
    rank: usize,
    score: f64,
    match_kind: MatchKind,
    item: InventoryRecord,
}

#[derive(Debug, Serialize)]
struct SearchResponse {
    query: String,
    mode: String,
    returned: usize,
    results: Vec<SearchResult>,
}

pub fn run(args: SearchArgs) -> Result<()> {
    let query_text = args.query.trim();
    if query_text.is_empty() {
        bail!("query must not be empty");
    }

    let store = open_store(&args.store)?;
    let catalog = store.list_items()?;

    let mode = match args.mode {
        SearchModeArg::Exact => SearchMode::Exact,
        SearchModeArg::Smart => SearchMode::Smart,
    };

    let mut matches = search(&catalog, query_text, mode);
    if matches.len() > args.limit {
        matches.truncate(args.limit);
    }

    let results: Vec<SearchResult> = matches
        .into_iter()
        .enumerate()
        .map(|(index, matched)| SearchResult {
            rank: index + 1,
            score: matched.score,
            match_kind: matched.kind,
            item: matched.item.clone(),
        })
        .collect();

    info!(
        query = %query_text,
        mode = ?args.mode,
        result_count = results.len(),
        "search completed"
    );

    if args.json {
        let response = SearchResponse {
            query: query_text.to_string(),
            mode: format!("{:?}", args.mode).to_lowercase(),
            returned: results.len(),
            results,
        };

        let mut output = io::BufWriter::new(io::stdout().lock());
        serde_json::to_writer_pretty(&mut output, &response)
            .context("failed to serialize search json output")?;
        writeln!(output)?;
        output.flush()?;
        return Ok(());
    }

    write_text_response(query_text, &results)
}

fn write_text_response(query_text: &str, results: &[SearchResult]) -> Result<()> {
    let mut output = io::BufWriter::new(io::stdout().lock());

    writeln!(output, "Query: {query_text}")?;
    writeln!(output, "Results: {}", results.len())?;

    for result in results {
        writeln!(
            output,
            "{}.\t{}\t{}\tstock {}\t{}",
            result.rank,
            result.item.name,
            result.item.price,
            result.item.stock,
            result.item.category
        )?;
        writeln!(
            output,
            "\tmatch={} score={:.1} id={}",
            result.match_kind.as_str(),
            result.score,
            result.item.id
        )?;
    }

    output.flush()?;
    Ok(())
}
