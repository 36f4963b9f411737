use std::io::Write;

use anyhow::{Context, Result};
use arrow::util::pretty::pretty_format_batches;
use serde::Serialize;

use crate::aggregate::CatalogEntry;
use crate::data::{FilterSelection, StoreSummary};

/// How aggregate tables are written out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Format {
    /// Boxed text tables, one per aggregate.
    Table,
    /// A single JSON document.
    Json,
}

#[derive(Serialize)]
struct Report<'a> {
    total_records: usize,
    visible_records: usize,
    selection: &'a FilterSelection,
    summary: &'a StoreSummary,
    aggregates: &'a [CatalogEntry],
}

/// Everything a caller prints after one recomputation pass.
pub struct ReportContext<'a> {
    pub total_records: usize,
    pub visible_records: usize,
    pub selection: &'a FilterSelection,
    pub summary: &'a StoreSummary,
}

pub fn write_report<W: Write>(
    out: &mut W,
    format: Format,
    ctx: &ReportContext<'_>,
    entries: &[CatalogEntry],
) -> Result<()> {
    match format {
        Format::Json => {
            let report = Report {
                total_records: ctx.total_records,
                visible_records: ctx.visible_records,
                selection: ctx.selection,
                summary: ctx.summary,
                aggregates: entries,
            };
            serde_json::to_writer_pretty(&mut *out, &report).context("writing JSON report")?;
            writeln!(out)?;
        }
        Format::Table => {
            writeln!(
                out,
                "{} of {} records match the current filters",
                ctx.visible_records, ctx.total_records
            )?;
            for entry in entries {
                writeln!(out)?;
                write_entry(out, entry)?;
            }
        }
    }
    Ok(())
}

fn write_entry<W: Write>(out: &mut W, entry: &CatalogEntry) -> Result<()> {
    writeln!(out, "== {} ==", entry.kind)?;
    let batch = entry
        .table
        .to_record_batch()
        .with_context(|| format!("converting {} to a record batch", entry.kind))?;
    writeln!(out, "{}", pretty_format_batches(&[batch])?)?;
    for (key, value) in &entry.table.annotations {
        writeln!(out, "{key}: {value}")?;
    }
    if let Some(note) = &entry.table.note {
        writeln!(out, "note: {note}")?;
    }
    Ok(())
}
