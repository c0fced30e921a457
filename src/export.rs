//! Export a category's corpus as CSV or JSON.
//!
//! Columns are fixed: `id, timestamp, language, region_hint, contributor,
//! text, type`. CSV output always carries the header row.

use anyhow::{bail, Context, Result};
use std::path::Path;
use std::str::FromStr;

use crate::models::{Category, Item};
use crate::store::CorpusStore;

pub const COLUMNS: [&str; 7] = [
    "id",
    "timestamp",
    "language",
    "region_hint",
    "contributor",
    "text",
    "type",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportFormat {
    #[default]
    Csv,
    Json,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Json => "json",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "text/csv; charset=utf-8",
            ExportFormat::Json => "application/json",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "json" => Ok(ExportFormat::Json),
            other => bail!("Unknown export format: '{}'. Must be csv or json.", other),
        }
    }
}

/// `local_wisdom_proverbs_corpus.csv` and friends.
pub fn default_file_name(category: Category, format: ExportFormat) -> String {
    format!(
        "local_wisdom_{}_corpus.{}",
        category.collection(),
        format.extension()
    )
}

pub fn to_csv(items: &[Item]) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(COLUMNS)?;
    for item in items {
        writer.write_record([
            item.id.as_str(),
            item.timestamp.as_str(),
            item.language.as_str(),
            item.region_hint.as_str(),
            item.contributor.as_str(),
            item.text.as_str(),
            item.category.label(),
        ])?;
    }
    writer
        .into_inner()
        .map_err(|e| anyhow::anyhow!("Failed to finish CSV output: {}", e))
}

pub fn to_json(items: &[Item]) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec_pretty(items)?)
}

pub fn render(items: &[Item], format: ExportFormat) -> Result<Vec<u8>> {
    match format {
        ExportFormat::Csv => to_csv(items),
        ExportFormat::Json => to_json(items),
    }
}

/// Export `category` to `output`, or to stdout when no path is given.
pub async fn run_export(
    store: &dyn CorpusStore,
    category: Category,
    format: ExportFormat,
    output: Option<&Path>,
) -> Result<()> {
    let items = store
        .load_all(category)
        .await
        .with_context(|| format!("Failed to load {}", category.plural()))?;

    if items.is_empty() {
        eprintln!("No {} to download yet.", category.plural());
        return Ok(());
    }

    let body = render(&items, format)?;

    match output {
        Some(path) => {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)?;
                }
            }
            std::fs::write(path, &body)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            eprintln!(
                "Exported {} {} to {}",
                items.len(),
                category.plural(),
                path.display()
            );
        }
        None => {
            use std::io::Write;
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(&body)?;
            if format == ExportFormat::Json {
                writeln!(stdout)?;
            }
        }
    }

    Ok(())
}
