//! Catalogue import from a JSON file
//!
//! Loads `{ "designs": [...], "trends": [...] }` into the store. Records are
//! upserted by id and records without one get a fresh uuid.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::db::{DbEngine, DesignTable, TrendTable};
use crate::models::{DesignItem, TrendItem};

#[derive(Debug, Default, Deserialize)]
pub struct CatalogueFile {
    #[serde(default)]
    pub designs: Vec<DesignItem>,
    #[serde(default)]
    pub trends: Vec<TrendItem>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportSummary {
    pub designs: usize,
    pub trends: usize,
}

fn ensure_id(id: &mut String) {
    if id.trim().is_empty() {
        *id = uuid::Uuid::new_v4().to_string();
    }
}

/// Read and import a catalogue file
pub async fn import_file(db: &DbEngine, path: &Path) -> Result<ImportSummary> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("Failed to read import file: {}", path.display()))?;
    let catalogue: CatalogueFile =
        serde_json::from_str(&data).with_context(|| "Invalid import file JSON")?;

    import_catalogue(db, catalogue).await
}

pub async fn import_catalogue(db: &DbEngine, catalogue: CatalogueFile) -> Result<ImportSummary> {
    let mut summary = ImportSummary {
        designs: 0,
        trends: 0,
    };

    for mut design in catalogue.designs {
        ensure_id(&mut design.id);
        DesignTable::upsert(db, &design).await?;
        summary.designs += 1;
    }

    for mut trend in catalogue.trends {
        ensure_id(&mut trend.id);
        TrendTable::upsert(db, &trend).await?;
        summary.trends += 1;
    }

    tracing::info!(
        "Imported {} designs and {} trends",
        summary.designs,
        summary.trends
    );

    Ok(summary)
}
