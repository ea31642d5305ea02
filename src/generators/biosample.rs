//! Biosample generation, both inline for the workflow generators and standalone.

use std::collections::BTreeSet;
use std::path::PathBuf;

use async_trait::async_trait;
use tracing::info;

use super::base::GeneratorContext;
use super::MetadataGenerator;
use crate::constants::nmdc_types;
use crate::error::{MetadataError, Result};
use crate::parser::biosample::{parse_biosample, REQUIRED_COLUMNS};
use crate::parser::{MetadataSheet, SAMPLE_COLUMN};
use crate::schema::Database;

const NAME_COLUMN: &str = "biosample.name";

/// Creates a biosample for every `biosample.name` group that has no sample id,
/// then writes the new ids back into the sheet.
///
/// Without a `biosample.name` column every row must already carry a sample id.
pub async fn ensure_biosamples(
    ctx: &mut GeneratorContext,
    sheet: &mut MetadataSheet,
    db: &mut Database,
) -> Result<()> {
    if sheet.has_column(NAME_COLUMN) {
        sheet.add_column(SAMPLE_COLUMN);
        let names: BTreeSet<String> = sheet.unique_values(NAME_COLUMN).into_iter().collect();
        for name in names {
            let Some(row) = sheet.rows().iter().find(|r| r.get(NAME_COLUMN) == Some(name.as_str())).cloned()
            else {
                continue;
            };
            if row.get(SAMPLE_COLUMN).is_some() {
                continue;
            }
            sheet.require_columns(&REQUIRED_COLUMNS)?;

            let id = match row.get("biosample.id") {
                Some(id) => id.to_string(),
                None => ctx.mint(nmdc_types::BIOSAMPLE).await?,
            };
            let ontology = ctx.ontology()?;
            let biosample = parse_biosample(&row, id, ontology.as_ref()).await?;
            info!(name = %name, id = %biosample.id, "Generated biosample");
            sheet.set_where(NAME_COLUMN, &name, SAMPLE_COLUMN, &biosample.id);
            db.biosample_set.push(biosample);
        }
    }

    if let Some(row) = sheet.rows().iter().find(|r| r.get(SAMPLE_COLUMN).is_none()) {
        return Err(MetadataError::MissingValue { column: SAMPLE_COLUMN.to_string(), row: row.number });
    }
    Ok(())
}

/// Standalone biosample generation from a sheet of `biosample.*` columns.
pub struct BiosampleGenerator {
    ctx: GeneratorContext,
    metadata_file: PathBuf,
}

impl BiosampleGenerator {
    pub fn new(ctx: GeneratorContext, metadata_file: PathBuf) -> Self {
        Self { ctx, metadata_file }
    }
}

#[async_trait]
impl MetadataGenerator for BiosampleGenerator {
    fn name(&self) -> &'static str {
        "biosample"
    }

    async fn run(&mut self) -> Result<Database> {
        let mut sheet = MetadataSheet::from_path(&self.metadata_file)?;
        if !sheet.has_column(NAME_COLUMN) {
            return Err(MetadataError::InvalidInput(
                "The 'biosample.name' column is required to create biosamples.".to_string(),
            ));
        }
        let mut db = Database::new();
        ensure_biosamples(&mut self.ctx, &mut sheet, &mut db).await?;
        Ok(db)
    }

    async fn rerun(&mut self) -> Result<Database> {
        Err(MetadataError::InvalidInput("Rerun is not supported for biosample generation.".to_string()))
    }
}
