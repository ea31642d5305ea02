//! Per-experiment metadata generators.
//!
//! Every generator reads one metadata sheet and produces a [`Database`] of new
//! records. They share record builders in [`base`] and sheet checks in
//! [`checks`]; the experiment types differ only in their [`profile`] constants
//! and in how processed files are classified.

pub mod base;
pub mod biosample;
pub mod checks;
pub mod gcms;
pub mod lcms;
pub mod nom;
pub mod profile;

use std::fmt;

use async_trait::async_trait;

use crate::error::Result;
use crate::schema::Database;

pub use base::{GeneratorContext, GeneratorOptions};
pub use biosample::BiosampleGenerator;
pub use gcms::GcmsGenerator;
pub use lcms::LcmsGenerator;
pub use nom::NomGenerator;

#[async_trait]
pub trait MetadataGenerator: Send {
    fn name(&self) -> &'static str;

    /// Builds the full set of records for a first-time submission.
    async fn run(&mut self) -> Result<Database>;

    /// Builds version-incremented workflow records for reprocessed data.
    async fn rerun(&mut self) -> Result<Database>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeneratorKind {
    LcmsLipid,
    LcmsMetab,
    GcmsMetab,
    DiNom,
    LcmsNom,
}

impl GeneratorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            GeneratorKind::LcmsLipid => "lcms_lipid",
            GeneratorKind::LcmsMetab => "lcms_metab",
            GeneratorKind::GcmsMetab => "gcms_metab",
            GeneratorKind::DiNom => "di_nom",
            GeneratorKind::LcmsNom => "lcms_nom",
        }
    }

    pub fn all() -> impl Iterator<Item = GeneratorKind> {
        [
            GeneratorKind::LcmsLipid,
            GeneratorKind::LcmsMetab,
            GeneratorKind::GcmsMetab,
            GeneratorKind::DiNom,
            GeneratorKind::LcmsNom,
        ]
        .into_iter()
    }
}

impl fmt::Display for GeneratorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Factory function to create the generator for an experiment type
pub fn create_generator(
    kind: GeneratorKind,
    ctx: GeneratorContext,
    opts: GeneratorOptions,
) -> Box<dyn MetadataGenerator> {
    match kind {
        GeneratorKind::LcmsLipid => Box::new(LcmsGenerator::new(&profile::LCMS_LIPIDOMICS, ctx, opts)),
        GeneratorKind::LcmsMetab => Box::new(LcmsGenerator::new(&profile::LCMS_METABOLOMICS, ctx, opts)),
        GeneratorKind::GcmsMetab => Box::new(GcmsGenerator::new(ctx, opts)),
        GeneratorKind::DiNom => Box::new(NomGenerator::new(&profile::DI_NOM, ctx, opts)),
        GeneratorKind::LcmsNom => Box::new(NomGenerator::new(&profile::LCMS_NOM, ctx, opts)),
    }
}
