//! Reading metadata sheets and shaping their cells for the NMDC schema.

pub mod biosample;
pub mod literal;
pub mod sheet;

pub use literal::parse_string_list;
pub use sheet::{MetadataSheet, SheetRow, SAMPLE_COLUMN};
