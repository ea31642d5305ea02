pub mod database;
pub mod records;
pub mod values;

pub use database::Database;
pub use records::{
    Biosample, CalibrationInformation, DataObject, Manifest, MassSpectrometry, MetabolomicsAnalysis,
    NomAnalysis, WorkflowExecution,
};
pub use values::{
    ControlledIdentifiedTermValue, GeolocationValue, MetaboliteIdentification, OntologyClass,
    ProvenanceMetadata, QuantityValue, TextValue, TimestampValue,
};
