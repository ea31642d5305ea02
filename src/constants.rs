/// NMDC schema class names used as `type` values and as minting targets
pub mod nmdc_types {
    pub const BIOSAMPLE: &str = "nmdc:Biosample";
    pub const MASS_SPECTROMETRY: &str = "nmdc:MassSpectrometry";
    pub const METABOLOMICS_ANALYSIS: &str = "nmdc:MetabolomicsAnalysis";
    pub const NOM_ANALYSIS: &str = "nmdc:NomAnalysis";
    pub const DATA_OBJECT: &str = "nmdc:DataObject";
    pub const CALIBRATION_INFORMATION: &str = "nmdc:CalibrationInformation";
    pub const METABOLITE_IDENTIFICATION: &str = "nmdc:MetaboliteIdentification";
    pub const MANIFEST: &str = "nmdc:Manifest";
    pub const ONTOLOGY_CLASS: &str = "nmdc:OntologyClass";
    pub const CONTROLLED_IDENTIFIED_TERM_VALUE: &str = "nmdc:ControlledIdentifiedTermValue";
    pub const TEXT_VALUE: &str = "nmdc:TextValue";
    pub const GEOLOCATION_VALUE: &str = "nmdc:GeolocationValue";
    pub const TIMESTAMP_VALUE: &str = "nmdc:TimestampValue";
    pub const QUANTITY_VALUE: &str = "nmdc:QuantityValue";
    pub const PROVENANCE_METADATA: &str = "nmdc:ProvenanceMetadata";
}

/// Collection names as exposed by the runtime API
pub mod collections {
    pub const BIOSAMPLE_SET: &str = "biosample_set";
    pub const PROCESSED_SAMPLE_SET: &str = "processed_sample_set";
    pub const CALIBRATION_SET: &str = "calibration_set";
    pub const CONFIGURATION_SET: &str = "configuration_set";
    pub const DATA_GENERATION_SET: &str = "data_generation_set";
    pub const DATA_OBJECT_SET: &str = "data_object_set";
    pub const INSTRUMENT_SET: &str = "instrument_set";
    pub const MANIFEST_SET: &str = "manifest_set";
    pub const WORKFLOW_EXECUTION_SET: &str = "workflow_execution_set";
}

pub const PROVENANCE_GIT_URL: &str =
    "https://github.com/microbiomedata/nmdc_mass_spectrometry_metadata_generation";
pub const SOURCE_SYSTEM_OF_RECORD: &str = "custom";

pub const RAW_DATA_CATEGORY: &str = "instrument_data";
pub const PROCESSED_DATA_CATEGORY: &str = "processed_data";
pub const WORKFLOW_PARAMETER_DATA_CATEGORY: &str = "workflow_parameter_data";
pub const MANIFEST_CATEGORY: &str = "instrument_run";

pub const DEFAULT_GCMS_CONFIGURATION_FILE: &str = "emsl_gcms_corems_params.toml";
pub const DEFAULT_CALIBRATION_STANDARD: &str = "fames";

/// Number of URLs probed per column before the existence check
pub const URL_PROBE_LIMIT: usize = 5;
/// Batch size for `$in` lookups against the runtime API
pub const LOOKUP_CHUNK_SIZE: usize = 10;

pub const VALIDATION_OK: &str = "All Okay!";
