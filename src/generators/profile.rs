//! Constant strings that distinguish one experiment type from another.

use crate::constants::{
    PROCESSED_DATA_CATEGORY as PROCESSED, RAW_DATA_CATEGORY as RAW, WORKFLOW_PARAMETER_DATA_CATEGORY as PARAMETERS,
};

/// Category, type and description stamped on one kind of data object
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileProfile {
    pub category: &'static str,
    pub object_type: &'static str,
    pub description: &'static str,
}

/// Data generation and workflow strings shared by every experiment type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Profile {
    pub name: &'static str,
    pub mass_spec_description: &'static str,
    pub eluent_introduction: &'static str,
    pub analyte_category: &'static str,
    pub workflow_name: &'static str,
    pub workflow_description: &'static str,
    pub workflow_git_url: &'static str,
    /// File holding `current_version = x.y.z` for the workflow
    pub workflow_version_url: &'static str,
}

impl Profile {
    /// `direct_infusion_autosampler` as `direct infusion autosampler`
    pub fn eluent_words(&self) -> String {
        self.eluent_introduction.replace('_', " ")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LcmsProfile {
    pub common: Profile,
    pub analysis_category: &'static str,
    pub raw_data: FileProfile,
    pub parameters: FileProfile,
    pub annotations: FileProfile,
    pub processed: FileProfile,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GcmsProfile {
    pub common: Profile,
    pub analysis_category: &'static str,
    pub raw_data: FileProfile,
    pub results: FileProfile,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NomProfile {
    pub common: Profile,
    pub raw_data_object_type: &'static str,
    pub parameters: FileProfile,
    pub results: FileProfile,
    pub qc_plots: FileProfile,
}

pub const LCMS_LIPIDOMICS: LcmsProfile = LcmsProfile {
    common: Profile {
        name: "lcms_lipid",
        mass_spec_description: "Generation of mass spectrometry data for the analysis of lipids.",
        eluent_introduction: "liquid_chromatography",
        analyte_category: "lipidome",
        workflow_name: "Lipidomics analysis",
        workflow_description: "Analysis of raw mass spectrometry data for the annotation of lipids.",
        workflow_git_url: "https://github.com/microbiomedata/metaMS/wdl/metaMS_lipidomics.wdl",
        workflow_version_url: "https://github.com/microbiomedata/metaMS/blob/master/.bumpversion_lipid.cfg",
    },
    analysis_category: "lc_ms_lipidomics",
    raw_data: FileProfile {
        category: RAW,
        object_type: "LC-DDA-MS/MS Raw Data",
        description: "LC-DDA-MS/MS raw data for lipidomics data acquisition.",
    },
    parameters: FileProfile {
        category: PARAMETERS,
        object_type: "Configuration toml",
        description: "CoreMS parameters used for Lipidomics workflow.",
    },
    annotations: FileProfile {
        category: PROCESSED,
        object_type: "LC-MS Lipidomics Results",
        description: "Lipid annotations as a result of a lipidomics workflow activity.",
    },
    processed: FileProfile {
        category: PROCESSED,
        object_type: "LC-MS Lipidomics Processed Data",
        description: "CoreMS hdf5 file representing a lipidomics data file including annotations.",
    },
};

pub const LCMS_METABOLOMICS: LcmsProfile = LcmsProfile {
    common: Profile {
        name: "lcms_metab",
        mass_spec_description:
            "Generation of mass spectrometry data for the analysis of metabolomics using liquid chromatography.",
        eluent_introduction: "liquid_chromatography",
        analyte_category: "metabolome",
        workflow_name: "Metabolomics analysis",
        workflow_description: "Analysis of raw mass spectrometry data for the annotation of metabolites.",
        workflow_git_url: "https://github.com/microbiomedata/metaMS/blob/master/wdl/metaMS_lcms_metabolomics.wdl",
        workflow_version_url: "https://github.com/microbiomedata/metaMS/blob/master/.bumpversion_lcmsmetab.cfg",
    },
    analysis_category: "lc_ms_metabolomics",
    raw_data: FileProfile {
        category: RAW,
        object_type: "LC-DDA-MS/MS Raw Data",
        description: "LC-DDA-MS/MS raw data for metabolomics data acquisition.",
    },
    parameters: FileProfile {
        category: PARAMETERS,
        object_type: "Configuration toml",
        description: "CoreMS parameters used for metabolomics workflow.",
    },
    annotations: FileProfile {
        category: PROCESSED,
        object_type: "LC-MS Metabolomics Results",
        description: "Metabolite annotations as a result of a metabolomics workflow activity.",
    },
    processed: FileProfile {
        category: PROCESSED,
        object_type: "LC-MS Metabolomics Processed Data",
        description: "CoreMS hdf5 file representing a metabolomics data file including annotations.",
    },
};

pub const GCMS_METABOLOMICS: GcmsProfile = GcmsProfile {
    common: Profile {
        name: "gcms_metab",
        mass_spec_description: "Generation of mass spectrometry data by GC/MS for the analysis of metabolites.",
        eluent_introduction: "gas_chromatography",
        analyte_category: "metabolome",
        workflow_name: "GC/MS Metabolomics analysis",
        workflow_description: "Analysis of raw mass spectrometry data for the annotation of metabolites.",
        workflow_git_url: "https://github.com/microbiomedata/metaMS/wdl/metaMS_gcms.wdl",
        workflow_version_url: "https://github.com/microbiomedata/metaMS/blob/master/.bumpversion.cfg",
    },
    analysis_category: "gc_ms_metabolomics",
    raw_data: FileProfile {
        category: RAW,
        object_type: "GC-MS Raw Data",
        description: "GC/MS low resolution raw data for metabolomics data acquisition.",
    },
    results: FileProfile {
        category: PROCESSED,
        object_type: "GC-MS Metabolomics Results",
        description: "Metabolomics annotations as a result of a GC/MS metabolomics workflow activity.",
    },
};

pub const DI_NOM: NomProfile = NomProfile {
    common: Profile {
        name: "di_nom",
        mass_spec_description: "ultra high resolution mass spectrum",
        eluent_introduction: "direct_infusion_autosampler",
        analyte_category: "nom",
        workflow_name: "NOM Analysis",
        workflow_description: "Processing of raw DI FT-ICR MS data for natural organic matter identification",
        workflow_git_url: "https://github.com/microbiomedata/enviroMS/blob/master/wdl/di_fticr_ms.wdl",
        workflow_version_url: "https://github.com/microbiomedata/enviroMS/blob/master/.bumpversion.cfg",
    },
    raw_data_object_type: "Direct Infusion FT ICR-MS Raw Data",
    parameters: FileProfile {
        category: PARAMETERS,
        object_type: "Analysis Tool Parameter File",
        description: "EnviroMS processing parameters for natural organic matter analysis.",
    },
    results: FileProfile {
        category: PROCESSED,
        object_type: "Direct Infusion FT-ICR MS Analysis Results",
        description: "EnviroMS natural organic matter workflow molecular formula assignment output details",
    },
    qc_plots: FileProfile {
        category: PROCESSED,
        object_type: "Direct Infusion FT-ICR MS QC Plots",
        description: "EnviroMS QC plots representing a Direct Infusion NOM analysis.",
    },
};

pub const LCMS_NOM: NomProfile = NomProfile {
    common: Profile {
        name: "lcms_nom",
        mass_spec_description:
            "Generation of mass spectrometry data for the analysis of NOM when acquired using liquid chromatography.",
        eluent_introduction: "liquid_chromatography",
        analyte_category: "nom",
        workflow_name: "LC FT-ICR MS NOM Analysis",
        workflow_description:
            "Processing of raw liquid chromatography FT-ICR MS data for natural organic matter identification.",
        workflow_git_url: "https://github.com/microbiomedata/enviroMS/blob/master/wdl/lc_ftirc_ms.wdl",
        workflow_version_url: "https://github.com/microbiomedata/enviroMS/blob/master/.bumpversion.cfg",
    },
    raw_data_object_type: "LC FT-ICR MS Raw Data",
    parameters: FileProfile {
        category: PARAMETERS,
        object_type: "Analysis Tool Parameter File",
        description: "EnviroMS processing parameters for natural organic matter analysis when acquired using liquid chromatography.",
    },
    results: FileProfile {
        category: PROCESSED,
        object_type: "LC FT-ICR MS Analysis Results",
        description: "NOM annotations as a result of a NOM workflow activity.",
    },
    qc_plots: FileProfile {
        category: PROCESSED,
        object_type: "LC FT-ICR MS QC Plots",
        description: "EnviroMS QC plots representing a NOM analysis.",
    },
};
