use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::{debug, error, info, Instrument};

use nmdc_ms_metadata::app::ports::NmdcApiPort;
use nmdc_ms_metadata::config::{load_bio_api_key, ApiSettings, Credentials};
use nmdc_ms_metadata::constants::{DEFAULT_CALIBRATION_STANDARD, DEFAULT_GCMS_CONFIGURATION_FILE};
use nmdc_ms_metadata::generators::{
    create_generator, BiosampleGenerator, GeneratorContext, GeneratorKind, GeneratorOptions, MetadataGenerator,
};
use nmdc_ms_metadata::infra::{BioPortalClient, ReqwestNmdcApi, SystemClock};
use nmdc_ms_metadata::observability::{self, metrics};
use nmdc_ms_metadata::parser::biosample::write_template;
use nmdc_ms_metadata::{logging, validation};

#[derive(Parser)]
#[command(name = "nmdc-ms-metadata")]
#[command(about = "Generate NMDC schema metadata for mass spectrometry data")]
#[command(version)]
struct Cli {
    /// Write Prometheus metrics to this file before exiting
    #[arg(long, global = true)]
    metrics_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug)]
struct CommonArgs {
    /// CSV file describing one raw data file per row
    #[arg(long)]
    metadata_file: PathBuf,
    /// Where the generated JSON database is written
    #[arg(long)]
    database_dump_path: PathBuf,
    /// Base URL the processed data will be served from
    #[arg(long)]
    process_data_url: String,
    /// Base URL of the raw data; optional when the CSV has a raw_data_url column
    #[arg(long)]
    raw_data_url: Option<String>,
    /// TOML file with CLIENT_ID, CLIENT_SECRET and BIO_API_KEY
    #[arg(long)]
    minting_config_creds: Option<PathBuf>,
    /// Workflow version; looked up in the workflow repository when omitted
    #[arg(long)]
    workflow_version: Option<String>,
    /// Regenerate workflow records for reprocessed data
    #[arg(long)]
    rerun: bool,
    #[arg(long)]
    skip_sample_id_check: bool,
    /// Also validate the dump with the runtime API
    #[arg(long)]
    validate_with_api: bool,
}

impl CommonArgs {
    fn options(&self) -> GeneratorOptions {
        GeneratorOptions {
            metadata_file: self.metadata_file.clone(),
            process_data_url: self.process_data_url.clone(),
            raw_data_url: self.raw_data_url.clone(),
            workflow_version: self.workflow_version.clone(),
            skip_sample_id_check: self.skip_sample_id_check,
            ..Default::default()
        }
    }
}

#[derive(Args, Debug)]
struct LcmsArgs {
    #[command(flatten)]
    common: CommonArgs,
    /// Data object ids added to every analysis's inputs (comma-separated)
    #[arg(long, value_delimiter = ',')]
    existing_data_objects: Vec<String>,
}

#[derive(Args, Debug)]
struct GcmsArgs {
    #[command(flatten)]
    common: CommonArgs,
    #[arg(long, default_value = DEFAULT_CALIBRATION_STANDARD)]
    calibration_standard: String,
    /// Name of the registered CoreMS parameter file
    #[arg(long, default_value = DEFAULT_GCMS_CONFIGURATION_FILE)]
    configuration_file: String,
}

#[derive(Subcommand)]
enum Commands {
    /// LC-MS lipidomics metadata
    LcmsLipid(LcmsArgs),
    /// LC-MS metabolomics metadata
    LcmsMetab(LcmsArgs),
    /// GC-MS metabolomics metadata
    GcmsMetab(GcmsArgs),
    /// Direct infusion FT-ICR MS natural organic matter metadata
    DiNom(CommonArgs),
    /// LC FT-ICR MS natural organic matter metadata
    LcmsNom(CommonArgs),
    /// Biosamples from biosample.* columns
    Biosample {
        #[arg(long)]
        metadata_file: PathBuf,
        #[arg(long)]
        database_dump_path: PathBuf,
        #[arg(long)]
        minting_config_creds: Option<PathBuf>,
    },
    /// Write an example biosample CSV
    BiosampleTemplate {
        #[arg(long, default_value = "biosample_template.csv")]
        output: PathBuf,
    },
    /// Validate a database dump
    Validate {
        database: PathBuf,
        /// Also validate with the runtime API
        #[arg(long)]
        use_api: bool,
        #[arg(long)]
        minting_config_creds: Option<PathBuf>,
    },
    /// Validate and submit a database dump to the runtime API
    Submit {
        database: PathBuf,
        #[arg(long)]
        minting_config_creds: Option<PathBuf>,
    },
}

fn runtime_api(settings: &ApiSettings, config_file: Option<&Path>) -> Result<Arc<dyn NmdcApiPort>> {
    let credentials = Credentials::load(config_file)?;
    Ok(Arc::new(ReqwestNmdcApi::new(settings.clone(), Some(credentials))?))
}

fn generator_context(api: Arc<dyn NmdcApiPort>, settings: &ApiSettings, config_file: Option<&Path>) -> GeneratorContext {
    let ctx = GeneratorContext::new(api, Arc::new(SystemClock), settings);
    match load_bio_api_key(config_file) {
        Ok(key) => ctx.with_ontology(Arc::new(BioPortalClient::new(key))),
        Err(e) => {
            debug!(error = %e, "BioPortal client not configured");
            ctx
        }
    }
}

async fn generate(
    mut generator: Box<dyn MetadataGenerator>,
    api: &dyn NmdcApiPort,
    rerun: bool,
    dump_path: &Path,
    validate_with_api: bool,
) -> Result<()> {
    let span = tracing::info_span!("generate", generator = generator.name(), rerun);
    let db = if rerun {
        generator.rerun().instrument(span).await?
    } else {
        generator.run().instrument(span).await?
    };
    for (collection, count) in db.counts() {
        metrics::generation::records_generated(collection, count);
    }
    db.dump(dump_path)?;

    let value = db.to_value()?;
    validation::validate_database(&value)?;
    if validate_with_api {
        api.validate_json(&value).await?;
        info!("Runtime API validation passed");
    }

    println!("\n📊 {} results:", generator.name());
    for (collection, count) in db.counts() {
        println!("   {}: {}", collection, count);
    }
    println!("   Output file: {}", dump_path.display());
    Ok(())
}

async fn run_workflow(kind: GeneratorKind, common: &CommonArgs, opts: GeneratorOptions) -> Result<()> {
    let settings = ApiSettings::from_env();
    let config_file = common.minting_config_creds.as_deref();
    let api = runtime_api(&settings, config_file)?;
    let ctx = generator_context(api.clone(), &settings, config_file);
    info!(generator = %kind, api = %settings.base_url, "Starting metadata generation");
    let generator = create_generator(kind, ctx, opts);
    generate(generator, api.as_ref(), common.rerun, &common.database_dump_path, common.validate_with_api).await
}

async fn execute(command: Commands) -> Result<()> {
    match command {
        Commands::LcmsLipid(args) => {
            let opts = GeneratorOptions {
                existing_data_objects: args.existing_data_objects.clone(),
                ..args.common.options()
            };
            run_workflow(GeneratorKind::LcmsLipid, &args.common, opts).await
        }
        Commands::LcmsMetab(args) => {
            let opts = GeneratorOptions {
                existing_data_objects: args.existing_data_objects.clone(),
                ..args.common.options()
            };
            run_workflow(GeneratorKind::LcmsMetab, &args.common, opts).await
        }
        Commands::GcmsMetab(args) => {
            let opts = GeneratorOptions {
                calibration_standard: args.calibration_standard.clone(),
                configuration_file_name: args.configuration_file.clone(),
                ..args.common.options()
            };
            run_workflow(GeneratorKind::GcmsMetab, &args.common, opts).await
        }
        Commands::DiNom(common) => run_workflow(GeneratorKind::DiNom, &common, common.options()).await,
        Commands::LcmsNom(common) => run_workflow(GeneratorKind::LcmsNom, &common, common.options()).await,
        Commands::Biosample { metadata_file, database_dump_path, minting_config_creds } => {
            let settings = ApiSettings::from_env();
            let config_file = minting_config_creds.as_deref();
            let api = runtime_api(&settings, config_file)?;
            let ctx = generator_context(api.clone(), &settings, config_file);
            let generator = Box::new(BiosampleGenerator::new(ctx, metadata_file));
            generate(generator, api.as_ref(), false, &database_dump_path, false).await
        }
        Commands::BiosampleTemplate { output } => {
            write_template(&output)?;
            println!("✅ Biosample template written to {}", output.display());
            Ok(())
        }
        Commands::Validate { database, use_api, minting_config_creds } => {
            let value = validation::validate_file(&database)?;
            if use_api {
                let credentials = Credentials::load(minting_config_creds.as_deref()).ok();
                let api = ReqwestNmdcApi::new(ApiSettings::from_env(), credentials)?;
                api.validate_json(&value).await?;
            }
            println!("✅ {} is valid", database.display());
            Ok(())
        }
        Commands::Submit { database, minting_config_creds } => {
            let value = validation::validate_file(&database)?;
            let api = runtime_api(&ApiSettings::from_env(), minting_config_creds.as_deref())?;
            api.validate_json(&value).await?;
            api.submit_json(&value).await?;
            println!("✅ {} submitted", database.display());
            Ok(())
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    logging::init_logging();
    observability::init().context("Failed to install metrics recorder")?;

    let cli = Cli::parse();
    let result = execute(cli.command).await;
    if let Err(e) = &result {
        error!(error = %e, "Command failed");
    }

    if let Some(path) = &cli.metrics_file {
        observability::write_to_file(path).context("Failed to write metrics")?;
    }
    result
}
