use crate::infra::load_mapper;
use clap::Args;
use resale_cert::certificate::{ApplicationData, DocumentFiller, FieldManifest, FillOptions, PdfForm};
use resale_cert::error::AppError;
use resale_cert::telemetry;
use serde_json::{json, Value};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Args, Debug)]
pub(crate) struct FieldsArgs {
    /// JSON file holding the application data
    #[arg(long)]
    pub(crate) data: PathBuf,
    /// IANA timezone used for the printed dates (defaults to UTC)
    #[arg(long)]
    pub(crate) timezone: Option<String>,
    /// Field manifest to map against instead of the bundled one
    #[arg(long)]
    pub(crate) manifest: Option<PathBuf>,
    /// Log filter for stderr diagnostics
    #[arg(long, default_value = "warn")]
    pub(crate) log_level: String,
}

#[derive(Args, Debug)]
pub(crate) struct FillArgs {
    /// JSON file holding the application data
    #[arg(long)]
    pub(crate) data: PathBuf,
    /// Fillable PDF template
    #[arg(long)]
    pub(crate) template: PathBuf,
    /// Where the filled PDF is written
    #[arg(long)]
    pub(crate) output: PathBuf,
    /// IANA timezone used for the printed dates (defaults to UTC)
    #[arg(long)]
    pub(crate) timezone: Option<String>,
    /// Field manifest to map against instead of the bundled one
    #[arg(long)]
    pub(crate) manifest: Option<PathBuf>,
    /// Point size used for generated text appearances
    #[arg(long)]
    pub(crate) font_size: Option<f32>,
    /// Log filter for stderr diagnostics
    #[arg(long, default_value = "warn")]
    pub(crate) log_level: String,
}

#[derive(Args, Debug)]
pub(crate) struct ManifestArgs {
    /// Fillable PDF template to inspect
    #[arg(long)]
    pub(crate) template: PathBuf,
    /// Version label recorded in the manifest
    #[arg(long)]
    pub(crate) version: Option<String>,
    /// Log filter for stderr diagnostics
    #[arg(long, default_value = "warn")]
    pub(crate) log_level: String,
}

pub(crate) fn run_fields(args: FieldsArgs) -> Result<(), AppError> {
    let FieldsArgs {
        data,
        timezone,
        manifest,
        log_level,
    } = args;
    telemetry::init_for_cli(&log_level)?;

    let mapper = load_mapper(manifest.as_deref())?;
    let application = read_application(&data)?;
    let fields = mapper.map(&application, timezone.as_deref());

    let payload = json!({
        "template": mapper.manifest().version(),
        "fields": fields,
    });
    println!("{}", serde_json::to_string_pretty(&payload)?);
    Ok(())
}

pub(crate) fn run_fill(args: FillArgs) -> Result<(), AppError> {
    let FillArgs {
        data,
        template,
        output,
        timezone,
        manifest,
        font_size,
        log_level,
    } = args;
    telemetry::init_for_cli(&log_level)?;

    let mapper = load_mapper(manifest.as_deref())?;
    let application = read_application(&data)?;
    let descriptors = mapper.map(&application, timezone.as_deref());

    let mut options = FillOptions::default();
    if let Some(size) = font_size {
        options.font_size = size;
    }
    let template_bytes = fs::read(&template)?;
    let filled = DocumentFiller::new(options).fill(&template_bytes, &descriptors)?;
    fs::write(&output, &filled.bytes)?;

    let report = &filled.report;
    let faults: Vec<Value> = report
        .faults
        .iter()
        .map(|failure| json!({ "field": failure.field, "fault": failure.fault.to_string() }))
        .collect();
    let summary = json!({
        "output": output.display().to_string(),
        "written": report.written,
        "skipped": report.skipped,
        "faults": faults,
        "radio_conflicts": report.radio_conflicts,
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

pub(crate) fn run_manifest(args: ManifestArgs) -> Result<(), AppError> {
    let ManifestArgs {
        template,
        version,
        log_level,
    } = args;
    telemetry::init_for_cli(&log_level)?;

    let bytes = fs::read(&template)?;
    let form = PdfForm::load(&bytes)?;
    let manifest = FieldManifest::from_form(&form, version)?;
    println!("{}", manifest.to_json()?);
    Ok(())
}

fn read_application(path: &Path) -> Result<ApplicationData, AppError> {
    let raw = fs::read_to_string(path)?;
    let value: Value = serde_json::from_str(&raw)?;
    Ok(ApplicationData::new(value))
}
