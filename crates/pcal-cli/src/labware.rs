//! # Validate-Labware Subcommand
//!
//! Checks labware definition files against the bundled schema and reports
//! the URI and content hash the calibration store would key them by.

use std::path::{Path, PathBuf};

use clap::Args;

use pcal_deck::LabwareDefinition;
use pcal_schema::{SchemaValidator, LABWARE_DEFINITION_SCHEMA};

/// Arguments for the validate-labware subcommand.
#[derive(Args, Debug)]
pub struct ValidateLabwareArgs {
    /// Definition files (JSON or YAML).
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,
}

/// Summary line for one valid definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabwareReport {
    pub uri: String,
    pub is_tiprack: bool,
    pub content_hash: String,
}

pub fn inspect(validator: &SchemaValidator, path: &Path) -> anyhow::Result<LabwareReport> {
    let document = validator.validate_file(path, LABWARE_DEFINITION_SCHEMA)?;
    let definition = LabwareDefinition::from_value(document, validator)?;
    Ok(LabwareReport {
        uri: definition.uri().to_string(),
        is_tiprack: definition.is_tiprack(),
        content_hash: definition.content_hash()?,
    })
}

/// Execute the validate-labware subcommand. Every file is checked; the
/// command fails if any of them is invalid.
pub fn execute(args: &ValidateLabwareArgs) -> anyhow::Result<()> {
    let validator = SchemaValidator::bundled()?;
    let mut failures = 0usize;
    for path in &args.paths {
        match inspect(&validator, path) {
            Ok(report) => {
                let kind = if report.is_tiprack { "tiprack" } else { "labware" };
                println!(
                    "OK    {}  {} {kind} {}",
                    path.display(),
                    report.uri,
                    report.content_hash
                );
            }
            Err(e) => {
                failures += 1;
                tracing::warn!(path = %path.display(), error = %e, "labware definition rejected");
                println!("FAIL  {}  {e:#}", path.display());
            }
        }
    }
    if failures > 0 {
        anyhow::bail!("{failures} of {} definitions failed validation", args.paths.len());
    }
    Ok(())
}
