//! # Run Subcommand
//!
//! Opens a calibration session on the simulated robot and feeds it the
//! commands of a YAML script, one at a time. Calibration data goes to the
//! filesystem store named by the configuration.
//!
//! Script format:
//!
//! ```yaml
//! - command: loadLabware
//! - command: jog
//!   data: { vector: [0, 0, -1] }
//! - command: saveOffset
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::Args;
use serde::Deserialize;
use serde_json::Value;

use pcal_core::Mount;
use pcal_hardware::{ArcPlanner, SimulatedHardware};
use pcal_session::{CalibrationConfig, CalibrationSession, SessionParams};
use pcal_store::FileCalibrationStore;

/// Arguments for the run subcommand.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Command script: a YAML list of `{command, data}` entries.
    #[arg(long)]
    pub script: PathBuf,

    /// Mount carrying the pipette (`left` or `right`).
    #[arg(long, default_value = "right")]
    pub mount: Mount,

    /// Pipette model attached to the simulated mount.
    #[arg(long, default_value = "p300_single_v2.0")]
    pub pipette: String,

    /// Serial number of the simulated pipette.
    #[arg(long, default_value = "P3HSIM0001")]
    pub serial: String,

    /// Measure tip length even when a stored value exists.
    #[arg(long)]
    pub recalibrate_tip_length: bool,

    /// A calibration block is on the deck.
    #[arg(long)]
    pub calibration_block: bool,

    /// Tip rack definition (JSON) to use instead of the default.
    #[arg(long)]
    pub tiprack: Option<PathBuf>,

    /// YAML configuration file. Without it, configuration comes from the
    /// environment.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Print the simulated hardware event log after the script.
    #[arg(long)]
    pub events: bool,
}

/// One scripted command.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScriptStep {
    pub command: String,
    #[serde(default)]
    pub data: Value,
}

pub fn parse_script(text: &str) -> anyhow::Result<Vec<ScriptStep>> {
    serde_yaml::from_str(text).context("invalid command script")
}

pub fn load_script(path: &Path) -> anyhow::Result<Vec<ScriptStep>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read script {}", path.display()))?;
    parse_script(&text).with_context(|| format!("in {}", path.display()))
}

fn load_config(path: Option<&Path>) -> anyhow::Result<CalibrationConfig> {
    Ok(match path {
        Some(path) => CalibrationConfig::from_yaml_file(path)?,
        None => CalibrationConfig::from_env()?,
    })
}

fn load_tiprack(path: &Path) -> anyhow::Result<Value> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read tip rack {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("tip rack {} is not JSON", path.display()))
}

/// Execute the run subcommand.
pub async fn execute(args: RunArgs) -> anyhow::Result<()> {
    let config = load_config(args.config.as_deref())?;
    let script = load_script(&args.script)?;

    let hardware = SimulatedHardware::new().with_pipette(args.mount, &args.pipette, &args.serial)?;
    let store = FileCalibrationStore::new(config.calibration_dir.clone());

    let mut params = SessionParams::new(args.mount);
    params.recalibrate_tip_length = args.recalibrate_tip_length;
    params.has_calibration_block = args.calibration_block;
    params.tiprack_definition = args.tiprack.as_deref().map(load_tiprack).transpose()?;

    let mut session = CalibrationSession::new(
        Arc::new(hardware.clone()),
        Arc::new(ArcPlanner::default()),
        Arc::new(store),
        params,
        &config,
    )
    .await
    .context("cannot open calibration session")?;

    println!(
        "{} {} ({})",
        session.id(),
        session.graph_kind(),
        session.current_state()
    );
    println!(
        "{}",
        serde_json::to_string_pretty(&serde_json::json!({
            "requiredLabware": session.required_labware(),
            "attachedPipette": session.attached_pipette(),
        }))?
    );

    for (index, step) in script.into_iter().enumerate() {
        let number = index + 1;
        match session.handle_command(&step.command, step.data).await {
            Ok(state) => println!("{number:>3}  {:<24} -> {state}", step.command),
            Err(e) => {
                anyhow::bail!("step {number} ({}) failed [{}]: {e}", step.command, e.class());
            }
        }
    }

    if args.events {
        for event in hardware.events() {
            println!("{}", serde_json::to_string(&event)?);
        }
    }
    Ok(())
}
