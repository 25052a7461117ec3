//! # Graph Subcommand
//!
//! Prints the transition table of a workflow graph in declaration order.
//! Wildcard rows print their source state as `*`.

use clap::{Args, ValueEnum};

use pcal_state::{CalibrationGraph, GraphKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum GraphChoice {
    /// Offset calibration with a known tip length.
    Offset,
    /// Tip-length measurement followed by offset calibration.
    TipLength,
}

impl From<GraphChoice> for GraphKind {
    fn from(choice: GraphChoice) -> Self {
        match choice {
            GraphChoice::Offset => GraphKind::PipetteOffset,
            GraphChoice::TipLength => GraphKind::TipLengthAndOffset,
        }
    }
}

/// Arguments for the graph subcommand.
#[derive(Args, Debug)]
pub struct GraphArgs {
    #[arg(value_enum)]
    pub kind: GraphChoice,
}

pub fn render(kind: GraphKind) -> anyhow::Result<String> {
    let graph = CalibrationGraph::for_kind(kind)?;
    let mut out = format!("{kind} (initial: {})\n", graph.initial_state());
    for (from, command, to) in graph.rows() {
        out.push_str(&format!("{from:<24} {:<24} {to}\n", command.as_str()));
    }
    Ok(out)
}

pub fn execute(args: &GraphArgs) -> anyhow::Result<()> {
    print!("{}", render(args.kind.into())?);
    Ok(())
}
