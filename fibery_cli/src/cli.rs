use clap::{Args, Parser, Subcommand};
use fibery_core::SourceKind;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    name = "fibery-sources",
    version,
    about = "Inspect Fibery schemas and build incremental entity queries"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// List selectable entity types as picker options (JSON).
    Types {
        #[arg(long, env = "FIBERY_SCHEMA_FILE")]
        schema: PathBuf,
    },

    /// List selectable fields of a type as picker options (JSON).
    Fields {
        #[arg(long, env = "FIBERY_SCHEMA_FILE")]
        schema: PathBuf,

        /// Type name or type id.
        #[arg(long = "type", env = "FIBERY_ENTITY_TYPE")]
        entity_type: String,
    },

    /// Print the assembled query object (JSON).
    Query(QueryArgs),

    /// Run one poll cycle against an entity dump, persisting the checkpoint to a file.
    Poll(PollArgs),

    /// Poll the entity dump every `FIBERY_POLL_INTERVAL_SECS` until ctrl-c, printing
    /// emitted entities as JSON lines.
    Run(PollArgs),

    /// Print the poller configuration resolved from the environment.
    Config,
}

#[derive(Debug, Args)]
pub struct QueryArgs {
    #[arg(long, env = "FIBERY_SCHEMA_FILE")]
    pub schema: PathBuf,

    /// Type name or type id.
    #[arg(long = "type", env = "FIBERY_ENTITY_TYPE")]
    pub entity_type: String,

    /// Field names or ids to select (repeatable or comma-delimited).
    #[arg(long = "field", value_delimiter = ',')]
    pub fields: Vec<String>,

    #[arg(long, value_parser = parse_kind, default_value = "created_or_updated")]
    pub kind: SourceKind,

    /// Row limit; 0 is unbounded. Defaults to the kind's preset.
    #[arg(long)]
    pub limit: Option<u32>,

    /// Checkpoint (RFC 3339) to filter against. Without it no incremental clauses are added.
    #[arg(long)]
    pub since: Option<String>,
}

#[derive(Debug, Clone, Args)]
pub struct PollArgs {
    #[arg(long, env = "FIBERY_SCHEMA_FILE")]
    pub schema: PathBuf,

    /// JSON array of entities standing in for the workspace (re-read every cycle).
    #[arg(long)]
    pub entities: PathBuf,

    /// JSON file holding checkpoints between runs (created if missing).
    #[arg(long, default_value = ".fibery_checkpoints.json")]
    pub state: PathBuf,
}

fn parse_kind(raw: &str) -> Result<SourceKind, String> {
    raw.parse::<SourceKind>().map_err(|e| e.to_string())
}
