use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use eyre::{Result, WrapErr, eyre};
use serde_json::Value;
use tracing::{info, warn};

use optiform_card::{CardContext, format_card};
use optiform_core::document::load_schema;
use optiform_core::record::{Record, RecordPath, value_at};
use optiform_core::schema::{ExamSchema, NoAliases};
use optiform_core::store::{MemoryStore, RecordStore};
use optiform_core::visibility::RecordVisibility;
use optiform_forms::initialize::initialize;
use optiform_forms::mutate::{AddOutcome, add_item, clear_group, set_field};
use optiform_forms::selection::toggle;

#[derive(Parser)]
#[command(name = "optiform")]
#[command(about = "Inspect and edit schema-driven exam records")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct Inputs {
    /// Exam schema document (JSON)
    #[arg(long)]
    schema: PathBuf,
    /// Record file (JSON)
    #[arg(long)]
    record: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// Bring the record into the shape the schema expects
    Normalize {
        #[command(flatten)]
        inputs: Inputs,
    },
    /// Render the record's card
    Card {
        #[command(flatten)]
        inputs: Inputs,
        /// Print card lines as JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Cycle a checklist option through its selection states
    Toggle {
        #[command(flatten)]
        inputs: Inputs,
        /// Field path, e.g. `Symptoms` or `Exam[0].OD.findings`
        path: String,
        /// Option to toggle
        option: String,
    },
    /// Add an instance at the front of a repeating group
    AddItem {
        #[command(flatten)]
        inputs: Inputs,
        group: String,
    },
    /// Clear a group, or one instance of a repeating group
    Clear {
        #[command(flatten)]
        inputs: Inputs,
        group: String,
        #[arg(long)]
        index: Option<usize>,
    },
}

fn main() -> Result<()> {
    color_eyre::install()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Normalize { inputs } => {
            let Session { schema, mut store, id } = Session::open(&inputs)?;
            let mut record = fetch(&store, &id)?;
            let addable = initialize(&schema, &mut record);
            if !addable.is_empty() {
                info!(groups = ?addable, "optional groups can be added");
            }
            print_record(&store_record(&mut store, &id, record)?)?;
        }
        Commands::Card { inputs, json } => {
            let Session { schema, store, id } = Session::open(&inputs)?;
            let record = fetch(&store, &id)?;
            let visibility = RecordVisibility::new(&record);
            let ctx = CardContext::new(&id).with_visibility(&visibility);
            let card = format_card(&schema, &record, &ctx);
            if json {
                println!("{}", serde_json::to_string_pretty(&card)?);
            } else {
                println!("{card}");
            }
        }
        Commands::Toggle {
            inputs,
            path,
            option,
        } => {
            let Session { schema, mut store, id } = Session::open(&inputs)?;
            let mut record = fetch(&store, &id)?;
            let node = schema
                .node_at(&path)
                .ok_or_else(|| eyre!("'{path}' is not a field of {}", schema.name))?;
            let record_path: RecordPath = path.parse()?;
            let current = record
                .form(&schema.name)
                .and_then(|form| value_at(form, &record_path));
            let updated = toggle(&node.definition, current, &option);
            if !set_field(&schema, &mut record, &record_path, updated.unwrap_or(Value::Null)) {
                warn!(path = %record_path, "nothing to toggle at path");
            }
            print_record(&store_record(&mut store, &id, record)?)?;
        }
        Commands::AddItem { inputs, group } => {
            let Session { schema, mut store, id } = Session::open(&inputs)?;
            let mut record = fetch(&store, &id)?;
            match add_item(&schema, &mut record, &group, None, false, None) {
                AddOutcome::Added { index } => info!(group = %group, index, "item added"),
                AddOutcome::LimitReached(notice) => eprintln!("{}", notice.message),
                AddOutcome::Ignored => warn!(group = %group, "no item added"),
            }
            print_record(&store_record(&mut store, &id, record)?)?;
        }
        Commands::Clear {
            inputs,
            group,
            index,
        } => {
            let Session { schema, mut store, id } = Session::open(&inputs)?;
            let mut record = fetch(&store, &id)?;
            if !clear_group(&schema, &mut record, &group, index) {
                warn!(group = %group, ?index, "nothing cleared");
            }
            print_record(&store_record(&mut store, &id, record)?)?;
        }
    }

    Ok(())
}

/// A schema plus the record file loaded into an in-memory store.
struct Session {
    schema: ExamSchema,
    store: MemoryStore,
    id: String,
}

impl Session {
    fn open(inputs: &Inputs) -> Result<Self> {
        let schema = read(&inputs.schema)?;
        let schema = load_schema(&schema, &NoAliases)
            .wrap_err_with(|| format!("loading schema {}", inputs.schema.display()))?;

        let record: Value = serde_json::from_str(&read(&inputs.record)?)
            .wrap_err_with(|| format!("parsing record {}", inputs.record.display()))?;
        let record = Record::from_value(record)?;

        let id = inputs
            .record
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| "record".to_string());
        let mut store = MemoryStore::new();
        store_record(&mut store, &id, record)?;

        info!(exam = %schema.name, record = %id, "session opened");
        Ok(Self { schema, store, id })
    }
}

fn read(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).wrap_err_with(|| format!("reading {}", path.display()))
}

fn fetch(store: &MemoryStore, id: &str) -> Result<Record> {
    let Ok(record) = store.fetch(id);
    record.ok_or_else(|| eyre!("record '{id}' not found"))
}

fn store_record(store: &mut MemoryStore, id: &str, record: Record) -> Result<Record> {
    let Ok(stored) = store.store(id, record);
    Ok(stored)
}

fn print_record(record: &Record) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(record)?);
    Ok(())
}
