use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use serde_json::Value;
use sheetplan::files::{load_sheet, save_sheet};
use sheetplan::{
    ClassificationResult, CompilerConfig, Executor, ExecutorConfig, FilterPolicy, Intent,
    PlanCompiler, SheetSchema, SkillRegistry, WirePlan,
};

#[derive(Parser, Debug)]
#[command(name = "sheetplan", version, about = "Compile and apply spreadsheet action plans")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compile a classification and a raw plan into a typed plan (JSON on stdout).
    Compile(CompileArgs),
    /// Apply a plan to a sheet file and print the execution result.
    Run(RunArgs),
    /// Print the skill section offered to the planner for one intent.
    Skills(SkillsArgs),
    /// Validate a skill registry file.
    LintRegistry(LintArgs),
    /// Print the JSON schema of the skill registry document.
    Schema,
}

#[derive(Args, Debug)]
struct RegistryArg {
    /// Skill registry YAML; the bundled registry is used when omitted.
    #[arg(long)]
    registry: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct CompileArgs {
    /// Classification JSON (`intent`, `confidence`, optional `explicitChartType`).
    #[arg(long)]
    classification: PathBuf,

    /// Raw plan JSON as returned by the planner. Code fences are tolerated.
    #[arg(long)]
    plan: PathBuf,

    /// Sheet file (.json, .csv, .tsv) to derive the schema from.
    #[arg(long, conflicts_with = "schema", required_unless_present = "schema")]
    workbook: Option<PathBuf>,

    /// Sheet schema JSON, used instead of reading a workbook.
    #[arg(long)]
    schema: Option<PathBuf>,

    /// Abort on a missing required parameter instead of skipping the item.
    #[arg(long)]
    strict: bool,

    #[command(flatten)]
    registry: RegistryArg,
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Plan JSON (`summary`, `steps`).
    #[arg(long)]
    plan: PathBuf,

    /// Sheet file (.json, .csv, .tsv).
    #[arg(long)]
    workbook: PathBuf,

    /// Write the mutated sheet here (.json or .csv).
    #[arg(long)]
    save: Option<PathBuf>,

    /// FILTER_DATA keeps matching rows instead of deleting them.
    #[arg(long)]
    keep_matching: bool,

    #[command(flatten)]
    registry: RegistryArg,
}

#[derive(Args, Debug)]
struct SkillsArgs {
    /// formula, chart, clean_data, organization or insight.
    intent: String,

    #[command(flatten)]
    registry: RegistryArg,
}

#[derive(Args, Debug)]
struct LintArgs {
    /// Registry YAML to validate.
    path: PathBuf,
}

fn main() -> ExitCode {
    init_tracing();
    match run(Cli::parse()) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn run(cli: Cli) -> Result<ExitCode> {
    match cli.command {
        Command::Compile(args) => compile(args),
        Command::Run(args) => execute(args),
        Command::Skills(args) => skills(args),
        Command::LintRegistry(args) => lint(&args.path),
        Command::Schema => {
            println!("{}", sheetplan::skills::schema_json());
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn load_registry(arg: &RegistryArg) -> Result<SkillRegistry> {
    match &arg.registry {
        Some(path) => SkillRegistry::load_path(path)
            .with_context(|| format!("loading registry {}", path.display())),
        None => SkillRegistry::builtin().context("loading bundled registry"),
    }
}

fn read_text(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
}

fn read_json(path: &Path) -> Result<Value> {
    let text = read_text(path)?;
    let json = sheetplan::engine::extract_json(&text)
        .with_context(|| format!("{} contains no JSON object", path.display()))?;
    serde_json::from_str(json).with_context(|| format!("parsing {}", path.display()))
}

fn print_json(value: &impl serde::Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn compile(args: CompileArgs) -> Result<ExitCode> {
    let registry = load_registry(&args.registry)?;
    let classification = ClassificationResult::parse(&read_text(&args.classification)?)
        .with_context(|| format!("parsing classification {}", args.classification.display()))?;
    let raw = read_json(&args.plan)?;
    let schema = match (&args.schema, &args.workbook) {
        (Some(path), _) => serde_json::from_value::<SheetSchema>(read_json(path)?)
            .with_context(|| format!("parsing schema {}", path.display()))?,
        (None, Some(path)) => {
            let sheet = load_sheet(path).with_context(|| format!("loading {}", path.display()))?;
            SheetSchema::from_store(&sheet)
                .with_context(|| format!("reading headers of {}", path.display()))?
        }
        (None, None) => bail!("either --workbook or --schema is required"),
    };

    let mut config = CompilerConfig::from_registry(&registry);
    if args.strict {
        config = config.strict();
    }
    let compiled = PlanCompiler::with_config(&registry, config)
        .compile(&classification, &raw, &schema)
        .context("compiling plan")?;
    for warning in &compiled.warnings {
        tracing::warn!(%warning, "compiler warning");
    }
    print_json(&compiled)?;
    Ok(ExitCode::SUCCESS)
}

fn execute(args: RunArgs) -> Result<ExitCode> {
    let registry = load_registry(&args.registry)?;
    let plan: WirePlan = serde_json::from_value(read_json(&args.plan)?)
        .with_context(|| format!("parsing plan {}", args.plan.display()))?;
    let mut sheet = load_sheet(&args.workbook)
        .with_context(|| format!("loading {}", args.workbook.display()))?;

    let mut config = ExecutorConfig::from_registry(&registry);
    if args.keep_matching {
        config = config.with_filter_policy(FilterPolicy::KeepMatching);
    }
    let result = Executor::with_config(&registry, config).execute_wire(&mut sheet, &plan);
    print_json(&result)?;

    if let Some(path) = &args.save {
        save_sheet(&sheet, path).with_context(|| format!("saving {}", path.display()))?;
        tracing::info!(path = %path.display(), "sheet saved");
    }
    Ok(if result.all_succeeded() {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(2)
    })
}

fn skills(args: SkillsArgs) -> Result<ExitCode> {
    let registry = load_registry(&args.registry)?;
    let intent: Intent = args.intent.parse()?;
    print_json(&registry.section(intent))?;
    Ok(ExitCode::SUCCESS)
}

fn lint(path: &Path) -> Result<ExitCode> {
    let text = read_text(path)?;
    let registry = SkillRegistry::from_yaml_str(&text)
        .with_context(|| format!("parsing {}", path.display()))?;
    match registry.validate() {
        Ok(()) => {
            println!("{}: ok", path.display());
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            for issue in err.issues() {
                eprintln!("{}: {}: {}", path.display(), issue.path, issue.message);
            }
            Ok(ExitCode::FAILURE)
        }
    }
}
