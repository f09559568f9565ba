//! nftest - regression tests for workflow pipelines
//!
//! ## Commands
//!
//! - `run`: run the cases of a test file and assert their outputs
//! - `init`: write a starter `nftest.yml` and `test/global.config`

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{info, warn, Level};

use nftest_core::{find_config, init_tracing, HarnessEnv, TestRunner};

const TEMPLATE_TEST_FILE: &str = include_str!("../templates/nftest.yml");
const TEMPLATE_GLOBAL_CONFIG: &str = include_str!("../templates/global.config");

#[derive(Parser)]
#[command(name = "nftest")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Run workflow pipelines and assert their outputs", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run test cases
    Run {
        /// Test file (default: nftest.yaml or nftest.yml in the current directory)
        #[arg(short = 'c', long)]
        config_file: Option<PathBuf>,

        /// Write a JSON run report to this path
        #[arg(long)]
        report: Option<PathBuf>,

        /// Exact names of the cases to run (default: all)
        #[arg(value_name = "TEST_CASES")]
        test_cases: Vec<String>,
    },

    /// Create template test files in NFT_INIT (default: current directory)
    Init,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let env = HarnessEnv::from_env();

    // Setup logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        env.log_level
    };
    init_tracing(cli.json, level, &env.log_file)
        .with_context(|| format!("Failed to open log file {}", env.log_file.display()))?;

    match cli.command {
        Commands::Run {
            config_file,
            report,
            test_cases,
        } => {
            let success = cmd_run(&env, config_file, report.as_deref(), &test_cases).await?;
            if !success {
                std::process::exit(1);
            }
            Ok(())
        }
        Commands::Init => cmd_init(&env.init_dir),
    }
}

/// Run the selected cases. Returns whether every case passed or was skipped.
async fn cmd_run(
    env: &HarnessEnv,
    config_file: Option<PathBuf>,
    report_path: Option<&Path>,
    test_cases: &[String],
) -> Result<bool> {
    let cwd = std::env::current_dir().context("Failed to read current directory")?;
    let Some(config_file) = find_config(config_file, &cwd) else {
        bail!("No test file given and no nftest.yaml or nftest.yml in {}", cwd.display());
    };

    let runner = TestRunner::load(&config_file, test_cases)?;
    let report = runner.run(env).await;

    if let Some(path) = report_path {
        report
            .write_to(path)
            .with_context(|| format!("Failed to write report {}", path.display()))?;
        info!("Report written to {}", path.display());
    }

    Ok(report.success())
}

/// Write template files into `dir`, leaving existing files untouched.
fn cmd_init(dir: &Path) -> Result<()> {
    if !dir.exists() {
        warn!("{} does not exist, attempting to create it...", dir.display());
        std::fs::create_dir_all(dir).with_context(|| {
            format!(
                "Failed to create {}. Please ensure proper permissions are set.",
                dir.display()
            )
        })?;
    }

    write_template(&dir.join("nftest.yml"), TEMPLATE_TEST_FILE)?;

    let test_dir = dir.join("test");
    std::fs::create_dir_all(&test_dir)
        .with_context(|| format!("Failed to create {}", test_dir.display()))?;
    write_template(&test_dir.join("global.config"), TEMPLATE_GLOBAL_CONFIG)?;

    Ok(())
}

fn write_template(path: &Path, contents: &str) -> Result<()> {
    if path.exists() {
        info!("{} already exists", path.display());
        return Ok(());
    }
    std::fs::write(path, contents).with_context(|| format!("Failed to write {}", path.display()))?;
    info!("{} created", path.display());
    Ok(())
}
