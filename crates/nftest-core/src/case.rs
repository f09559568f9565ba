//! Execution of a single test case.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tokio::process::Command;
use tracing::{error, info, info_span, warn, Instrument};

use crate::config::{CaseConfig, GlobalConfig};
use crate::env::HarnessEnv;
use crate::error::{AssertionError, FailureKind, HarnessError, Result};
use crate::process::{relay_output, OutputLevels};
use crate::syslog::SyslogServer;

/// Result of running one case.
#[derive(Debug)]
pub enum CaseOutcome {
    Passed,
    Skipped,
    Failed(CaseFailure),
}

impl CaseOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, CaseOutcome::Failed(_))
    }
}

/// Why a case failed.
#[derive(Debug, thiserror::Error)]
pub enum CaseFailure {
    #[error(
        "pipeline exited with {}",
        exit_code.map_or_else(|| "a signal".to_string(), |code| format!("code {code}"))
    )]
    PipelineFailed { exit_code: Option<i32> },

    #[error("{0}")]
    Harness(HarnessError),

    #[error("{0}")]
    Assertion(#[from] AssertionError),
}

impl CaseFailure {
    pub fn kind(&self) -> FailureKind {
        match self {
            CaseFailure::PipelineFailed { .. } => FailureKind::PipelineFailed,
            CaseFailure::Harness(HarnessError::Assertion(e)) | CaseFailure::Assertion(e) => e.kind(),
            CaseFailure::Harness(HarnessError::PipelineLaunch { .. }) => FailureKind::PipelineLaunch,
            CaseFailure::Harness(HarnessError::Relay(_)) => FailureKind::Relay,
            CaseFailure::Harness(
                HarnessError::ConfigRead { .. } | HarnessError::ConfigParse { .. },
            ) => FailureKind::Config,
            CaseFailure::Harness(HarnessError::Io(_) | HarnessError::Serialization(_)) => {
                FailureKind::Io
            }
        }
    }
}

/// Serializable summary of a pipeline invocation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PipelineCommand {
    pub program: String,
    pub args: Vec<String>,
    pub env: Vec<(String, String)>,
}

impl PipelineCommand {
    /// Shell-like rendering for the log.
    pub fn display(&self) -> String {
        let env = self
            .env
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>();
        let mut parts = env;
        parts.push(self.program.clone());
        parts.extend(self.args.iter().map(|a| {
            if a.contains(char::is_whitespace) {
                format!("'{a}'")
            } else {
                a.clone()
            }
        }));
        parts.join(" ")
    }
}

/// A case with global settings already applied.
#[derive(Debug, Clone)]
pub struct TestCase {
    pub config: CaseConfig,
    pub nf_configs: Vec<PathBuf>,
    pub temp_dir: PathBuf,
    pub remove_temp: bool,
    pub clean_logs: bool,
}

fn unsafe_chars() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^a-zA-Z0-9_\-.]").expect("output name regex is valid"))
}

impl TestCase {
    /// Merge a case with the global section.
    ///
    /// The global config file goes first; unset case settings inherit the
    /// global ones.
    pub fn combine(config: CaseConfig, global: &GlobalConfig) -> Self {
        let mut nf_configs = Vec::new();
        if let Some(global_config) = &global.nf_config {
            nf_configs.push(global_config.clone());
        }
        if let Some(case_config) = &config.nf_config {
            nf_configs.push(case_config.clone());
        }

        Self {
            temp_dir: config.temp_dir.clone().unwrap_or_else(|| global.temp_dir.clone()),
            remove_temp: config.remove_temp.unwrap_or(global.remove_temp),
            clean_logs: config.clean_logs.unwrap_or(global.clean_logs),
            nf_configs,
            config,
        }
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// Filesystem-safe version of the case name.
    pub fn output_name(&self) -> String {
        let dashed = self.config.name.replace(' ', "-");
        unsafe_chars().replace_all(&dashed, "").into_owned()
    }

    /// Directory the pipeline writes this case's results into.
    pub fn output_dir(&self, env: &HarnessEnv) -> PathBuf {
        env.output_dir.join(self.output_name())
    }

    /// The pipeline invocation for this case.
    pub fn pipeline_command(&self, env: &HarnessEnv, syslog_addr: &str) -> PipelineCommand {
        let mut args: Vec<String> = vec![
            "-quiet".into(),
            "-syslog".into(),
            syslog_addr.into(),
            "run".into(),
            self.config.nf_script.to_string_lossy().into_owned(),
        ];

        if !self.config.profiles.is_empty() {
            args.push("-profile".into());
            args.push(self.config.profiles.join(","));
        }
        for config in &self.nf_configs {
            args.push("-c".into());
            args.push(config.to_string_lossy().into_owned());
        }
        if let Some(params_file) = &self.config.params_file {
            args.push("-params-file".into());
            args.push(params_file.to_string_lossy().into_owned());
        }
        for (name, path) in &self.config.reference_params {
            args.push(format!("--{name}"));
            args.push(path.to_string_lossy().into_owned());
        }
        args.push(format!("--{}", self.config.output_directory_param_name));
        args.push(self.output_dir(env).to_string_lossy().into_owned());

        PipelineCommand {
            program: env.pipeline.clone(),
            args,
            env: vec![(
                "NXF_WORK".to_string(),
                self.temp_dir.to_string_lossy().into_owned(),
            )],
        }
    }

    /// Run the case: pipeline, then every assertion in order.
    pub async fn run(&self, env: &HarnessEnv) -> CaseOutcome {
        self.print_prolog();
        let outcome = self
            .run_inner(env)
            .instrument(info_span!("case", name = %self.name()))
            .await;
        self.cleanup();

        match &outcome {
            CaseOutcome::Passed => info!(case = %self.name(), " [ succeed ]"),
            CaseOutcome::Skipped => info!(case = %self.name(), " [ skipped ]"),
            CaseOutcome::Failed(failure) => {
                error!(case = %self.name(), error = %failure, kind = ?failure.kind(), " [ failed ]")
            }
        }
        outcome
    }

    async fn run_inner(&self, env: &HarnessEnv) -> CaseOutcome {
        if self.config.skip {
            return CaseOutcome::Skipped;
        }

        // Freshness baselines must predate this run's pipeline launch.
        let output_dir = self.output_dir(env);
        let assertions: Vec<_> = self
            .config
            .asserts
            .iter()
            .map(|a| a.build(&output_dir))
            .collect();

        match self.submit(env).await {
            Ok(Some(0)) => {}
            Ok(exit_code) => return CaseOutcome::Failed(CaseFailure::PipelineFailed { exit_code }),
            Err(e) => return CaseOutcome::Failed(CaseFailure::Harness(e)),
        }

        for assertion in &assertions {
            if let Err(e) = assertion.perform().await {
                return CaseOutcome::Failed(e.into());
            }
        }
        CaseOutcome::Passed
    }

    /// Launch the pipeline with a syslog relay attached. Returns its exit code.
    ///
    /// The relay is stopped on every path out of this function.
    pub async fn submit(&self, env: &HarnessEnv) -> Result<Option<i32>> {
        let relay_config = env.relay_config();
        let server = SyslogServer::bind(&relay_config).await?;
        let mut relay = server.start(relay_config.poll_interval);

        let command = self.pipeline_command(env, &relay.local_addr().to_string());
        let result = launch(&command).await;

        relay.shutdown().await;
        result
    }

    fn print_prolog(&self) {
        match &self.config.message {
            Some(message) => info!("{}: {}", self.name(), message),
            None => info!("{}", self.name()),
        }
    }

    fn cleanup(&self) {
        if self.config.skip {
            return;
        }
        if self.remove_temp {
            if let Err(e) = std::fs::remove_dir_all(&self.temp_dir) {
                if e.kind() != std::io::ErrorKind::NotFound {
                    warn!(path = %self.temp_dir.display(), error = %e, "Failed to remove temp dir");
                }
            }
        }
        if self.clean_logs {
            remove_pipeline_logs(Path::new("."));
        }
    }
}

async fn launch(command: &PipelineCommand) -> Result<Option<i32>> {
    info!("{}", command.display());

    let child = Command::new(&command.program)
        .args(&command.args)
        .envs(command.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|source| HarnessError::PipelineLaunch {
            program: command.program.clone(),
            source,
        })?;

    let status = relay_output(child, &command.program, OutputLevels::PIPELINE).await?;
    Ok(status.code())
}

/// Remove `.nextflow*` files and directories the pipeline leaves in `dir`.
pub fn remove_pipeline_logs(dir: &Path) {
    let pattern = dir.join(".nextflow*");
    let Ok(entries) = glob::glob(&pattern.to_string_lossy()) else {
        return;
    };
    for path in entries.flatten() {
        let removed = if path.is_dir() {
            std::fs::remove_dir_all(&path)
        } else {
            std::fs::remove_file(&path)
        };
        if let Err(e) = removed {
            warn!(path = %path.display(), error = %e, "Failed to remove pipeline log");
        }
    }
}
