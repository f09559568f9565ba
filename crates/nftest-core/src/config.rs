//! YAML test file schema.
//!
//! ```yaml
//! global:
//!   temp_dir: ./test/work
//!   nf_config: test/global.config
//! cases:
//!   - name: align
//!     nf_script: ./main.nf
//!     asserts:
//!       - actual: sample/*.bam
//!         expect: test/expected/sample.bam
//!         method: checksum
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::assertion::{AssertMethod, Assertion};
use crate::error::{HarnessError, Result};

/// File names searched, in order, when no test file is given.
pub const DEFAULT_CONFIG_NAMES: &[&str] = &["nftest.yaml", "nftest.yml"];

fn default_true() -> bool {
    true
}

fn default_method() -> String {
    "checksum".to_string()
}

fn default_output_param() -> String {
    "output_dir".to_string()
}

/// A whole test file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TestFile {
    pub global: GlobalConfig,
    #[serde(default)]
    pub cases: Vec<CaseConfig>,
}

/// Settings shared by every case.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GlobalConfig {
    pub temp_dir: PathBuf,
    #[serde(default)]
    pub nf_config: Option<PathBuf>,
    #[serde(default = "default_true")]
    pub remove_temp: bool,
    #[serde(default = "default_true")]
    pub clean_logs: bool,
}

/// One test case.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CaseConfig {
    pub name: String,
    #[serde(default)]
    pub message: Option<String>,
    pub nf_script: PathBuf,
    #[serde(default)]
    pub nf_config: Option<PathBuf>,
    #[serde(default)]
    pub profiles: Vec<String>,
    #[serde(default)]
    pub params_file: Option<PathBuf>,
    /// `[param_name, path]` pairs passed as `--param_name path`.
    #[serde(default)]
    pub reference_params: Vec<(String, PathBuf)>,
    #[serde(default = "default_output_param")]
    pub output_directory_param_name: String,
    #[serde(default)]
    pub asserts: Vec<AssertConfig>,
    #[serde(default)]
    pub temp_dir: Option<PathBuf>,
    #[serde(default)]
    pub remove_temp: Option<bool>,
    #[serde(default)]
    pub clean_logs: Option<bool>,
    #[serde(default)]
    pub skip: bool,
    /// Accepted so existing test files keep loading. Has no effect: pipeline
    /// output is always relayed, and `--verbose`/`NFT_LOG_LEVEL` decide what
    /// the console shows.
    #[serde(default)]
    pub verbose: bool,
}

/// One declared file comparison.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AssertConfig {
    /// Glob, relative to the case's output directory.
    pub actual: String,
    pub expect: String,
    #[serde(default = "default_method")]
    pub method: String,
    #[serde(default)]
    pub script: Option<PathBuf>,
}

impl AssertConfig {
    /// Build a fresh assertion rooted at `case_output_dir`.
    ///
    /// The assertion's freshness baseline is "now", so this must be called
    /// for every pipeline run.
    pub fn build(&self, case_output_dir: &Path) -> Assertion {
        let actual = case_output_dir.join(&self.actual);
        Assertion::new(
            actual.to_string_lossy().into_owned(),
            self.expect.clone(),
            AssertMethod::from_config(&self.method, self.script.clone()),
        )
    }
}

impl TestFile {
    /// Read and parse a test file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| HarnessError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content, path)
    }

    /// Parse test file contents; `path` is only used in errors.
    pub fn parse(content: &str, path: &Path) -> Result<Self> {
        serde_yaml::from_str(content).map_err(|source| HarnessError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Pick `explicit` if given, else the first default name that exists in `dir`.
pub fn find_config(explicit: Option<PathBuf>, dir: &Path) -> Option<PathBuf> {
    explicit.or_else(|| {
        DEFAULT_CONFIG_NAMES
            .iter()
            .map(|name| dir.join(name))
            .find(|candidate| candidate.exists())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
global:
  temp_dir: ./work
  nf_config: test/global.config
  remove_temp: false
cases:
  - name: align sample
    message: align one sample
    nf_script: ./main.nf
    nf_config: test/align.config
    profiles: [docker, test]
    reference_params:
      - [reference, /ref/genome.fa]
    asserts:
      - actual: sample/*.bam
        expect: test/expected/sample.bam
      - actual: sample/report.txt
        expect: test/expected/report.txt
        script: test/compare.sh
  - name: skipped
    nf_script: ./main.nf
    skip: true
"#;

    #[test]
    fn test_parse_sample() {
        let file = TestFile::parse(SAMPLE, Path::new("nftest.yml")).unwrap();
        assert_eq!(file.global.temp_dir, PathBuf::from("./work"));
        assert!(!file.global.remove_temp);
        assert!(file.global.clean_logs);
        assert_eq!(file.cases.len(), 2);

        let case = &file.cases[0];
        assert_eq!(case.profiles, vec!["docker", "test"]);
        assert_eq!(
            case.reference_params,
            vec![("reference".to_string(), PathBuf::from("/ref/genome.fa"))]
        );
        assert_eq!(case.output_directory_param_name, "output_dir");
        assert_eq!(case.asserts[0].method, "checksum");
        assert_eq!(case.asserts[1].script, Some(PathBuf::from("test/compare.sh")));
        assert!(file.cases[1].skip);
        assert!(file.cases[1].remove_temp.is_none());
    }

    #[test]
    fn test_build_assertion_roots_actual() {
        let config = AssertConfig {
            actual: "sample/*.bam".to_string(),
            expect: "expected.bam".to_string(),
            method: "md5".to_string(),
            script: None,
        };
        let assertion = config.build(Path::new("/out/align"));
        assert_eq!(assertion.actual_pattern(), "/out/align/sample/*.bam");
        assert_eq!(assertion.expect_pattern(), "expected.bam");
        assert_eq!(assertion.method(), &AssertMethod::Checksum);
    }

    #[test]
    fn test_invalid_yaml_is_parse_error() {
        let err = TestFile::parse("global: [", Path::new("bad.yml")).unwrap_err();
        assert!(matches!(err, HarnessError::ConfigParse { .. }));
        assert!(err.to_string().contains("bad.yml"));
    }

    #[test]
    fn test_find_config_prefers_yaml() {
        let dir = tempfile::tempdir().unwrap();
        assert!(find_config(None, dir.path()).is_none());

        std::fs::write(dir.path().join("nftest.yml"), "").unwrap();
        assert_eq!(find_config(None, dir.path()), Some(dir.path().join("nftest.yml")));

        std::fs::write(dir.path().join("nftest.yaml"), "").unwrap();
        assert_eq!(find_config(None, dir.path()), Some(dir.path().join("nftest.yaml")));

        let explicit = PathBuf::from("custom.yml");
        assert_eq!(find_config(Some(explicit.clone()), dir.path()), Some(explicit));
    }
}
