//! State persistence for the .git/strata/ directory.

use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use strata_git::Oid;

use crate::error::{Error, Result};
use crate::traits::{BranchRecord, BranchStore, ChangeRecord, Continuation, UpdateRequest};

/// File-backed [`BranchStore`] living in `.git/strata/`.
///
/// Branch state is a single JSON document rewritten atomically on every
/// update. Every update also appends a line to a plain-text log so the
/// history of changes can be inspected.
#[derive(Debug)]
pub struct State {
    /// Path to the .git/strata/ directory.
    strata_dir: PathBuf,
    /// Trunk as of the last `open` or `init`.
    trunk: String,
}

impl State {
    /// File names within .git/strata/
    const STATE_FILE: &'static str = "state.json";
    const LOG_FILE: &'static str = "log";
    const CONTINUE_FILE: &'static str = "continue.json";
    const CONFIG_FILE: &'static str = "config.toml";

    /// Initialize (or re-initialize) strata in the repository at `git_dir`.
    ///
    /// Re-initializing keeps tracked branches and only changes trunk and remote.
    ///
    /// # Errors
    /// Returns error if the directory or state file cannot be written.
    pub fn init(git_dir: impl AsRef<Path>, trunk: &str, remote: Option<&str>) -> Result<Self> {
        let strata_dir = git_dir.as_ref().join("strata");
        fs::create_dir_all(&strata_dir)?;

        let mut state = Self {
            strata_dir,
            trunk: trunk.to_string(),
        };

        let mut file = if state.is_initialized() {
            state.read()?
        } else {
            StateFile::default()
        };
        file.trunk = trunk.to_string();
        file.remote = remote.map(String::from);
        // Trunk can never be tracked.
        file.branches.remove(trunk);

        state.write(&file)?;
        state.append_log(&format!("initialize with trunk {trunk}"))?;
        state.trunk = file.trunk;
        Ok(state)
    }

    /// Open the state of an initialized repository.
    ///
    /// # Errors
    /// Returns [`Error::NotInitialized`] if `strata init` was never run.
    pub fn open(git_dir: impl AsRef<Path>) -> Result<Self> {
        let mut state = Self {
            strata_dir: git_dir.as_ref().join("strata"),
            trunk: String::new(),
        };
        if !state.is_initialized() {
            return Err(Error::NotInitialized);
        }

        state.trunk = state.read()?.trunk;
        Ok(state)
    }

    /// Check if strata is initialized at this location.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.state_path().exists()
    }

    /// Get the path to the strata directory.
    #[must_use]
    pub fn strata_dir(&self) -> &Path {
        &self.strata_dir
    }

    /// Path of the optional configuration file.
    #[must_use]
    pub fn config_path(&self) -> PathBuf {
        self.strata_dir.join(Self::CONFIG_FILE)
    }

    /// Remote recorded at init time.
    ///
    /// # Errors
    /// Returns error if the state file cannot be read.
    pub fn remote(&self) -> Result<Option<String>> {
        Ok(self.read()?.remote)
    }

    /// Entries of the state log, oldest first.
    ///
    /// # Errors
    /// Returns error if the log exists but cannot be read.
    pub fn history(&self) -> Result<Vec<LogEntry>> {
        let path = self.strata_dir.join(Self::LOG_FILE);
        if !path.exists() {
            return Ok(Vec::new());
        }

        fs::read_to_string(&path)?
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| {
                let (at, message) = line.split_once(' ').unwrap_or((line, ""));
                let at = DateTime::parse_from_rfc3339(at)
                    .map_err(|e| Error::StateParseError {
                        file: path.clone(),
                        message: e.to_string(),
                    })?
                    .with_timezone(&Utc);
                Ok(LogEntry {
                    at,
                    message: message.to_string(),
                })
            })
            .collect()
    }

    // === State file ===

    fn state_path(&self) -> PathBuf {
        self.strata_dir.join(Self::STATE_FILE)
    }

    fn read(&self) -> Result<StateFile> {
        let path = self.state_path();
        let content = fs::read_to_string(&path)?;
        serde_json::from_str(&content).map_err(|e| Error::StateParseError {
            file: path,
            message: e.to_string(),
        })
    }

    fn write(&self, file: &StateFile) -> Result<()> {
        write_atomic(&self.state_path(), &serde_json::to_string_pretty(file)?)
    }

    fn append_log(&self, message: &str) -> Result<()> {
        let mut log = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.strata_dir.join(Self::LOG_FILE))?;
        writeln!(log, "{} {}", Utc::now().to_rfc3339(), message.replace('\n', " "))?;
        Ok(())
    }

    // === Continuations ===

    fn continue_path(&self) -> PathBuf {
        self.strata_dir.join(Self::CONTINUE_FILE)
    }

    fn read_continuations(&self) -> Result<Vec<Continuation>> {
        let path = self.continue_path();
        if !path.exists() {
            return Ok(Vec::new());
        }
        let content = fs::read_to_string(path)?;
        let file: ContinueFile = serde_json::from_str(&content)?;
        Ok(file.continuations)
    }

    fn write_continuations(&self, continuations: Vec<Continuation>) -> Result<()> {
        let path = self.continue_path();
        if continuations.is_empty() {
            if path.exists() {
                fs::remove_file(path)?;
            }
            return Ok(());
        }
        let content = serde_json::to_string_pretty(&ContinueFile { continuations })?;
        write_atomic(&path, &content)
    }
}

impl BranchStore for State {
    fn trunk(&self) -> &str {
        &self.trunk
    }

    fn lookup(&self, name: &str) -> Result<BranchRecord> {
        let mut file = self.read()?;
        let entry = file
            .branches
            .remove(name)
            .ok_or_else(|| Error::NotTracked(name.to_string()))?;
        entry.into_record(name, &self.state_path())
    }

    fn list(&self) -> Result<Vec<String>> {
        Ok(self.read()?.branches.into_keys().collect())
    }

    fn update(&self, req: UpdateRequest) -> Result<()> {
        if req.is_empty() {
            return Ok(());
        }

        let mut file = self.read()?;
        for (name, record) in req.sets {
            file.branches.insert(name, BranchEntry::from(record));
        }
        for name in &req.deletes {
            file.branches.remove(name);
        }
        self.write(&file)?;

        let message = if req.message.is_empty() {
            "update"
        } else {
            req.message.as_str()
        };
        self.append_log(message)
    }

    fn append_continuation(&self, cont: Continuation) -> Result<()> {
        let mut continuations = self.read_continuations()?;
        continuations.push(cont);
        self.write_continuations(continuations)
    }

    fn take_continuation(&self) -> Result<Option<Continuation>> {
        let mut continuations = self.read_continuations()?;
        if continuations.is_empty() {
            return Ok(None);
        }
        let first = continuations.remove(0);
        self.write_continuations(continuations)?;
        Ok(Some(first))
    }

    fn clear_continuations(&self) -> Result<usize> {
        let dropped = self.read_continuations()?.len();
        self.write_continuations(Vec::new())?;
        Ok(dropped)
    }
}

/// One line of the state log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogEntry {
    /// When the update was committed.
    pub at: DateTime<Utc>,
    /// What the update did.
    pub message: String,
}

/// Write through a temporary file so readers never see a partial document.
fn write_atomic(path: &Path, content: &str) -> Result<()> {
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, content)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

// === On-disk format ===

#[derive(Debug, Default, Serialize, Deserialize)]
struct StateFile {
    trunk: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    remote: Option<String>,
    #[serde(default)]
    branches: BTreeMap<String, BranchEntry>,
}

#[derive(Debug, Serialize, Deserialize)]
struct BranchEntry {
    base: BaseEntry,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    upstream: Option<UpstreamEntry>,
    /// Single-key map from forge ID to its metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    change: Option<BTreeMap<String, Value>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    merged: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct BaseEntry {
    name: String,
    #[serde(default)]
    hash: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct UpstreamEntry {
    branch: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct ContinueFile {
    #[serde(default)]
    continuations: Vec<Continuation>,
}

impl BranchEntry {
    fn into_record(self, name: &str, file: &Path) -> Result<BranchRecord> {
        let base_hash = if self.base.hash.is_empty() {
            Oid::zero()
        } else {
            Oid::from_str(&self.base.hash).map_err(|e| Error::StateParseError {
                file: file.to_path_buf(),
                message: format!("branch {name}: bad base hash: {e}"),
            })?
        };

        let change = self
            .change
            .and_then(|map| map.into_iter().next())
            .map(|(forge, metadata)| ChangeRecord { forge, metadata });

        Ok(BranchRecord {
            base: self.base.name,
            base_hash,
            upstream_branch: self.upstream.map(|u| u.branch),
            change,
            merged_downstack: self.merged,
        })
    }
}

impl From<BranchRecord> for BranchEntry {
    fn from(record: BranchRecord) -> Self {
        let hash = if record.base_hash.is_zero() {
            String::new()
        } else {
            record.base_hash.to_string()
        };

        Self {
            base: BaseEntry {
                name: record.base,
                hash,
            },
            upstream: record
                .upstream_branch
                .map(|branch| UpstreamEntry { branch }),
            change: record
                .change
                .map(|c| BTreeMap::from([(c.forge, c.metadata)])),
            merged: record.merged_downstack,
        }
    }
}
