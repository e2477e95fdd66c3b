//! Fetching content and skeleton repositories with `git`

use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::str::FromStr;
use tempfile::TempDir;

use crate::{Error, Result};

pub const GITHUB_ORG: &str = "https://github.com/expfactory";

/// Repositories published by the project
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RepoKind {
    Experiments,
    Surveys,
    Games,
    Battery,
    Vm,
}

impl RepoKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RepoKind::Experiments => "experiments",
            RepoKind::Surveys => "surveys",
            RepoKind::Games => "games",
            RepoKind::Battery => "battery",
            RepoKind::Vm => "vm",
        }
    }

    /// Checkout folder name, `expfactory-<kind>`
    pub fn folder_name(&self) -> String {
        format!("expfactory-{}", self.as_str())
    }

    pub fn url(&self) -> String {
        format!("{}/{}", GITHUB_ORG, self.folder_name())
    }
}

impl fmt::Display for RepoKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RepoKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "experiments" => Ok(RepoKind::Experiments),
            "surveys" => Ok(RepoKind::Surveys),
            "games" => Ok(RepoKind::Games),
            "battery" => Ok(RepoKind::Battery),
            "vm" => Ok(RepoKind::Vm),
            other => Err(Error::InvalidInput(format!("unknown repository '{}'", other))),
        }
    }
}

/// Shallow-clone `kind` into `<dest>/expfactory-<kind>`
pub fn download_repo(kind: RepoKind, dest: &Path) -> Result<PathBuf> {
    let target = dest.join(kind.folder_name());
    tracing::info!(repo = %kind.url(), dest = %target.display(), "Cloning repository");

    let output = Command::new("git")
        .arg("clone")
        .arg("--depth")
        .arg("1")
        .arg(kind.url())
        .arg(&target)
        .output()
        .map_err(|e| Error::Fetch(format!("cannot run git: {}", e)))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        tracing::error!(repo = %kind, status = %output.status, "git clone failed");
        return Err(Error::Fetch(format!(
            "git clone {} failed: {}",
            kind.url(),
            stderr.trim()
        )));
    }
    Ok(target)
}

/// Clone each repository into a fresh temporary directory
///
/// Dropping the returned directory removes the clones.
pub fn custom_battery_download(repos: &[RepoKind]) -> Result<TempDir> {
    let tmp = tempfile::Builder::new().prefix("expfactory-").tempdir()?;
    for kind in repos {
        download_repo(*kind, tmp.path())?;
    }
    Ok(tmp)
}
