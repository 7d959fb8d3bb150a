use needfinder_core::{AppConfig, ReportError};
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::report::RenderedReport;

/// Writes both report files or neither.
///
/// Each artefact goes to a `*.tmp` sibling first; the final names only appear
/// once both temporary files are complete.
#[derive(Debug, Clone)]
pub struct ReportWriter {
    markdown_path: PathBuf,
    snapshot_path: PathBuf,
}

impl ReportWriter {
    pub fn new(markdown_path: impl Into<PathBuf>, snapshot_path: impl Into<PathBuf>) -> Self {
        Self {
            markdown_path: markdown_path.into(),
            snapshot_path: snapshot_path.into(),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.markdown_path(), config.snapshot_path())
    }

    pub fn markdown_path(&self) -> &Path {
        &self.markdown_path
    }

    pub fn snapshot_path(&self) -> &Path {
        &self.snapshot_path
    }

    pub fn write(&self, report: &RenderedReport) -> Result<(), ReportError> {
        let targets = [
            (&self.markdown_path, report.markdown.as_str()),
            (&self.snapshot_path, report.snapshot_json.as_str()),
        ];

        let mut staged: Vec<(PathBuf, &PathBuf)> = Vec::with_capacity(targets.len());
        for (path, contents) in targets {
            match stage(path, contents) {
                Ok(tmp) => staged.push((tmp, path)),
                Err(e) => {
                    discard(&staged);
                    return Err(e);
                }
            }
        }

        for (index, (tmp, path)) in staged.iter().enumerate() {
            if let Err(e) = fs::rename(tmp, path) {
                discard(&staged[index..]);
                return Err(ReportError::WriteFailed {
                    path: path.display().to_string(),
                    reason: e.to_string(),
                });
            }
        }

        info!(
            "Report written to {} and {}",
            self.markdown_path.display(),
            self.snapshot_path.display()
        );
        Ok(())
    }
}

fn stage(path: &Path, contents: &str) -> Result<PathBuf, ReportError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| ReportError::OutputDirectory {
            path: parent.display().to_string(),
            reason: e.to_string(),
        })?;
    }

    let tmp = temp_path(path)?;
    fs::write(&tmp, contents).map_err(|e| ReportError::WriteFailed {
        path: tmp.display().to_string(),
        reason: e.to_string(),
    })?;
    Ok(tmp)
}

fn temp_path(path: &Path) -> Result<PathBuf, ReportError> {
    let name = path.file_name().ok_or_else(|| ReportError::WriteFailed {
        path: path.display().to_string(),
        reason: "not a file path".to_string(),
    })?;
    let mut tmp_name = OsString::from(name);
    tmp_name.push(".tmp");
    Ok(path.with_file_name(tmp_name))
}

fn discard(staged: &[(PathBuf, &PathBuf)]) {
    for (tmp, _) in staged {
        if let Err(e) = fs::remove_file(tmp) {
            warn!("Could not remove {}: {}", tmp.display(), e);
        }
    }
}
