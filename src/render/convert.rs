//! Slide-deck to PDF conversion through an office suite
//!
//! Each conversion runs `soffice --headless --convert-to pdf` in its own
//! temporary directory with its own user profile. The converter runs in its
//! own process group, and the whole group is killed when the time budget
//! runs out. The directory is removed on every exit path.

use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::domain::ArtifactFormat;
use crate::infra::{CertificateError, Converter, Result};

pub const DEFAULT_CONVERTER_TIMEOUT: Duration = Duration::from_secs(180);

/// Binaries searched on `PATH` when none is configured
const CANDIDATE_BINARIES: &[&str] = &["soffice", "libreoffice"];

const INPUT_STEM: &str = "certificate";

#[derive(Debug, Clone)]
pub struct ConverterConfig {
    /// Explicit binary name or path
    pub binary: Option<PathBuf>,
    pub timeout: Duration,
    /// Parent directory for scratch directories (system temp dir if unset)
    pub work_root: Option<PathBuf>,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            binary: None,
            timeout: DEFAULT_CONVERTER_TIMEOUT,
            work_root: None,
        }
    }
}

/// Converter backed by a LibreOffice-compatible binary
pub struct OfficeConverter {
    config: ConverterConfig,
}

impl OfficeConverter {
    pub fn new(config: ConverterConfig) -> Self {
        Self { config }
    }

    /// Resolve the converter binary
    pub fn locate_binary(&self) -> Result<PathBuf> {
        match &self.config.binary {
            Some(binary) if binary.components().count() > 1 => {
                if binary.is_file() {
                    Ok(binary.clone())
                } else {
                    Err(CertificateError::ConverterUnavailable(format!(
                        "{} does not exist",
                        binary.display()
                    )))
                }
            }
            Some(binary) => find_on_path(binary.as_os_str()).ok_or_else(|| {
                CertificateError::ConverterUnavailable(format!(
                    "{} not found on PATH",
                    binary.display()
                ))
            }),
            None => CANDIDATE_BINARIES
                .iter()
                .find_map(|name| find_on_path(OsStr::new(name)))
                .ok_or_else(|| {
                    CertificateError::ConverterUnavailable(format!(
                        "none of {} found on PATH",
                        CANDIDATE_BINARIES.join(", ")
                    ))
                }),
        }
    }

    fn scratch_dir(&self) -> Result<tempfile::TempDir> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("cert-convert-");
        let dir = match &self.config.work_root {
            Some(root) => builder.tempdir_in(root),
            None => builder.tempdir(),
        };
        dir.map_err(|e| CertificateError::ConverterFailed(format!("scratch directory: {e}")))
    }

    async fn run(&self, binary: &Path, workdir: &Path, source: &[u8]) -> Result<Vec<u8>> {
        let input = workdir.join(format!("{INPUT_STEM}.pptx"));
        let output = workdir.join(format!("{INPUT_STEM}.pdf"));
        let profile = workdir.join("profile");

        tokio::fs::write(&input, source)
            .await
            .map_err(|e| CertificateError::ConverterFailed(format!("write input: {e}")))?;

        let mut command = Command::new(binary);
        command
            .arg("--headless")
            .arg(format!("-env:UserInstallation=file://{}", profile.display()))
            .arg("--convert-to")
            .arg("pdf")
            .arg("--outdir")
            .arg(workdir)
            .arg(&input)
            .current_dir(workdir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        #[cfg(unix)]
        command.process_group(0);

        let child = command.spawn().map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound | std::io::ErrorKind::PermissionDenied => {
                CertificateError::ConverterUnavailable(format!("{}: {e}", binary.display()))
            }
            _ => CertificateError::ConverterFailed(format!("spawn {}: {e}", binary.display())),
        })?;

        // soffice hands off to worker processes, so the direct child alone is not enough
        let pid = child.id();
        let waited = tokio::time::timeout(self.config.timeout, child.wait_with_output()).await;
        let result = match waited {
            Ok(output) => {
                output.map_err(|e| CertificateError::ConverterFailed(format!("wait: {e}")))?
            }
            Err(_) => {
                kill_process_group(pid);
                return Err(CertificateError::ConverterTimeout {
                    seconds: self.config.timeout.as_secs(),
                });
            }
        };

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            return Err(CertificateError::ConverterFailed(format!(
                "{}: {}",
                result.status,
                stderr.trim().chars().take(500).collect::<String>()
            )));
        }

        match tokio::fs::read(&output).await {
            Ok(bytes) if !bytes.is_empty() => Ok(bytes),
            Ok(_) => Err(CertificateError::ConverterFailed(
                "converter produced an empty file".to_string(),
            )),
            Err(e) => Err(CertificateError::ConverterFailed(format!(
                "converter produced no output: {e}"
            ))),
        }
    }
}

/// SIGKILL every process in the group led by `pid`
#[cfg(unix)]
fn kill_process_group(pid: Option<u32>) {
    let Some(pgid) = pid.and_then(|p| i32::try_from(p).ok()).filter(|p| *p > 0) else {
        return;
    };
    // SAFETY: kill(2) with a negative pid signals the process group and
    // touches no memory. The group id is checked positive above, so this
    // never targets our own group.
    #[allow(unsafe_code)]
    let rc = unsafe { libc::kill(-pgid, libc::SIGKILL) };
    if rc != 0 {
        debug!(
            pgid,
            error = %std::io::Error::last_os_error(),
            "Converter process group already gone"
        );
    }
}

#[cfg(not(unix))]
fn kill_process_group(_pid: Option<u32>) {}

fn find_on_path(name: &OsStr) -> Option<PathBuf> {
    let path: OsString = std::env::var_os("PATH")?;
    std::env::split_paths(&path)
        .map(|dir| dir.join(name))
        .find(|candidate| candidate.is_file())
}

#[async_trait]
impl Converter for OfficeConverter {
    async fn convert(
        &self,
        source: Vec<u8>,
        from: ArtifactFormat,
        to: ArtifactFormat,
    ) -> Result<Vec<u8>> {
        if (from, to) != (ArtifactFormat::Pptx, ArtifactFormat::Pdf) {
            return Err(CertificateError::ConverterFailed(format!(
                "unsupported conversion {from} -> {to}"
            )));
        }

        let binary = self.locate_binary()?;
        let workdir = self.scratch_dir()?;
        let started = Instant::now();
        debug!(
            binary = %binary.display(),
            workdir = %workdir.path().display(),
            "Starting conversion"
        );

        let result = self.run(&binary, workdir.path(), &source).await;

        if let Err(e) = workdir.close() {
            warn!(error = %e, "Failed to remove converter scratch directory");
        }

        match &result {
            Ok(pdf) => info!(
                elapsed_ms = started.elapsed().as_millis() as u64,
                size = pdf.len(),
                "Converted document to PDF"
            ),
            Err(e) => warn!(
                elapsed_ms = started.elapsed().as_millis() as u64,
                error = %e,
                "Document conversion failed"
            ),
        }
        result
    }
}
