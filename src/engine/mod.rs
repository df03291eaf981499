//! Container engine detection and invocation
//!
//! Supports podman and docker. The engine is queried once at startup and the
//! resulting [`ContainerEngine`] is passed to whatever needs it.

use crate::process::ProcessCommand;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::ffi::OsStr;
use std::fmt;
use std::path::Path;
use tracing::{debug, info};

#[cfg(test)]
mod tests;

/// A supported container engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    Podman,
    Docker,
}

impl EngineKind {
    /// Detection order
    pub const ALL: [EngineKind; 2] = [EngineKind::Podman, EngineKind::Docker];

    pub fn command(self) -> &'static str {
        match self {
            Self::Podman => "podman",
            Self::Docker => "docker",
        }
    }
}

impl fmt::Display for EngineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.command())
    }
}

/// Client version reported by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct EngineVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl EngineVersion {
    pub fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Best-effort parse of strings like `4.3.1`, `20.10.21+dfsg1` or
    /// `24.0.0-rc.2`. Anything unreadable becomes `0.0.0`.
    pub fn parse(version: &str) -> Self {
        let version = version.trim().trim_start_matches('v');
        let mut parts = version.split('.').map(|part| {
            let digits: String = part.chars().take_while(|c| c.is_ascii_digit()).collect();
            digits.parse::<u32>().ok()
        });

        match parts.next().flatten() {
            Some(major) => Self {
                major,
                minor: parts.next().flatten().unwrap_or(0),
                patch: parts.next().flatten().unwrap_or(0),
            },
            None => Self::default(),
        }
    }
}

impl fmt::Display for EngineVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Engine features that can be switched off, e.g. for portable Containerfiles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DisabledFeatures {
    pub cache_mount: bool,
}

impl DisabledFeatures {
    pub fn none() -> Self {
        Self::default()
    }

    /// Everything that not every engine supports
    pub fn portable() -> Self {
        Self { cache_mount: true }
    }
}

#[derive(Debug, Deserialize)]
struct DockerInfo {
    #[serde(rename = "ServerErrors", default)]
    server_errors: Vec<String>,
}

/// A detected container engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerEngine {
    kind: EngineKind,
    version: EngineVersion,
    disabled: DisabledFeatures,
    /// Executable to run, the bare command name unless found in a custom search path
    program: String,
}

impl ContainerEngine {
    pub fn new(kind: EngineKind, version: EngineVersion, disabled: DisabledFeatures) -> Self {
        Self {
            kind,
            version,
            disabled,
            program: kind.command().to_string(),
        }
    }

    /// Run `program` instead of looking the engine up in `PATH`.
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    /// Try podman, then docker. Returns `None` when neither answers.
    pub async fn detect(disabled: DisabledFeatures) -> Option<Self> {
        Self::detect_from(&EngineKind::ALL, disabled).await
    }

    /// Try the given engines in order, the first one that answers wins.
    pub async fn detect_from(
        candidates: &[EngineKind],
        disabled: DisabledFeatures,
    ) -> Option<Self> {
        for &kind in candidates {
            if which::which(kind.command()).is_err() {
                debug!("{} not found in PATH", kind);
                continue;
            }
            if let Some(engine) = Self::query_version(kind, kind.command(), disabled).await {
                return Some(engine);
            }
        }
        None
    }

    /// Like [`ContainerEngine::detect_from`], searching `search_path` instead
    /// of `PATH`. The engines found run from their full path.
    pub async fn detect_in(
        candidates: &[EngineKind],
        disabled: DisabledFeatures,
        search_path: impl AsRef<OsStr>,
    ) -> Option<Self> {
        let cwd = std::env::current_dir().ok()?;
        for &kind in candidates {
            let Ok(program) = which::which_in(kind.command(), Some(search_path.as_ref()), &cwd)
            else {
                debug!("{} not found in search path", kind);
                continue;
            };
            let program = program.display().to_string();
            if let Some(engine) = Self::query_version(kind, &program, disabled).await {
                return Some(engine.with_program(program));
            }
        }
        None
    }

    /// Ask `program` for its client version.
    ///
    /// A client that prints its version counts even when the command fails,
    /// docker does that when the daemon is down. Daemon health is left to
    /// [`ContainerEngine::check_ready`].
    async fn query_version(
        kind: EngineKind,
        program: &str,
        disabled: DisabledFeatures,
    ) -> Option<Self> {
        let version_command =
            ProcessCommand::new(program).args(["version", "--format", "{{.Client.Version}}"]);
        match version_command.output().await {
            Ok(output) => {
                let version = EngineVersion::parse(&output.stdout);
                if output.success() || version != EngineVersion::default() {
                    info!("Using {} {}", kind, version);
                    return Some(Self::new(kind, version, disabled));
                }
                debug!("{} version exited with code {}", kind, output.exit_code);
                None
            }
            Err(e) => {
                debug!("Failed to query {}: {:#}", kind, e);
                None
            }
        }
    }

    pub fn kind(&self) -> EngineKind {
        self.kind
    }

    pub fn version(&self) -> EngineVersion {
        self.version
    }

    pub fn supports_cache_mount(&self) -> bool {
        if self.disabled.cache_mount {
            return false;
        }
        match self.kind {
            EngineKind::Docker => true,
            EngineKind::Podman => self.version.major >= 4,
        }
    }

    pub fn supports_cache_mount_selinux_relabeling(&self) -> bool {
        self.supports_cache_mount() && self.kind == EngineKind::Podman
    }

    fn command(&self) -> ProcessCommand {
        ProcessCommand::new(&self.program)
    }

    pub fn build_command(
        &self,
        containerfile: &Path,
        tag: &str,
        context_dir: &Path,
    ) -> ProcessCommand {
        let mut cmd = self.command().args([
            "build".to_string(),
            "-f".to_string(),
            containerfile.display().to_string(),
            "-t".to_string(),
            tag.to_string(),
            context_dir.display().to_string(),
        ]);
        if self.kind == EngineKind::Docker && self.supports_cache_mount() {
            // Mount-cache syntax needs BuildKit.
            cmd = cmd.env("DOCKER_BUILDKIT", "1");
        }
        cmd
    }

    /// The build command as a user would type it
    pub fn build_command_line(
        &self,
        containerfile: &Path,
        tag: &str,
        context_dir: &Path,
    ) -> String {
        self.build_command(containerfile, tag, context_dir).to_string()
    }

    pub fn tag_command(&self, source: &str, target: &str) -> ProcessCommand {
        self.command().args(["tag", source, target])
    }

    pub fn push_command(&self, tag: &str) -> ProcessCommand {
        self.command().args(["push", tag])
    }

    pub async fn build(
        &self,
        containerfile: &Path,
        tag: &str,
        context_dir: &Path,
    ) -> Result<bool> {
        let code = self
            .build_command(containerfile, tag, context_dir)
            .execute()
            .await?;
        Ok(code == 0)
    }

    pub async fn tag(&self, source: &str, target: &str) -> Result<bool> {
        let code = self.tag_command(source, target).execute().await?;
        Ok(code == 0)
    }

    pub async fn push(&self, tag: &str) -> Result<bool> {
        let code = self.push_command(tag).execute().await?;
        Ok(code == 0)
    }

    /// Check that the engine can actually run builds.
    ///
    /// Returns the problems the engine reports, empty when it is ready.
    pub async fn check_ready(&self) -> Result<Vec<String>> {
        match self.kind {
            EngineKind::Docker => {
                let output = self
                    .command()
                    .args(["info", "--format", "{{json .}}"])
                    .output()
                    .await?;
                let mut errors = parse_server_errors(&output.stdout)?;
                if errors.is_empty() && !output.success() {
                    errors.push(non_empty_or(&output.stderr, "docker info failed"));
                }
                Ok(errors)
            }
            EngineKind::Podman => {
                let output = self.command().arg("info").output().await?;
                if output.success() {
                    Ok(Vec::new())
                } else {
                    Ok(vec![non_empty_or(&output.stderr, "podman info failed")])
                }
            }
        }
    }
}

/// Extract `ServerErrors` from `docker info` JSON output
fn parse_server_errors(info: &str) -> Result<Vec<String>> {
    let info = info.trim();
    if info.is_empty() {
        return Ok(Vec::new());
    }
    let info: DockerInfo =
        serde_json::from_str(info).context("Failed to parse docker info output")?;
    Ok(info.server_errors)
}

fn non_empty_or(message: &str, fallback: &str) -> String {
    let message = message.trim();
    if message.is_empty() {
        fallback.to_string()
    } else {
        message.to_string()
    }
}
