//! Project metadata intake
//!
//! The container settings are read from the project through the .NET SDK,
//! which evaluates the project file and prints the requested properties and
//! items as JSON.

use crate::containerfile::Port;
use crate::process::ProcessCommand;
use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::debug;

mod global_json;

pub use global_json::read_sdk_version;


const PROJECT_EXTENSIONS: [&str; 3] = ["csproj", "fsproj", "vbproj"];

const PROPERTIES: [&str; 10] = [
    "TargetFramework",
    "AssemblyName",
    "ContainerImageName",
    "ContainerRegistry",
    "ContainerImageTag",
    "ContainerImageTags",
    "ContainerBaseImage",
    "ContainerSdkImage",
    "ContainerWorkingDirectory",
    "ContainerImageArchitecture",
];

const ITEMS: [&str; 3] = [
    "ContainerEnvironmentVariable",
    "ContainerLabel",
    "ContainerPort",
];

/// Container-related settings of a project
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectInformation {
    /// Runtime version, e.g. `6.0`
    pub dotnet_version: Option<String>,
    /// File name of the entry assembly, e.g. `web.dll`
    pub assembly_name: Option<String>,
    pub image_name: Option<String>,
    pub registry: Option<String>,
    pub image_tag: Option<String>,
    pub image_tags: Vec<String>,
    pub base_image: Option<String>,
    pub sdk_image: Option<String>,
    pub working_directory: Option<String>,
    pub architecture: Option<String>,
    pub environment_variables: Vec<(String, String)>,
    pub labels: Vec<(String, String)>,
    pub ports: Vec<Port>,
}

#[derive(Debug, Default, Deserialize)]
struct MsBuildOutput {
    #[serde(rename = "Properties", default)]
    properties: HashMap<String, String>,
    #[serde(rename = "Items", default)]
    items: HashMap<String, Vec<Map<String, Value>>>,
}

impl MsBuildOutput {
    fn property(&self, name: &str) -> Option<String> {
        self.properties
            .get(name)
            .map(|value| value.trim())
            .filter(|value| !value.is_empty())
            .map(str::to_string)
    }

    /// `(Identity, metadata)` pairs of an item type
    fn items(&self, name: &str, metadata: &str) -> Vec<(String, Option<String>)> {
        self.items
            .get(name)
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| {
                        let identity = item.get("Identity")?.as_str()?.to_string();
                        let value = item
                            .get(metadata)
                            .and_then(Value::as_str)
                            .filter(|value| !value.is_empty())
                            .map(str::to_string);
                        Some((identity, value))
                    })
                    .collect()
            })
            .unwrap_or_default()
    }
}

impl ProjectInformation {
    /// Build from the JSON printed by `dotnet msbuild -getProperty:... -getItem:...`
    pub fn from_msbuild_json(json: &str) -> Result<Self> {
        let output: MsBuildOutput =
            serde_json::from_str(json).context("Failed to parse project evaluation output")?;

        let with_value = |name: &str| -> Vec<(String, String)> {
            output
                .items(name, "Value")
                .into_iter()
                .map(|(name, value)| (name, value.unwrap_or_default()))
                .collect()
        };

        Ok(Self {
            dotnet_version: output
                .property("TargetFramework")
                .and_then(|tfm| dotnet_version(&tfm)),
            assembly_name: output
                .property("AssemblyName")
                .map(|name| format!("{}.dll", name)),
            image_name: output.property("ContainerImageName"),
            registry: output.property("ContainerRegistry"),
            image_tag: output.property("ContainerImageTag"),
            image_tags: output
                .property("ContainerImageTags")
                .map(|tags| {
                    tags.split(';')
                        .map(str::trim)
                        .filter(|tag| !tag.is_empty())
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default(),
            base_image: output.property("ContainerBaseImage"),
            sdk_image: output.property("ContainerSdkImage"),
            working_directory: output.property("ContainerWorkingDirectory"),
            architecture: output.property("ContainerImageArchitecture"),
            environment_variables: with_value("ContainerEnvironmentVariable"),
            labels: with_value("ContainerLabel"),
            ports: output
                .items("ContainerPort", "Type")
                .into_iter()
                .map(|(number, protocol)| Port {
                    number,
                    protocol: protocol.unwrap_or_else(|| "tcp".to_string()),
                })
                .collect(),
        })
    }
}

/// Runtime version of a target framework moniker: `net6.0` and
/// `netcoreapp3.1` give `6.0` and `3.1`. Platform suffixes are dropped.
pub fn dotnet_version(target_framework: &str) -> Option<String> {
    let version = target_framework
        .strip_prefix("netcoreapp")
        .or_else(|| target_framework.strip_prefix("net"))?;
    let version = version.split('-').next().unwrap_or_default();
    if version.starts_with(|c: char| c.is_ascii_digit()) && version.contains('.') {
        Some(version.to_string())
    } else {
        None
    }
}

/// Reads the container settings of a project file
#[allow(async_fn_in_trait)]
pub trait ProjectReader {
    async fn read(&self, project_file: &Path) -> Result<ProjectInformation>;
}

/// Evaluates projects with `dotnet msbuild`
#[derive(Debug, Clone)]
pub struct MsBuildProjectReader {
    dotnet: String,
}

impl Default for MsBuildProjectReader {
    fn default() -> Self {
        Self {
            dotnet: "dotnet".to_string(),
        }
    }
}

impl MsBuildProjectReader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn evaluate_command(&self, project_file: &Path) -> ProcessCommand {
        ProcessCommand::new(&self.dotnet)
            .arg("msbuild")
            .arg(project_file.display().to_string())
            .args(PROPERTIES.iter().map(|p| format!("-getProperty:{}", p)))
            .args(ITEMS.iter().map(|i| format!("-getItem:{}", i)))
    }
}

impl ProjectReader for MsBuildProjectReader {
    async fn read(&self, project_file: &Path) -> Result<ProjectInformation> {
        let output = self
            .evaluate_command(project_file)
            .output()
            .await
            .context("Failed to run the .NET SDK, is dotnet installed?")?;
        if !output.success() {
            anyhow::bail!(
                "Failed to evaluate project {}: {}",
                project_file.display(),
                output.stdout.trim()
            );
        }
        debug!("Project evaluation output: {}", output.stdout);
        ProjectInformation::from_msbuild_json(&output.stdout)
    }
}

/// Locate the project file: `path` itself, or the first project file in the
/// directory `path`.
pub fn find_project_file(path: &Path) -> Result<Option<PathBuf>> {
    if path.is_file() {
        return Ok(Some(path.to_path_buf()));
    }
    if !path.is_dir() {
        return Ok(None);
    }

    let mut candidates = Vec::new();
    for entry in std::fs::read_dir(path)
        .with_context(|| format!("Failed to read directory {}", path.display()))?
    {
        let candidate = entry?.path();
        let is_project = candidate
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| PROJECT_EXTENSIONS.contains(&ext));
        if is_project && candidate.is_file() {
            candidates.push(candidate);
        }
    }
    candidates.sort();
    Ok(candidates.into_iter().next())
}
