//! Build service for orchestrating the build process
//!
//! Handles reading the project, resolving images, generating the
//! Containerfile, and driving the container engine to build, tag and push.

use anyhow::{Context, Result};
use std::io::Write;
use std::path::{Component, Path, PathBuf};
use tracing::info;

use crate::{
    config::Config,
    containerfile::{self, BuildOptions},
    engine::ContainerEngine,
    flavor::{self, Flavor},
    project::{find_project_file, read_sdk_version, ProjectInformation, ProjectReader},
    service::platform::target_platform,
};

/// What the user asked for
#[derive(Debug, Clone, Default)]
pub struct BuildRequest {
    /// Project file or directory, relative to the context
    pub project: PathBuf,
    pub context: PathBuf,
    pub base_flavor: Option<String>,
    pub sdk_flavor: Option<String>,
    pub tags: Vec<String>,
    pub push: bool,
    /// Write the Containerfile here instead of building
    pub as_dockerfile: Option<PathBuf>,
    pub print: bool,
    pub arch: Option<String>,
}

/// Everything worked out before the engine is involved
#[derive(Debug, Clone)]
pub struct BuildPlan {
    pub context_dir: PathBuf,
    pub project_file: PathBuf,
    /// Image references; the first is built, the rest are tags of it
    pub images: Vec<String>,
    pub containerfile: String,
}

/// Result of a build operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildOutcome {
    /// Only the Containerfile was produced
    Generated {
        containerfile: Option<PathBuf>,
        build_command: Option<String>,
    },
    /// The image was built, and pushed if requested
    Built { images: Vec<String>, pushed: bool },
}

/// Service for orchestrating the build process
pub struct BuildService<'a, R> {
    config: &'a Config,
    engine: Option<&'a ContainerEngine>,
    reader: R,
}

impl<'a, R: ProjectReader> BuildService<'a, R> {
    pub fn new(config: &'a Config, engine: Option<&'a ContainerEngine>, reader: R) -> Self {
        Self {
            config,
            engine,
            reader,
        }
    }

    /// Generate the Containerfile and, unless only the file was asked for,
    /// build, tag and push the image.
    pub async fn run(&self, request: &BuildRequest) -> Result<BuildOutcome> {
        // Without an engine we can still hand out the Containerfile.
        let artifact_only =
            request.as_dockerfile.is_some() || (request.print && self.engine.is_none());
        let build_engine = match self.engine {
            Some(engine) if !artifact_only => Some(engine),
            None if !artifact_only => {
                anyhow::bail!("Install podman or docker to build images.")
            }
            _ => None,
        };

        let plan = self.plan(request).await?;

        if request.print {
            print!("{}", plan.containerfile);
        }

        match build_engine {
            Some(engine) => self.build_image(engine, request, &plan).await,
            None => self.write_containerfile(request, &plan),
        }
    }

    /// Read the project and generate its Containerfile.
    pub async fn plan(&self, request: &BuildRequest) -> Result<BuildPlan> {
        let context_dir = request
            .context
            .canonicalize()
            .ok()
            .filter(|dir| dir.is_dir())
            .context("The build context directory does not exist.")?;

        // The context is sent to the engine, the project has to be inside it.
        let project_path = normalize(&context_dir.join(&request.project));
        if !project_path.starts_with(&context_dir) {
            anyhow::bail!("Project must be a subdirectory of the context directory.");
        }

        let project_file = find_project_file(&project_path)?
            .and_then(|file| file.canonicalize().ok())
            .with_context(|| format!("Project {} not found.", project_path.display()))?;
        if !project_file.starts_with(&context_dir) {
            anyhow::bail!("Project must be a subdirectory of the context directory.");
        }

        let info = self.reader.read(&project_file).await?;
        let (dotnet_version, assembly_name) = match (&info.dotnet_version, &info.assembly_name) {
            (Some(version), Some(assembly)) => (version.clone(), assembly.clone()),
            (None, _) => anyhow::bail!("Cannot determine project target framework version."),
            (_, None) => anyhow::bail!("Cannot determine application assembly name."),
        };

        let platform = request
            .arch
            .as_deref()
            .or(info.architecture.as_deref())
            .map(target_platform)
            .transpose()?;

        let project_dir = project_file.parent().unwrap_or(context_dir.as_path());
        let sdk_version = read_sdk_version(project_dir).unwrap_or_else(|| dotnet_version.clone());

        let images = image_names(&request.tags, &info, self.config);
        let primary = images.first().map(String::as_str).unwrap_or_default();
        if request.as_dockerfile.is_some() {
            info!(
                "Creating Containerfile for project '{}'.",
                project_file.display()
            );
        } else {
            info!(
                "Building image '{}' from project '{}'.",
                primary,
                project_file.display()
            );
        }

        let base_flavor = request
            .base_flavor
            .clone()
            .or_else(|| info.base_image.clone())
            .or_else(|| self.config.default_flavor.clone())
            .unwrap_or_default();
        let sdk_flavor = request
            .sdk_flavor
            .as_deref()
            .or(info.sdk_image.as_deref())
            .map(Flavor::new);
        let resolved = flavor::resolve(
            &Flavor::new(&base_flavor),
            sdk_flavor.as_ref(),
            &dotnet_version,
            &sdk_version,
        );
        info!("Using runtime image {}", resolved.base_image);
        info!("Using SDK image {}", resolved.sdk_image);

        let options = BuildOptions {
            sdk_image: Some(resolved.sdk_image),
            runtime_image: Some(resolved.base_image),
            project_path: Some(relative_to(&project_file, &context_dir)),
            assembly_name: Some(assembly_name),
            target_platform: platform.map(str::to_string),
            working_directory: info.working_directory.clone(),
            environment_variables: info.environment_variables.clone(),
            labels: info.labels.clone(),
            ports: info.ports.clone(),
            supports_cache_mount: self.engine.is_some_and(|e| e.supports_cache_mount()),
            supports_cache_mount_selinux_relabeling: self
                .engine
                .is_some_and(|e| e.supports_cache_mount_selinux_relabeling()),
            app_user: resolved.app_user,
            app_group: resolved.app_group,
            runs_as_app_user: resolved.runs_as_app_user,
        };
        let containerfile = containerfile::generate(&options)?;

        Ok(BuildPlan {
            context_dir,
            project_file,
            images,
            containerfile,
        })
    }

    fn write_containerfile(
        &self,
        request: &BuildRequest,
        plan: &BuildPlan,
    ) -> Result<BuildOutcome> {
        let Some(path) = &request.as_dockerfile else {
            return Ok(BuildOutcome::Generated {
                containerfile: None,
                build_command: None,
            });
        };

        std::fs::write(path, &plan.containerfile)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        info!("Wrote Containerfile to {}", path.display());

        let primary = plan.images.first().map(String::as_str).unwrap_or_default();
        let build_command = self
            .engine
            .map(|engine| engine.build_command_line(path, primary, &plan.context_dir));
        if let Some(command) = &build_command {
            info!("To build the image, run:");
            println!("{}", command);
        }

        Ok(BuildOutcome::Generated {
            containerfile: Some(path.clone()),
            build_command,
        })
    }

    async fn build_image(
        &self,
        engine: &ContainerEngine,
        request: &BuildRequest,
        plan: &BuildPlan,
    ) -> Result<BuildOutcome> {
        let problems = engine.check_ready().await?;
        if !problems.is_empty() {
            anyhow::bail!(
                "{} is not ready to build images: {}",
                engine.kind(),
                problems.join("; ")
            );
        }

        let Some((primary, others)) = plan.images.split_first() else {
            anyhow::bail!("No image name to build.");
        };
        {
            // Removed on drop, whatever the build outcome.
            let mut containerfile = tempfile::Builder::new()
                .prefix("Containerfile.")
                .tempfile_in(&plan.context_dir)
                .context("Failed to create Containerfile")?;
            containerfile
                .write_all(plan.containerfile.as_bytes())
                .context("Failed to write Containerfile")?;

            if !engine
                .build(containerfile.path(), primary, &plan.context_dir)
                .await?
            {
                anyhow::bail!("Failed to build image.");
            }
        }
        info!("Successfully built image: {}", primary);

        for image in others {
            if !engine.tag(primary, image).await? {
                anyhow::bail!("Failed to tag image {} as {}.", primary, image);
            }
            info!("Tagged image: {}", image);
        }

        if request.push {
            for image in &plan.images {
                info!("Pushing image '{}' to repository.", image);
                if !engine.push(image).await? {
                    anyhow::bail!("Failed to push image {}.", image);
                }
            }
        }

        Ok(BuildOutcome::Built {
            images: plan.images.clone(),
            pushed: request.push,
        })
    }
}

/// Image references to produce, in order
pub fn image_names(tags: &[String], info: &ProjectInformation, config: &Config) -> Vec<String> {
    if !tags.is_empty() {
        return tags.to_vec();
    }

    let name = info
        .image_name
        .as_deref()
        .unwrap_or(&config.default_image_name);
    let repository = match &info.registry {
        Some(registry) => format!("{}/{}", registry.trim_end_matches('/'), name),
        None => name.to_string(),
    };

    let project_tags: Vec<&String> = if info.image_tags.is_empty() {
        info.image_tag.iter().collect()
    } else {
        info.image_tags.iter().collect()
    };
    if project_tags.is_empty() {
        vec![repository]
    } else {
        project_tags
            .into_iter()
            .map(|tag| format!("{}:{}", repository, tag))
            .collect()
    }
}

/// Resolve `.` and `..` without touching the filesystem
fn normalize(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other),
        }
    }
    normalized
}

/// `path` relative to `base`, with `/` separators as used inside the image
fn relative_to(path: &Path, base: &Path) -> String {
    let relative = path.strip_prefix(base).unwrap_or(path);
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
