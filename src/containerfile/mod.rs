//! Containerfile generation
//!
//! Produces a two-stage build: the SDK image restores and publishes the
//! project into a staging root, the runtime image copies that root over `/`.

use crate::constants::user;
use anyhow::{Context, Result};


const BUILD_HOME_DIR: &str = "/home/build";
const APP_HOME_DIR: &str = "/home/app";
const TARGET_ROOT: &str = "/rootfs";
const DEFAULT_WORKING_DIRECTORY: &str = "/app";

/// Port exposed by the application image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Port {
    pub number: String,
    pub protocol: String,
}

impl Port {
    pub fn tcp(number: impl Into<String>) -> Self {
        Self {
            number: number.into(),
            protocol: "tcp".to_string(),
        }
    }
}

/// Everything needed to generate a Containerfile
#[derive(Debug, Clone, Default)]
pub struct BuildOptions {
    pub sdk_image: Option<String>,
    pub runtime_image: Option<String>,
    /// Project path relative to the build context
    pub project_path: Option<String>,
    pub assembly_name: Option<String>,
    /// `<os>/<arch>` of the runtime stage
    pub target_platform: Option<String>,
    pub working_directory: Option<String>,
    pub environment_variables: Vec<(String, String)>,
    pub labels: Vec<(String, String)>,
    pub ports: Vec<Port>,
    pub supports_cache_mount: bool,
    pub supports_cache_mount_selinux_relabeling: bool,
    pub app_user: Option<u32>,
    pub app_group: Option<u32>,
    pub runs_as_app_user: bool,
}

/// Generate the Containerfile text for `options`.
///
/// Fails only when one of the images, the project path or the assembly name
/// is missing.
pub fn generate(options: &BuildOptions) -> Result<String> {
    let runtime_image = required(&options.runtime_image, "runtime image")?;
    let sdk_image = required(&options.sdk_image, "SDK image")?;
    let project_path = required(&options.project_path, "project path")?;
    let assembly_name = required(&options.assembly_name, "assembly name")?;

    // An explicit identity from the base image means it already has passwd entries.
    let add_app_user = options.app_user.is_none();
    let uid = options.app_user.unwrap_or(user::APP_UID);
    let gid = options.app_group.unwrap_or(user::APP_GID);
    let app_dir = options
        .working_directory
        .as_deref()
        .unwrap_or(DEFAULT_WORKING_DIRECTORY);

    let mut lines = Vec::new();

    lines.push("# Publish application".to_string());
    lines.push(format!("FROM {} AS build-env", sdk_image));
    lines.push("USER 0".to_string());

    if add_app_user {
        lines.push(format!(
            "COPY --from={} /etc/passwd /etc/group /scratch/etc/",
            runtime_image
        ));
        lines.push(format!(
            "RUN grep \":{gid}:\" /scratch/etc/group || echo \"app:x:{gid}:\" >>/scratch/etc/group && mkdir -p {root}/etc && cp /scratch/etc/group {root}/etc && \\",
            gid = gid,
            root = TARGET_ROOT
        ));
        lines.push(format!(
            "    grep \":x:{uid}:\" /scratch/etc/passwd || echo \"app:x:{uid}:{gid}::{home}:/usr/sbin/nologin\" >>/scratch/etc/passwd && mkdir -p {root}/etc && cp /scratch/etc/passwd {root}/etc",
            uid = uid,
            gid = gid,
            home = APP_HOME_DIR,
            root = TARGET_ROOT
        ));
        lines.push(format!("RUN mkdir -m 770 -p {}{}", TARGET_ROOT, APP_HOME_DIR));
    }

    lines.push(format!("ENV HOME={}", BUILD_HOME_DIR));
    lines.push("WORKDIR /src".to_string());
    lines.push("COPY . ./".to_string());
    let cache_mount = cache_mount_flag(options);
    lines.push(format!("RUN {}dotnet restore {}", cache_mount, project_path));
    lines.push(format!(
        "RUN {}dotnet publish --no-restore -c Release -o {}{} {}",
        cache_mount, TARGET_ROOT, app_dir, project_path
    ));

    let mut owned_dirs = vec![format!("{}{}", TARGET_ROOT, app_dir)];
    if add_app_user {
        owned_dirs.push(format!("{}{}", TARGET_ROOT, APP_HOME_DIR));
    }
    let owned_dirs = owned_dirs.join(" ");
    lines.push(format!(
        "RUN chown -R {}:{} {} && chmod -R g=u {}",
        uid, gid, owned_dirs, owned_dirs
    ));
    lines.push(String::new());

    lines.push("# Build application image".to_string());
    lines.push(match &options.target_platform {
        Some(platform) => format!("FROM --platform={} {}", platform, runtime_image),
        None => format!("FROM {}", runtime_image),
    });
    lines.push(format!("COPY --from=build-env {} /", TARGET_ROOT));

    let mut environment_variables = options.environment_variables.clone();
    if !options.runs_as_app_user {
        lines.push(format!("USER {}:{}", uid, gid));
        // A HOME set by the project wins.
        if !environment_variables.iter().any(|(name, _)| name == "HOME") {
            environment_variables.push(("HOME".to_string(), APP_HOME_DIR.to_string()));
        }
    }
    push_block(&mut lines, "ENV", &environment_variables);
    for port in &options.ports {
        lines.push(format!("EXPOSE {}/{}", port.number, port.protocol));
    }
    push_block(&mut lines, "LABEL", &options.labels);
    lines.push(format!("WORKDIR {}", app_dir));
    lines.push(format!(
        "ENTRYPOINT [\"dotnet\", \"{}/{}\"]",
        app_dir, assembly_name
    ));

    let mut file = lines.join("\n");
    file.push('\n');
    Ok(file)
}

fn required<'a>(value: &'a Option<String>, name: &str) -> Result<&'a str> {
    value
        .as_deref()
        .with_context(|| format!("{} is required to generate a Containerfile", name))
}

fn cache_mount_flag(options: &BuildOptions) -> String {
    if !options.supports_cache_mount {
        return String::new();
    }
    let relabel = if options.supports_cache_mount_selinux_relabeling {
        ",Z"
    } else {
        ""
    };
    format!(
        "--mount=type=cache,id=nuget,target={}/.nuget/packages{} ",
        BUILD_HOME_DIR, relabel
    )
}

/// Emit `name=value` pairs as one instruction with continuation lines,
/// aligned under the first pair.
fn push_block(lines: &mut Vec<String>, instruction: &str, pairs: &[(String, String)]) {
    let indent = " ".repeat(instruction.len() + 1);
    for (i, (name, value)) in pairs.iter().enumerate() {
        let prefix = if i == 0 {
            format!("{} ", instruction)
        } else {
            indent.clone()
        };
        let continuation = if i + 1 < pairs.len() { " \\" } else { "" };
        lines.push(format!("{}{}={}{}", prefix, name, value, continuation));
    }
}
