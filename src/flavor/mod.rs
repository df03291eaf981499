//! Image flavor resolution
//!
//! Maps a short flavor string ("ubi", "alpine", "jammy-chiseled") or a full
//! repository reference, together with the runtime and SDK versions, to the
//! concrete base and build images.

use crate::constants::{registry, user};
use std::fmt;


const CHISELED_SUFFIX: &str = "-chiseled";

/// A base image descriptor, split on the first `:`
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Flavor {
    pub base_name: String,
    pub tag: Option<String>,
}

impl Flavor {
    pub fn new(flavor: &str) -> Self {
        match flavor.split_once(':') {
            Some((base_name, tag)) => Self {
                base_name: base_name.to_string(),
                tag: Some(tag.to_string()),
            },
            None => Self {
                base_name: flavor.to_string(),
                tag: None,
            },
        }
    }

    fn is_repository(&self) -> bool {
        self.base_name.contains('/')
    }
}

impl From<&str> for Flavor {
    fn from(flavor: &str) -> Self {
        Self::new(flavor)
    }
}

impl fmt::Display for Flavor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.tag {
            Some(tag) => write!(f, "{}:{}", self.base_name, tag),
            None => f.write_str(&self.base_name),
        }
    }
}

/// Images picked for a project, plus the identity the base image runs as
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedImages {
    pub base_image: String,
    pub sdk_image: String,
    pub app_user: Option<u32>,
    pub app_group: Option<u32>,
    /// The base image already switches to `app_user` on its own
    pub runs_as_app_user: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ImageKind {
    Runtime,
    Sdk,
}

/// Image vendor strategy, picked once per flavor
#[derive(Debug, Clone, PartialEq, Eq)]
enum Vendor {
    /// Red Hat UBI images
    RedHat,
    /// Microsoft images, keyed by short name (may be empty)
    Default(String),
    /// Any other repository, used as given
    Passthrough { repository: String, tag: Option<String> },
}

impl Vendor {
    fn classify(flavor: &Flavor) -> Self {
        if flavor.is_repository() {
            if is_redhat_registry(&flavor.base_name) {
                // Red Hat references go through the short-name mapping.
                return Vendor::RedHat;
            }
            return Vendor::Passthrough {
                repository: flavor.base_name.clone(),
                tag: flavor.tag.clone(),
            };
        }

        if flavor.base_name.starts_with("ubi") {
            Vendor::RedHat
        } else {
            Vendor::Default(flavor.base_name.clone())
        }
    }

    /// Short name this vendor contributes to a follow-up SDK lookup
    fn short_name(&self) -> &str {
        match self {
            Vendor::RedHat => "ubi",
            Vendor::Default(name) => name,
            Vendor::Passthrough { .. } => "",
        }
    }

    fn image(&self, version: &str, kind: ImageKind) -> String {
        match self {
            Vendor::RedHat => redhat_image(version, kind),
            Vendor::Default(name) => microsoft_image(name, version, kind),
            Vendor::Passthrough { repository, tag } => {
                format!("{}:{}", repository, tag.as_deref().unwrap_or(version))
            }
        }
    }
}

/// Resolve the runtime and SDK images for a project.
///
/// Unknown short names are not an error: they fall through to the Microsoft
/// registry with the name used as a tag suffix.
pub fn resolve(
    base_flavor: &Flavor,
    sdk_flavor: Option<&Flavor>,
    runtime_version: &str,
    sdk_version: &str,
) -> ResolvedImages {
    let base_vendor = Vendor::classify(base_flavor);
    let base_image = base_vendor.image(runtime_version, ImageKind::Runtime);

    let sdk_vendor = match sdk_flavor {
        Some(flavor) => Vendor::classify(flavor),
        None => Vendor::classify(&Flavor::new(base_vendor.short_name())),
    };
    let sdk_image = sdk_vendor.image(sdk_version, ImageKind::Sdk);

    let is_redhat = base_vendor == Vendor::RedHat;
    ResolvedImages {
        base_image,
        sdk_image,
        app_user: is_redhat.then_some(user::APP_UID),
        app_group: is_redhat.then_some(user::APP_GID),
        runs_as_app_user: is_redhat,
    }
}

fn is_redhat_registry(repository: &str) -> bool {
    let host = repository.split('/').next().unwrap_or_default();
    host.ends_with("redhat.com") || host.ends_with("redhat.io")
}

fn redhat_image(version: &str, kind: ImageKind) -> String {
    let version_no_dot = version.replace('.', "");
    let base_os = redhat_base_os(version);
    match kind {
        ImageKind::Sdk => format!(
            "{}/{}/dotnet-{}:latest",
            registry::REDHAT,
            base_os,
            version_no_dot
        ),
        ImageKind::Runtime => format!(
            "{}/{}/dotnet-{}-runtime:latest",
            registry::REDHAT,
            base_os,
            version_no_dot
        ),
    }
}

/// UBI release that carries the images for a .NET version
fn redhat_base_os(_version: &str) -> &'static str {
    "ubi8"
}

fn microsoft_image(short_name: &str, version: &str, kind: ImageKind) -> String {
    let mut name = short_name;
    if kind == ImageKind::Sdk {
        // There are no chiseled SDK images.
        name = name.strip_suffix(CHISELED_SUFFIX).unwrap_or(name);
    }

    let repository = match kind {
        // jammy-chiseled is only published on the nightly channel for 6.0.
        ImageKind::Runtime if name == "jammy-chiseled" && version == "6.0" => {
            registry::MICROSOFT_NIGHTLY_ASPNET
        }
        ImageKind::Runtime => registry::MICROSOFT_ASPNET,
        ImageKind::Sdk => registry::MICROSOFT_SDK,
    };

    if name.is_empty() {
        format!("{}:{}", repository, version)
    } else {
        format!("{}:{}-{}", repository, version, name)
    }
}
