/// Platform constants for container images
pub mod platform {
    /// Linux AMD64 platform identifier
    pub const LINUX_AMD64: &str = "linux/amd64";

    /// Linux ARM64 platform identifier
    pub const LINUX_ARM64: &str = "linux/arm64";

    /// Linux PowerPC 64 LE platform identifier
    pub const LINUX_PPC64LE: &str = "linux/ppc64le";

    /// Linux S390X platform identifier
    pub const LINUX_S390X: &str = "linux/s390x";
}

/// Container image naming constants
pub mod tag {
    /// Image name used when neither the command line nor the project names one
    pub const DEFAULT_IMAGE_NAME: &str = "dotnet-app";
}

/// User and group constants
pub mod user {
    /// UID the application runs as when the base image has no app user
    pub const APP_UID: u32 = 1001;

    /// GID the application runs as when the base image has no app group
    pub const APP_GID: u32 = 0;
}

/// Registry locations for the known image vendors
pub mod registry {
    pub const MICROSOFT_ASPNET: &str = "mcr.microsoft.com/dotnet/aspnet";
    pub const MICROSOFT_SDK: &str = "mcr.microsoft.com/dotnet/sdk";
    pub const MICROSOFT_NIGHTLY_ASPNET: &str = "mcr.microsoft.com/dotnet/nightly/aspnet";

    /// Red Hat registry host
    pub const REDHAT: &str = "registry.access.redhat.com";
}
