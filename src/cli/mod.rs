use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "build-image")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Build a container image from a .NET project
    Build {
        /// .NET project file, or a directory containing one, relative to the context
        #[arg(value_name = "PROJECT", default_value = ".")]
        project: PathBuf,

        /// Flavor of the base image (e.g., ubi, alpine, jammy-chiseled, or a repository)
        #[arg(short, long = "base", value_name = "FLAVOR")]
        base: Option<String>,

        /// Flavor of the SDK image, when it can't be derived from the base flavor
        #[arg(long = "sdk", value_name = "FLAVOR")]
        sdk: Option<String>,

        /// Name for the built image (e.g., registry.io/web:1.0)
        /// Can be specified multiple times
        #[arg(short, long = "tag", value_name = "IMAGE")]
        tags: Vec<String>,

        /// After the build, push the image to the repository
        #[arg(long)]
        push: bool,

        /// Write the Containerfile to this path instead of building
        #[arg(long, value_name = "FILE")]
        as_dockerfile: Option<PathBuf>,

        /// Print the Containerfile
        #[arg(long)]
        print: bool,

        /// Target architecture (x64, arm64, s390x, ppc64le)
        /// The base image needs to support the selected architecture
        #[arg(long)]
        arch: Option<String>,

        /// Context directory for the build
        #[arg(long, value_name = "DIRECTORY", default_value = ".")]
        context: PathBuf,

        /// Only use features supported by every container engine
        #[arg(long)]
        portable: bool,
    },

    /// Show version information
    Version,
}
