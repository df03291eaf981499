use anyhow::Result;
use build_image::{
    cli::{Cli, Commands},
    config::Config,
    engine::{ContainerEngine, DisabledFeatures},
    project::MsBuildProjectReader,
    service::{BuildOutcome, BuildRequest, BuildService},
};
use clap::Parser;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging to stderr
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Build {
            project,
            base,
            sdk,
            tags,
            push,
            as_dockerfile,
            print,
            arch,
            context,
            portable,
        } => {
            let config = Config::load()?;

            let disabled = if portable {
                DisabledFeatures::portable()
            } else {
                config.disabled_features()
            };
            let engine = match config.engine {
                Some(kind) => ContainerEngine::detect_from(&[kind], disabled).await,
                None => ContainerEngine::detect(disabled).await,
            };
            if engine.is_none() {
                debug!("No container engine found");
            }

            let request = BuildRequest {
                project,
                context,
                base_flavor: base,
                sdk_flavor: sdk,
                tags,
                push,
                as_dockerfile,
                print,
                arch,
            };
            let service =
                BuildService::new(&config, engine.as_ref(), MsBuildProjectReader::new());

            match service.run(&request).await? {
                BuildOutcome::Generated { .. } => {}
                BuildOutcome::Built { images, pushed } => {
                    if pushed {
                        info!("Pushed {} image(s)", images.len());
                    }
                }
            }
        }
        Commands::Version => {
            println!("build-image {}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
