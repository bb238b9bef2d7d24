//! Proto Schema CLI
//!
//! Extracts canonical schemas from `.proto` sources or descriptor sets and
//! talks to a file-backed registry.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use proto_schema_registry::api::register_schema_response::Response;
use proto_schema_registry::api::{GetSchemaRequest, RegisterSchemaRequest};
use proto_schema_registry::compile::{compile_files, find_message, load_descriptor_set};
use proto_schema_registry::{
    extract_schema_with, Checksum, FileSchemaStorage, RegistryConfig, RegistryService,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "proto-schema")]
#[command(about = "Extract canonical proto3 schemas and manage a schema registry")]
struct Cli {
    /// Explicit config file, layered over the default locations
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract the canonical schema of a message type
    Extract {
        /// Proto source files to compile
        #[arg(long, required_unless_present = "descriptor_set")]
        proto: Vec<PathBuf>,

        /// Include paths (added to the configured ones)
        #[arg(short = 'I', long = "include")]
        include: Vec<PathBuf>,

        /// Encoded FileDescriptorSet to read instead of proto sources
        #[arg(long, conflicts_with = "proto")]
        descriptor_set: Option<PathBuf>,

        /// Fully-qualified message name (e.g. v1.TestObjects)
        #[arg(short, long)]
        message: String,

        /// Refer back to the root as `record`
        #[arg(long)]
        alias_root: bool,

        /// Print the SHA-256 of the schema instead of the schema
        #[arg(long)]
        checksum: bool,

        /// Write the schema to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Register a schema file under a topic
    Register {
        #[arg(short, long)]
        topic: String,

        /// Schema file (extracted proto3 text)
        schema: PathBuf,

        /// Registry directory (overrides config)
        #[arg(long)]
        storage: Option<PathBuf>,
    },

    /// Fetch a schema by id
    Get {
        id: i64,

        /// Registry directory (overrides config)
        #[arg(long)]
        storage: Option<PathBuf>,

        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show the effective configuration
    Config,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match RegistryConfig::load_from(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(cli, config).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli, config: RegistryConfig) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Extract {
            proto,
            include,
            descriptor_set,
            message,
            alias_root,
            checksum,
            output,
        } => {
            let pool = match descriptor_set {
                Some(path) => load_descriptor_set(&std::fs::read(&path)?)?,
                None => {
                    let mut includes = config.extract.include_paths.clone();
                    includes.extend(include);
                    compile_files(&proto, &includes)?
                }
            };

            let root = find_message(&pool, &message)?;
            let mut options = config.extract.options();
            options.alias_root_references |= alias_root;

            let schema = extract_schema_with(&root, &options)?;

            if checksum {
                println!("{}", Checksum::from_text(&schema));
                return Ok(());
            }

            match output {
                Some(path) => {
                    std::fs::write(&path, &schema)?;
                    eprintln!("Wrote schema for {} to {}", message, path.display());
                }
                None => print!("{}", schema),
            }
            Ok(())
        }

        Commands::Register { topic, schema, storage } => {
            let service = open_service(storage.as_deref(), &config).await?;
            let bytes = std::fs::read(&schema)?;

            let response = service
                .register_schema(RegisterSchemaRequest { topic: topic.clone(), schema: bytes })
                .await?;

            match response.response {
                Some(Response::ResponseSuccess(success)) => {
                    println!("Registered {} as schema {}", topic, success.id);
                    Ok(())
                }
                Some(Response::ResponseError(error)) => {
                    eprintln!("Schema rejected for {}:", topic);
                    for reason in &error.errors {
                        eprintln!("  - {}", reason);
                    }
                    std::process::exit(1);
                }
                None => Err("Registry returned an empty response".into()),
            }
        }

        Commands::Get { id, storage, output } => {
            let service = open_service(storage.as_deref(), &config).await?;
            let response = service.get_schema(GetSchemaRequest { id }).await?;

            if !response.exists {
                return Err(format!("No schema with id {}", id).into());
            }

            match output {
                Some(path) => std::fs::write(&path, &response.schema)?,
                None => print!("{}", String::from_utf8_lossy(&response.schema)),
            }
            Ok(())
        }

        Commands::Config => {
            print!("{}", config.to_toml()?);
            Ok(())
        }
    }
}

async fn open_service(
    storage: Option<&Path>,
    config: &RegistryConfig,
) -> Result<RegistryService<FileSchemaStorage>, Box<dyn std::error::Error>> {
    let root = storage.map(Path::to_path_buf).unwrap_or_else(|| config.storage_path());
    let storage = FileSchemaStorage::open(root).await?;
    Ok(RegistryService::new(storage))
}
