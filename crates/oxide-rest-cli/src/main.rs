//! oxide-rest CLI
//!
//! Command-line tool for listing, reading and writing the objects of one
//! REST resource.

mod config;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use serde_json::{Map, Value};
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use oxide_rest::{Resource, ResourceType};
use oxide_rest_client::{Client, HttpClient};

use crate::config::CliConfig;

/// Django-like access to REST resources.
#[derive(Parser)]
#[command(name = "oxide-rest")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Root URI of the API.
    #[arg(short, long, env = "OXIDE_REST_ROOT")]
    root: Option<String>,

    /// JSON configuration file with the client and resource definition.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose output.
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List objects, optionally filtered.
    List {
        /// Filters as key=value pairs.
        #[arg(value_parser = parse_pair)]
        filters: Vec<(String, Value)>,

        /// Print at most this many objects.
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Fetch one object.
    Get {
        /// Absolute or root-relative URI of the object.
        #[arg(long, conflicts_with = "params")]
        uri: Option<String>,

        /// Lookup parameters as key=value pairs.
        #[arg(value_parser = parse_pair, required_unless_present = "uri")]
        params: Vec<(String, Value)>,
    },

    /// Create an object from a JSON object.
    Create {
        /// Object data.
        data: String,
    },

    /// Update the object at URI with the fields of a JSON object.
    Update {
        /// URI of the object.
        uri: String,

        /// Fields to assign.
        data: String,
    },

    /// Delete the object at URI.
    Delete {
        /// URI of the object.
        uri: String,
    },
}

/// Parses `key=value`. Values that are valid JSON keep their type, anything
/// else is a string.
fn parse_pair(arg: &str) -> Result<(String, Value), String> {
    let (key, raw) = arg
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got {arg:?}"))?;
    if key.is_empty() {
        return Err(format!("empty key in {arg:?}"));
    }
    let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
    Ok((key.to_string(), value))
}

fn parse_object(data: &str) -> anyhow::Result<Map<String, Value>> {
    match serde_json::from_str(data).context("data is not valid JSON")? {
        Value::Object(map) => Ok(map),
        other => bail!("expected a JSON object, got {other}"),
    }
}

/// Drops keys the resource does not declare, since they would never be sent.
fn declared_only(resource: &ResourceType, mut data: Map<String, Value>) -> Map<String, Value> {
    data.retain(|key, _| {
        let declared = resource.field(key).is_some();
        if !declared {
            warn!(resource = resource.name(), field = %key, "ignoring undeclared field");
        }
        declared
    });
    data
}

fn print_resources<'a>(resources: impl IntoIterator<Item = &'a Resource>) -> anyhow::Result<()> {
    let rows: Vec<Value> = resources
        .into_iter()
        .map(|resource| Value::Object(resource.data().clone()))
        .collect();
    println!("{}", serde_json::to_string_pretty(&rows)?);
    Ok(())
}

fn print_resource(resource: &Resource) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(resource.data())?);
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr, stdout carries the JSON output
    let log_level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = CliConfig::load(cli.config.as_deref())?.with_root(cli.root);
    let client: Arc<dyn Client> = Arc::new(HttpClient::new(config.client.clone())?);
    let resource = config.resource_type(client)?;

    match cli.command {
        Commands::List { filters, limit } => {
            let mut objects = resource.objects().filter(filters);
            match limit {
                Some(limit) => {
                    let stop = limit.min(objects.count()?);
                    if stop == 0 {
                        print_resources([])?;
                    } else {
                        print_resources(objects.slice(0..stop)?)?;
                    }
                }
                None => print_resources(objects.iter()?)?,
            }
        }

        Commands::Get { uri, params } => {
            let object = match uri {
                Some(uri) => resource.objects().get_by_uri(&uri)?,
                None => resource.objects().get(params)?,
            };
            print_resource(&object)?;
        }

        Commands::Create { data } => {
            let data = declared_only(&resource, parse_object(&data)?);
            let object = resource.objects().create(data)?;
            info!("Created {object}");
            print_resource(&object)?;
        }

        Commands::Update { uri, data } => {
            let data = declared_only(&resource, parse_object(&data)?);
            let mut object = resource.objects().get_by_uri(&uri)?;
            for (name, value) in data {
                object.set(&name, value)?;
            }
            object.save()?;
            info!("Updated {object}");
            print_resource(&object)?;
        }

        Commands::Delete { uri } => {
            let object = resource.objects().get_by_uri(&uri)?;
            if let Some(body) = object.delete()? {
                println!("{}", serde_json::to_string_pretty(&body)?);
            }
            info!("Deleted {object}");
        }
    }

    Ok(())
}
