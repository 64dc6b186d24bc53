//! CLI subcommands: network, app-cluster.

use crate::core::config::{parse_config_file, ClusterConfig, NetworkConfig};
use crate::core::emitter::Document;
use crate::core::naming::Tier;
use crate::stacks::{app_cluster, network, Payloads};
use clap::{Subcommand, ValueEnum};
use std::path::{Path, PathBuf};

/// Serialization of the emitted document.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Format {
    #[default]
    Json,
    Yaml,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Emit the network topology template (VPC, gateway, routing, subnets)
    Network {
        /// YAML file overriding the built-in defaults
        #[arg(short, long)]
        config: Option<PathBuf>,

        #[arg(short, long, value_enum, default_value_t = Format::Json)]
        format: Format,

        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Emit the application cluster template (load balancer, tiers, alarms)
    AppCluster {
        /// Boot script for SPA instances
        #[arg(long, default_value = "user_data_spa.sh")]
        spa_user_data: PathBuf,

        /// Boot script for API instances
        #[arg(long, default_value = "user_data_api.sh")]
        api_user_data: PathBuf,

        /// Boot script for admin instances, when the admin tier does not reuse another's
        #[arg(long)]
        admin_user_data: Option<PathBuf>,

        /// YAML file overriding the built-in defaults
        #[arg(short, long)]
        config: Option<PathBuf>,

        #[arg(short, long, value_enum, default_value_t = Format::Json)]
        format: Format,

        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// Dispatch a CLI command.
pub fn dispatch(cmd: Commands) -> Result<(), String> {
    match cmd {
        Commands::Network {
            config,
            format,
            output,
        } => cmd_network(config.as_deref(), format, output.as_deref()),
        Commands::AppCluster {
            spa_user_data,
            api_user_data,
            admin_user_data,
            config,
            format,
            output,
        } => {
            let scripts = ScriptPaths {
                spa: spa_user_data,
                api: api_user_data,
                admin: admin_user_data,
            };
            cmd_app_cluster(&scripts, config.as_deref(), format, output.as_deref())
        }
    }
}

/// Boot script locations by tier.
struct ScriptPaths {
    spa: PathBuf,
    api: PathBuf,
    admin: Option<PathBuf>,
}

impl ScriptPaths {
    fn path(&self, tier: Tier) -> Option<&Path> {
        match tier {
            Tier::Spa => Some(&self.spa),
            Tier::Api => Some(&self.api),
            Tier::Admin => self.admin.as_deref(),
        }
    }
}

fn load_or_default<T: Default + serde::de::DeserializeOwned>(
    path: Option<&Path>,
) -> Result<T, String> {
    match path {
        Some(p) => parse_config_file(p).map_err(|e| e.to_string()),
        None => Ok(T::default()),
    }
}

fn cmd_network(config: Option<&Path>, format: Format, output: Option<&Path>) -> Result<(), String> {
    let config: NetworkConfig = load_or_default(config)?;
    let doc = network::document(&config).map_err(|e| e.to_string())?;
    write_document(&doc, format, output)
}

fn cmd_app_cluster(
    scripts: &ScriptPaths,
    config: Option<&Path>,
    format: Format,
    output: Option<&Path>,
) -> Result<(), String> {
    let config: ClusterConfig = load_or_default(config)?;

    // Only the scripts some tier actually runs are read
    let mut sources = Vec::new();
    for tier in config.script_sources() {
        let path = scripts
            .path(tier)
            .ok_or_else(|| format!("tier '{}' needs a boot script: pass --{}-user-data", tier, tier))?;
        sources.push((tier, path));
    }
    let payloads = Payloads::read(&sources).map_err(|e| e.to_string())?;

    let doc = app_cluster::document(&config, &payloads).map_err(|e| e.to_string())?;
    write_document(&doc, format, output)
}

fn render(doc: &Document, format: Format) -> Result<String, String> {
    let text = match format {
        Format::Json => doc.to_json(),
        Format::Yaml => doc.to_yaml(),
    };
    text.map_err(|e| e.to_string())
}

fn write_document(doc: &Document, format: Format, output: Option<&Path>) -> Result<(), String> {
    let text = render(doc, format)?;
    match output {
        Some(path) => std::fs::write(path, text)
            .map_err(|e| format!("cannot write {}: {}", path.display(), e)),
        None => {
            println!("{}", text);
            Ok(())
        }
    }
}
