//! printquote materials - edit the materials catalog.

use std::path::Path;
use std::process::ExitCode;

use anyhow::{bail, Result};
use clap::Subcommand;
use printquote_engine::{JsonFileMaterialStore, Material, MaterialStore};

use super::{parse_params, print_json};
use crate::{Cli, OutputFormat};

#[derive(Subcommand)]
pub enum Action {
    /// List all materials
    List,
    /// Show one material
    Get {
        /// Material id
        id: String,
    },
    /// Add or replace a material
    Put {
        /// Material id
        id: String,
        /// Display name
        #[arg(long)]
        name: String,
        /// Property as key=value (repeatable)
        #[arg(long = "prop", value_name = "KEY=VALUE")]
        properties: Vec<String>,
    },
    /// Remove a material
    Remove {
        /// Material id
        id: String,
    },
}

fn show(material: &Material) {
    println!("{}: {}", material.id, material.name);
    for (key, value) in &material.properties {
        println!("  {key} = {value}");
    }
}

pub fn run(catalog: &Path, action: &Action, cli: &Cli) -> Result<ExitCode> {
    let store = JsonFileMaterialStore::new(catalog);

    match action {
        Action::List => {
            let materials = store.list()?;
            match cli.format {
                OutputFormat::Json => print_json(&materials)?,
                OutputFormat::Text => materials.iter().for_each(show),
            }
        }
        Action::Get { id } => {
            let Some(material) = store.get(id)? else {
                bail!("no material {id:?} in {}", catalog.display());
            };
            match cli.format {
                OutputFormat::Json => print_json(&material)?,
                OutputFormat::Text => show(&material),
            }
        }
        Action::Put {
            id,
            name,
            properties,
        } => {
            let mut material = Material::new(id.as_str(), name.as_str());
            material.properties = parse_params(properties)?;
            store.put(material)?;
        }
        Action::Remove { id } => {
            if store.remove(id)?.is_none() {
                bail!("no material {id:?} in {}", catalog.display());
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}
