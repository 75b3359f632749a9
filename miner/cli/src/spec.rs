use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Deserialize;
use quarry::Parameters;

/// The specification of one mining job, parsed directly from a TOML file.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MineSpec {
    /// The `^`-separated ontology schema file
    pub schema: PathBuf,
    /// Directory containing one `<user>.triples` file per user
    pub triples_dir: PathBuf,
    /// Directory the per-user result files are written to
    pub output_dir: PathBuf,

    /// The class whose individuals root the transactions
    pub start_class: String,
    /// The classes at which a schema path may end
    pub end_classes: Vec<String>,
    /// Classes abstracted to the class itself before isomorphism testing
    #[serde(default)]
    pub option_classes: Vec<String>,
    /// The maximum number of properties in a schema path
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
}

impl MineSpec {
    /// Reads a `MineSpec` from a TOML file.
    pub fn read_from_file(path: &Path) -> anyhow::Result<Self> {
        let spec_toml = std::fs::read_to_string(path)
            .with_context(|| format!("Can't read spec file {:?}", path))?;
        toml::from_str(&spec_toml).with_context(|| format!("Can't parse spec file {:?}", path))
    }

    /// The mining parameters described by this spec.
    pub fn parameters(&self) -> Parameters {
        Parameters {
            start_class: self.start_class.clone(),
            end_classes: self.end_classes.clone(),
            option_classes: self.option_classes.clone(),
            max_depth: self.max_depth,
        }
    }
}

fn default_max_depth() -> usize {
    10
}
