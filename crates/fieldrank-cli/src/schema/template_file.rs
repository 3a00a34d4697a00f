use std::{
    collections::BTreeMap,
    fs::File,
    io::{BufWriter, Write as _},
    path::{Path, PathBuf},
};

use anyhow::Context;
use fieldrank_core::{CoreError, FlatTemplate, TemplateRepository, WeightSet};

use crate::util;

/// Weight templates stored in one JSON file in flat `"Group::Metric"` form
///
/// ```json
/// {
///   "default": {
///     "groups": {"approach": 0.6, "putting": 0.4},
///     "metrics": {"approach::sg_app": 1.0, "putting::sg_putt": 1.0}
///   }
/// }
/// ```
#[derive(Debug)]
pub struct JsonTemplateRepository {
    path: PathBuf,
    templates: BTreeMap<String, FlatTemplate>,
}

impl JsonTemplateRepository {
    /// Opens `path`; a missing file is an empty repository.
    pub fn open<P>(path: P) -> anyhow::Result<Self>
    where
        P: AsRef<Path>,
    {
        let path = path.as_ref().to_owned();
        let templates = if path.exists() {
            util::read_json_file("template", &path)?
        } else {
            BTreeMap::new()
        };
        Ok(Self { path, templates })
    }

    /// Writes every template back to the file.
    pub fn save(&self) -> anyhow::Result<()> {
        let file = File::create(&self.path).with_context(|| {
            format!("Failed to create template file: {}", self.path.display())
        })?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, &self.templates).with_context(|| {
            format!("Failed to write template file: {}", self.path.display())
        })?;
        writeln!(writer)?;
        writer.flush()?;
        Ok(())
    }
}

impl TemplateRepository for JsonTemplateRepository {
    fn get(&self, name: &str) -> Result<WeightSet, CoreError> {
        let flat = self
            .templates
            .get(name)
            .ok_or_else(|| CoreError::TemplateNotFound {
                name: name.to_owned(),
            })?;
        WeightSet::nest(flat)
    }

    fn put(&mut self, name: &str, weights: WeightSet) -> Result<(), CoreError> {
        if weights.group_weights().is_empty() {
            return Err(CoreError::EmptyTemplate);
        }
        self.templates.insert(name.to_owned(), weights.flatten());
        Ok(())
    }

    fn names(&self) -> Vec<String> {
        self.templates.keys().cloned().collect()
    }
}
