use std::collections::BTreeMap;

use crate::{CoreError, WeightSet};

/// Named storage for weight templates.
///
/// The engine only reads and writes whole [`WeightSet`]s through this trait;
/// how they are persisted is up to the implementation.
pub trait TemplateRepository {
    fn get(&self, name: &str) -> Result<WeightSet, CoreError>;

    fn put(&mut self, name: &str, weights: WeightSet) -> Result<(), CoreError>;

    fn names(&self) -> Vec<String>;
}

/// Template repository kept in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryTemplateRepository {
    templates: BTreeMap<String, WeightSet>,
}

impl InMemoryTemplateRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Consumes the repository, returning its templates.
    #[must_use]
    pub fn into_templates(self) -> BTreeMap<String, WeightSet> {
        self.templates
    }
}

impl FromIterator<(String, WeightSet)> for InMemoryTemplateRepository {
    fn from_iter<I: IntoIterator<Item = (String, WeightSet)>>(iter: I) -> Self {
        Self {
            templates: iter.into_iter().collect(),
        }
    }
}

impl TemplateRepository for InMemoryTemplateRepository {
    fn get(&self, name: &str) -> Result<WeightSet, CoreError> {
        self.templates
            .get(name)
            .cloned()
            .ok_or_else(|| CoreError::TemplateNotFound {
                name: name.to_owned(),
            })
    }

    fn put(&mut self, name: &str, weights: WeightSet) -> Result<(), CoreError> {
        if weights.group_weights().is_empty() {
            return Err(CoreError::EmptyTemplate);
        }
        tracing::debug!(name, "storing weight template");
        self.templates.insert(name.to_owned(), weights);
        Ok(())
    }

    fn names(&self) -> Vec<String> {
        self.templates.keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::WeightMap;

    #[test]
    fn test_put_then_get() {
        let weights = WeightSet::new(
            WeightMap::from([("g".to_owned(), 1.0)]),
            BTreeMap::from([("g".to_owned(), WeightMap::from([("m".to_owned(), 1.0)]))]),
        );
        let mut repo = InMemoryTemplateRepository::new();
        repo.put("default", weights.clone()).unwrap();
        assert_eq!(repo.get("default").unwrap(), weights);
        assert_eq!(repo.names(), vec!["default".to_owned()]);
    }

    #[test]
    fn test_missing_template() {
        let repo = InMemoryTemplateRepository::new();
        assert_eq!(
            repo.get("nope"),
            Err(CoreError::TemplateNotFound {
                name: "nope".to_owned()
            })
        );
    }

    #[test]
    fn test_rejects_empty_template() {
        let mut repo = InMemoryTemplateRepository::new();
        assert_eq!(
            repo.put("empty", WeightSet::default()),
            Err(CoreError::EmptyTemplate)
        );
    }
}
