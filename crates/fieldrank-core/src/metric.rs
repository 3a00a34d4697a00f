use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::{CoreError, FeatureVector};

/// One scoring dimension.
///
/// `index` is the position of this metric inside every [`FeatureVector`].
/// When `lower_is_better` is set, raw readings are sign-flipped by
/// [`MetricSpec::orient`] before they are scored, so that larger oriented
/// values always mean "better".
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MetricSpec {
    pub label: String,
    pub index: usize,
    #[serde(default)]
    pub lower_is_better: bool,
}

impl MetricSpec {
    #[must_use]
    pub fn new(label: impl Into<String>, index: usize, lower_is_better: bool) -> Self {
        Self {
            label: label.into(),
            index,
            lower_is_better,
        }
    }

    /// Returns the raw reading oriented so that larger is better.
    #[must_use]
    pub fn orient(&self, raw: f64) -> f64 {
        if self.lower_is_better { -raw } else { raw }
    }
}

/// The ordered, immutable set of metrics used in one run.
///
/// Labels are unique and `specs[i].index == i` for every metric, so a metric's
/// index doubles as its position in the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<MetricSpec>", into = "Vec<MetricSpec>")]
pub struct MetricCatalog {
    specs: Vec<MetricSpec>,
}

impl MetricCatalog {
    /// Builds a catalog, sorting by index and rejecting duplicate labels or
    /// gaps in the index sequence.
    pub fn new(mut specs: Vec<MetricSpec>) -> Result<Self, CoreError> {
        specs.sort_by_key(|spec| spec.index);
        let mut seen = HashSet::new();
        for (expected, spec) in specs.iter().enumerate() {
            if !seen.insert(spec.label.as_str()) {
                return Err(CoreError::DuplicateMetricLabel {
                    label: spec.label.clone(),
                });
            }
            if spec.index != expected {
                return Err(CoreError::MetricIndexMismatch {
                    label: spec.label.clone(),
                    index: spec.index,
                    expected,
                });
            }
        }
        Ok(Self { specs })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.specs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &MetricSpec> + '_ {
        self.specs.iter()
    }

    #[must_use]
    pub fn get(&self, label: &str) -> Option<&MetricSpec> {
        self.specs.iter().find(|spec| spec.label == label)
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> + '_ {
        self.specs.iter().map(|spec| spec.label.as_str())
    }

    /// Checks that `vector` has exactly one reading per metric.
    pub fn check_vector(&self, vector: &FeatureVector) -> Result<(), CoreError> {
        if vector.values.len() == self.specs.len() {
            Ok(())
        } else {
            Err(CoreError::DimensionMismatch {
                player_id: vector.player_id.clone(),
                expected: self.specs.len(),
                actual: vector.values.len(),
            })
        }
    }
}

impl TryFrom<Vec<MetricSpec>> for MetricCatalog {
    type Error = CoreError;

    fn try_from(specs: Vec<MetricSpec>) -> Result<Self, Self::Error> {
        Self::new(specs)
    }
}

impl From<MetricCatalog> for Vec<MetricSpec> {
    fn from(catalog: MetricCatalog) -> Self {
        catalog.specs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_orient_flips_lower_is_better() {
        assert_eq!(MetricSpec::new("scoring_avg", 0, true).orient(70.5), -70.5);
        assert_eq!(MetricSpec::new("driving_distance", 1, false).orient(300.0), 300.0);
    }

    #[test]
    fn test_catalog_sorts_by_index() {
        let catalog = MetricCatalog::new(vec![
            MetricSpec::new("b", 1, false),
            MetricSpec::new("a", 0, true),
        ])
        .unwrap();
        assert_eq!(catalog.labels().collect::<Vec<_>>(), vec!["a", "b"]);
    }

    #[test]
    fn test_catalog_rejects_duplicates_and_gaps() {
        let duplicate = MetricCatalog::new(vec![
            MetricSpec::new("a", 0, false),
            MetricSpec::new("a", 1, false),
        ]);
        assert!(matches!(
            duplicate,
            Err(CoreError::DuplicateMetricLabel { .. })
        ));

        let gap = MetricCatalog::new(vec![
            MetricSpec::new("a", 0, false),
            MetricSpec::new("b", 2, false),
        ]);
        assert!(matches!(gap, Err(CoreError::MetricIndexMismatch { .. })));
    }

    #[test]
    fn test_check_vector_dimension() {
        let catalog = MetricCatalog::new(vec![MetricSpec::new("a", 0, false)]).unwrap();
        let ok = FeatureVector::new("p1", vec![1.0]);
        let bad = FeatureVector::new("p2", vec![1.0, 2.0]);
        assert!(catalog.check_vector(&ok).is_ok());
        assert_eq!(
            catalog.check_vector(&bad),
            Err(CoreError::DimensionMismatch {
                player_id: "p2".to_owned(),
                expected: 1,
                actual: 2,
            })
        );
    }

    #[test]
    fn test_catalog_deserializes_from_list() {
        let json = r#"[{"label": "sg_total", "index": 0}, {"label": "scoring_avg", "index": 1, "lower_is_better": true}]"#;
        let catalog: MetricCatalog = serde_json::from_str(json).unwrap();
        assert_eq!(catalog.len(), 2);
        assert!(catalog.get("scoring_avg").unwrap().lower_is_better);
    }
}
