use std::cmp::Ordering;

use crate::{CoreError, FeatureVector, MetricCatalog, PlayerRanking, WeightSet};

/// Turns a field of feature vectors into a ranking under a weight set.
///
/// Implementations must be pure: the same field and weights always produce the
/// same ranking. The optimizer calls this once per event per trial, possibly
/// from several threads.
pub trait RankingGenerator {
    fn rank_players(
        &self,
        field: &[FeatureVector],
        weights: &WeightSet,
    ) -> Result<Vec<PlayerRanking>, CoreError>;
}

/// Reference ranking generator: weighted sum of per-field z-scores.
///
/// For each metric the oriented readings (see [`MetricSpec::orient`]) are
/// standardized across the field; missing readings contribute zero. A player's
/// score is `Σ effective_weight(metric) * z(metric)` and ranks are assigned by
/// descending score, ties broken by player id.
///
/// [`MetricSpec::orient`]: crate::MetricSpec::orient
#[derive(Debug, Clone)]
pub struct WeightedSumRanker {
    catalog: MetricCatalog,
}

impl WeightedSumRanker {
    #[must_use]
    pub fn new(catalog: MetricCatalog) -> Self {
        Self { catalog }
    }

    #[must_use]
    pub fn catalog(&self) -> &MetricCatalog {
        &self.catalog
    }

    #[expect(clippy::cast_precision_loss)]
    fn z_scores(&self, field: &[FeatureVector]) -> Vec<Vec<f64>> {
        let mut columns = Vec::with_capacity(self.catalog.len());
        for spec in self.catalog.iter() {
            let oriented = field
                .iter()
                .map(|v| v.value(spec.index).map(|raw| spec.orient(raw)))
                .collect::<Vec<_>>();
            let present = oriented.iter().flatten().copied().collect::<Vec<_>>();
            let (mean, std) = if present.is_empty() {
                (0.0, 1.0)
            } else {
                let n = present.len() as f64;
                let mean = present.iter().sum::<f64>() / n;
                let var = present.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;
                let std = var.sqrt();
                (mean, if std > 0.0 { std } else { 1.0 })
            };
            columns.push(
                oriented
                    .iter()
                    .map(|v| v.map_or(0.0, |x| (x - mean) / std))
                    .collect(),
            );
        }
        columns
    }
}

impl RankingGenerator for WeightedSumRanker {
    fn rank_players(
        &self,
        field: &[FeatureVector],
        weights: &WeightSet,
    ) -> Result<Vec<PlayerRanking>, CoreError> {
        for (row, vector) in field.iter().enumerate() {
            if vector.player_id.is_empty() {
                return Err(CoreError::EmptyPlayerIdInField { row });
            }
            self.catalog.check_vector(vector)?;
        }

        let effective = weights.effective_metric_weights();
        let metric_weights = self
            .catalog
            .labels()
            .map(|label| effective.get(label).copied().unwrap_or(0.0))
            .collect::<Vec<_>>();
        let columns = self.z_scores(field);

        let mut scored = field
            .iter()
            .enumerate()
            .map(|(row, vector)| {
                let metrics = columns.iter().map(|col| col[row]).collect::<Vec<_>>();
                let score = metrics
                    .iter()
                    .zip(&metric_weights)
                    .map(|(z, w)| z * w)
                    .sum::<f64>();
                (vector.player_id.as_str(), score, metrics)
            })
            .collect::<Vec<_>>();
        scored.sort_by(|a, b| match b.1.total_cmp(&a.1) {
            Ordering::Equal => a.0.cmp(b.0),
            ord => ord,
        });

        Ok(scored
            .into_iter()
            .enumerate()
            .map(|(pos, (player_id, score, metrics))| PlayerRanking {
                player_id: player_id.to_owned(),
                rank: u32::try_from(pos + 1).unwrap_or(u32::MAX),
                score,
                metrics,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::{MetricSpec, WeightMap};

    fn catalog() -> MetricCatalog {
        MetricCatalog::new(vec![
            MetricSpec::new("distance", 0, false),
            MetricSpec::new("scoring_avg", 1, true),
        ])
        .unwrap()
    }

    fn weights(distance: f64, scoring: f64) -> WeightSet {
        WeightSet::new(
            WeightMap::from([("all".to_owned(), 1.0)]),
            BTreeMap::from([(
                "all".to_owned(),
                WeightMap::from([
                    ("distance".to_owned(), distance),
                    ("scoring_avg".to_owned(), scoring),
                ]),
            )]),
        )
    }

    fn field() -> Vec<FeatureVector> {
        vec![
            FeatureVector::new("long_hitter", vec![320.0, 71.5]),
            FeatureVector::new("grinder", vec![280.0, 69.0]),
            FeatureVector::new("average", vec![300.0, 70.2]),
        ]
    }

    fn order(ranking: &[PlayerRanking]) -> Vec<&str> {
        ranking.iter().map(|r| r.player_id.as_str()).collect()
    }

    #[test]
    fn test_higher_is_better_metric() {
        let ranker = WeightedSumRanker::new(catalog());
        let ranking = ranker.rank_players(&field(), &weights(1.0, 0.0)).unwrap();
        assert_eq!(order(&ranking), vec!["long_hitter", "average", "grinder"]);
        assert_eq!(
            ranking.iter().map(|r| r.rank).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
    }

    #[test]
    fn test_lower_is_better_metric_is_oriented() {
        let ranker = WeightedSumRanker::new(catalog());
        let ranking = ranker.rank_players(&field(), &weights(0.0, 1.0)).unwrap();
        assert_eq!(order(&ranking), vec!["grinder", "average", "long_hitter"]);
    }

    #[test]
    fn test_ties_break_by_player_id() {
        let ranker = WeightedSumRanker::new(catalog());
        let tied = vec![
            FeatureVector::new("b", vec![1.0, 1.0]),
            FeatureVector::new("a", vec![1.0, 1.0]),
        ];
        let ranking = ranker.rank_players(&tied, &weights(0.5, 0.5)).unwrap();
        assert_eq!(order(&ranking), vec!["a", "b"]);
    }

    #[test]
    fn test_missing_readings_score_as_average() {
        let ranker = WeightedSumRanker::new(catalog());
        let field = vec![
            FeatureVector::new("high", vec![310.0, f64::NAN]),
            FeatureVector::new("unknown", vec![f64::NAN, f64::NAN]),
            FeatureVector::new("low", vec![290.0, f64::NAN]),
        ];
        let ranking = ranker.rank_players(&field, &weights(1.0, 0.0)).unwrap();
        assert_eq!(order(&ranking), vec!["high", "unknown", "low"]);
    }

    #[test]
    fn test_rejects_wrong_dimension() {
        let ranker = WeightedSumRanker::new(catalog());
        let field = vec![FeatureVector::new("p", vec![1.0])];
        assert!(ranker.rank_players(&field, &weights(1.0, 0.0)).is_err());
    }

    #[test]
    fn test_empty_player_id_names_the_row() {
        let ranker = WeightedSumRanker::new(catalog());
        let mut field = field();
        field[1].player_id.clear();
        let err = ranker.rank_players(&field, &weights(1.0, 0.0)).unwrap_err();
        assert_eq!(err, CoreError::EmptyPlayerIdInField { row: 1 });
        assert_eq!(err.to_string(), "empty player id at row 1 of the field");
    }
}
