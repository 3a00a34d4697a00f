/// Structural input errors.
///
/// These are reserved for input that cannot be interpreted at all. Thin or
/// noisy data never produces a `CoreError`; statistical routines report it
/// through their own "unavailable" results instead.
#[derive(Debug, Clone, PartialEq, derive_more::Display, derive_more::Error)]
pub enum CoreError {
    #[display("feature vector for player '{player_id}' has {actual} values, expected {expected}")]
    DimensionMismatch {
        player_id: String,
        expected: usize,
        actual: usize,
    },
    #[display("empty player id in event '{event_id}'")]
    EmptyPlayerId { event_id: String },
    #[display("empty player id at row {row} of the field")]
    EmptyPlayerIdInField { row: usize },
    #[display("duplicate metric label '{label}'")]
    DuplicateMetricLabel { label: String },
    #[display("metric '{label}' has index {index}, expected {expected}")]
    MetricIndexMismatch {
        label: String,
        index: usize,
        expected: usize,
    },
    #[display("malformed template key '{key}', expected 'Group::Metric'")]
    MalformedTemplateKey { key: String },
    #[display("template '{name}' not found")]
    TemplateNotFound { name: String },
    #[display("weight template has no groups")]
    EmptyTemplate,
    #[display("invalid run configuration: {reason}")]
    InvalidConfig { reason: String },
}
