use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum IndicatorError {
    #[error("empty price series")]
    EmptySeries,
    #[error("{indicator} unavailable: need {required} closes, have {available}")]
    InsufficientData {
        indicator: &'static str,
        required: usize,
        available: usize,
    },
    #[error("{0} produced a non-finite value")]
    NonFinite(&'static str),
}
