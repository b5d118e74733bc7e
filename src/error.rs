use thiserror::Error;

/// Failure kinds of the recommendation core itself. Everything else in the
/// serving path is a boundary concern and never reaches the engine.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum RecommendError {
    #[error("no interactions supplied, nothing to fit")]
    NoInteractions,
    #[error("recommender has not been fitted yet")]
    NotFitted,
}

#[derive(Error, Debug, PartialEq)]
pub enum RatingError {
    #[error("rating {value} is outside the accepted range [{min}, {max}]")]
    OutOfRange { value: f64, min: f64, max: f64 },
}
