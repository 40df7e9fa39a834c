use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TrackerError {
    #[error("invalid tracker configuration: {0}")]
    InvalidConfig(String),
    #[error("unknown matching mode `{0}`, expected `basic` or `cascade`")]
    UnknownMatchingMode(String),
    #[error("frame {got} is not after frame {last}")]
    FrameOutOfOrder { last: u32, got: u32 },
    #[error("linear assignment failed: {0}")]
    Assignment(String),
    #[error("innovation covariance is singular")]
    SingularInnovation,
}
