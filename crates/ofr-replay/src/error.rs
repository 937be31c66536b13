/// Replay error variants. All are caller mistakes in cursor parameters;
/// protocol violations in the data are never errors.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReplayError {
    /// A time step or width was zero or negative.
    NonPositiveStep { field: &'static str },
    /// Count windows need at least one row.
    ZeroWindowSize,
}

impl core::fmt::Display for ReplayError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            ReplayError::NonPositiveStep { field } => {
                write!(f, "{} must be a positive duration", field)
            }
            ReplayError::ZeroWindowSize => write!(f, "window size must be at least one row"),
        }
    }
}

impl std::error::Error for ReplayError {}
