use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("unable to retrieve organization code table from {location}: {reason}")]
    DataUnavailable { location: String, reason: String },
}

impl ReportError {
    pub fn data_unavailable(location: &str, reason: impl ToString) -> Self {
        ReportError::DataUnavailable {
            location: location.to_string(),
            reason: reason.to_string(),
        }
    }
}
