use thiserror::Error;

/// Recoverable conditions raised by the statistics pipeline.
///
/// None of these are fatal to a report: each one is turned into a notice on
/// the section that produced it.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StatsError {
    #[error("missing data: {0}")]
    MissingData(String),

    #[error("insufficient sample size: need at least {needed} {what}, found {found}")]
    InsufficientSampleSize {
        needed: usize,
        found: usize,
        what: &'static str,
    },

    #[error("degenerate test: {0}")]
    DegenerateTest(String),

    #[error("invalid ratio: {0}")]
    InvalidRatio(String),
}

impl StatsError {
    pub fn observations(needed: usize, found: usize) -> Self {
        StatsError::InsufficientSampleSize {
            needed,
            found,
            what: "observations",
        }
    }

    /// Short label used when a section is rendered as unavailable.
    pub fn notice(&self) -> &'static str {
        match self {
            StatsError::MissingData(_) | StatsError::InsufficientSampleSize { .. } => {
                "Not enough data"
            }
            StatsError::DegenerateTest(_) => "Test undefined",
            StatsError::InvalidRatio(_) => "Invalid value",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notices_match_condition() {
        assert_eq!(StatsError::observations(2, 1).notice(), "Not enough data");
        assert_eq!(
            StatsError::DegenerateTest("zero variance".into()).notice(),
            "Test undefined"
        );
    }

    #[test]
    fn sample_size_message_names_the_unit() {
        let err = StatsError::InsufficientSampleSize {
            needed: 2,
            found: 1,
            what: "distinct seasons",
        };
        assert_eq!(
            err.to_string(),
            "insufficient sample size: need at least 2 distinct seasons, found 1"
        );
    }
}
