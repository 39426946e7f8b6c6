use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TrackingError {
    #[error("Cyclic dependency. dependent: '{dependent}', depth: {depth}")]
    CyclicDependency { dependent: String, depth: usize },

    #[error("Dependency chain too deep. dependent: '{dependent}', depth: {depth}")]
    DepthExceeded { dependent: String, depth: usize },

    #[error("Computation failed. dependent: '{dependent}', reason: {reason}")]
    ComputationFailed { dependent: String, reason: String },
}

impl TrackingError {
    /// Converts an error returned by the computation of `dependent`.
    ///
    /// Cycles and depth overruns are passed through unchanged so the caller can still tell them apart.
    pub(crate) fn from_computation(dependent: &str, error: anyhow::Error) -> Self {
        match error.downcast::<TrackingError>() {
            Ok(cycle @ TrackingError::CyclicDependency { .. }) => cycle,
            Ok(too_deep @ TrackingError::DepthExceeded { .. }) => too_deep,
            Ok(other) => TrackingError::ComputationFailed {
                dependent: dependent.to_string(),
                reason: other.to_string(),
            },
            Err(error) => TrackingError::ComputationFailed {
                dependent: dependent.to_string(),
                reason: format!("{:#}", error),
            },
        }
    }

    pub fn is_cyclic_dependency(&self) -> bool {
        matches!(self, TrackingError::CyclicDependency { .. })
    }

    pub fn is_depth_exceeded(&self) -> bool {
        matches!(self, TrackingError::DepthExceeded { .. })
    }
}

#[cfg(test)]
mod tests {
    use anyhow::anyhow;

    use super::*;

    #[test]
    fn cycles_pass_through_computation_errors() {
        // given
        let cycle = TrackingError::CyclicDependency {
            dependent: "inner".to_string(),
            depth: 2,
        };

        // when
        let result = TrackingError::from_computation("outer", cycle.clone().into());

        // then
        assert_eq!(result, cycle);
    }

    #[test]
    fn depth_overruns_pass_through_computation_errors() {
        // given
        let too_deep = TrackingError::DepthExceeded {
            dependent: "link 3".to_string(),
            depth: 5,
        };

        // when
        let result = TrackingError::from_computation("link 4", too_deep.clone().into());

        // then
        assert_eq!(result, too_deep);
        assert!(!result.is_cyclic_dependency());
    }

    #[test]
    fn other_errors_become_computation_failures() {
        // when
        let result = TrackingError::from_computation("total", anyhow!("division by zero"));

        // then
        assert_eq!(result, TrackingError::ComputationFailed {
            dependent: "total".to_string(),
            reason: "division by zero".to_string(),
        });
    }
}
