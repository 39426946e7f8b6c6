#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(default)] // if we add new fields, give them default values when deserializing old config
pub struct TrackingConfig {
    /// Maximum nesting of dependent recomputations before the chain is reported as cyclic.
    pub max_depth: usize,
}

impl TrackingConfig {
    pub const DEFAULT_MAX_DEPTH: usize = 256;
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            max_depth: Self::DEFAULT_MAX_DEPTH,
        }
    }
}
