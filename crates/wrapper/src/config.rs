use tracking::TrackingConfig;

#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(default)] // if we add new fields, give them default values when deserializing old config
pub struct WrapperConfig {
    pub tracking: TrackingConfig,

    /// Upper bound on the passes a single drain makes over updates scheduled while draining.
    pub max_drain_passes: usize,

    /// Collections whose changed region exceeds this many cells are compared position by position
    /// instead of with a longest-common-subsequence diff.
    pub max_diff_cells: usize,
}

impl WrapperConfig {
    pub const DEFAULT_MAX_DRAIN_PASSES: usize = 16;
    pub const DEFAULT_MAX_DIFF_CELLS: usize = 1 << 20;
}

impl Default for WrapperConfig {
    fn default() -> Self {
        Self {
            tracking: TrackingConfig::default(),
            max_drain_passes: Self::DEFAULT_MAX_DRAIN_PASSES,
            max_diff_cells: Self::DEFAULT_MAX_DIFF_CELLS,
        }
    }
}
