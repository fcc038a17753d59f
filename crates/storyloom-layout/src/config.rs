//! Canvas geometry.

/// Canvas geometry used by [`crate::layout_with`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutConfig {
    /// Horizontal centre of every level.
    pub center_x: f64,
    /// Width reserved for a level however few nodes it holds.
    pub min_level_width: f64,
    /// Width per node once a level outgrows the minimum.
    pub node_spacing: f64,
    /// `y` of level 0.
    pub header_offset: f64,
    /// Vertical distance between levels.
    pub row_height: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            center_x: 1000.0,
            min_level_width: 800.0,
            node_spacing: 150.0,
            header_offset: 100.0,
            row_height: 180.0,
        }
    }
}
