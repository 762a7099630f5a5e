use serde::{Deserialize, Serialize};

/// Tuning for fuzzy section matching.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MergeConfig {
    /// Minimum weighted similarity (0.0..=1.0) for two sections to match.
    pub similarity_threshold: f64,
    /// Weight of heading similarity; body similarity gets the remainder.
    pub heading_weight: f64,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: 0.80,
            heading_weight: 0.70,
        }
    }
}

impl MergeConfig {
    /// Weight of body similarity.
    pub fn body_weight(&self) -> f64 {
        1.0 - self.heading_weight
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_weights_favor_headings() {
        let c = MergeConfig::default();
        assert_eq!(c.similarity_threshold, 0.80);
        assert!(c.heading_weight > c.body_weight());
        assert!((c.heading_weight + c.body_weight() - 1.0).abs() < f64::EPSILON);
    }
}
