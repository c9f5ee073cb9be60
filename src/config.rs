//! Association configuration.
//!
//! Mirrors the layout of the pipeline's YAML file: a top-level list of
//! foreground classes and an `association` block with the matching thresholds
//! and the track life budget.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{AssocError, Result};
use crate::tracker::ClassId;

/// What to do with a cache instance whose frame-t cluster vanished without a
/// plausible explanation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisappearancePolicy {
    /// Leave the instance in the cache and let its life decay normally.
    #[default]
    CarryForward,
    /// Drop the instance's life to zero so the next step evicts it.
    ForceEvict,
}

/// Matching thresholds and track life budget.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssociationParams {
    /// Maximum centroid distance (meters) for a feasible match.
    pub max_dist: f32,
    /// Maximum cosine dissimilarity of mean features for a feasible match.
    pub max_feat: f32,
    /// Number of steps an unmatched track survives in the cache.
    pub life: i32,
    #[serde(default)]
    pub disappearance: DisappearancePolicy,
    /// Plan classes on the rayon pool.
    #[serde(default)]
    pub parallel: bool,
}

/// Configuration for the short- and long-term associators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssociationConfig {
    /// Semantic classes eligible for instance tracking, processed in this order.
    pub fore_classes: Vec<ClassId>,
    pub association: AssociationParams,
}

impl AssociationConfig {
    pub fn new(fore_classes: Vec<ClassId>, max_dist: f32, max_feat: f32, life: i32) -> Self {
        Self {
            fore_classes,
            association: AssociationParams {
                max_dist,
                max_feat,
                life,
                disappearance: DisappearancePolicy::default(),
                parallel: false,
            },
        }
    }

    pub fn with_disappearance_policy(mut self, policy: DisappearancePolicy) -> Self {
        self.association.disappearance = policy;
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.association.parallel = parallel;
        self
    }

    /// Parse and validate a YAML document.
    ///
    /// A missing field is reported as [`AssocError::Configuration`] rather than
    /// a raw YAML error so callers see a single failure kind for bad configs.
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(content)
            .map_err(|e| AssocError::Configuration(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_yaml_str(&content)?;
        log::info!(
            "Loaded association config from {} ({} foreground classes)",
            path.display(),
            config.fore_classes.len()
        );
        Ok(config)
    }

    pub fn to_yaml_string(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn validate(&self) -> Result<()> {
        if self.fore_classes.is_empty() {
            return Err(AssocError::Configuration(
                "fore_classes must list at least one class".into(),
            ));
        }
        let mut seen = HashSet::new();
        for class_id in &self.fore_classes {
            if !seen.insert(class_id) {
                return Err(AssocError::Configuration(format!(
                    "class {class_id} listed twice in fore_classes"
                )));
            }
        }

        let params = &self.association;
        if !params.max_dist.is_finite() || params.max_dist <= 0.0 {
            return Err(AssocError::Configuration(format!(
                "association.max_dist must be positive and finite, got {}",
                params.max_dist
            )));
        }
        if !params.max_feat.is_finite() || params.max_feat < 0.0 {
            return Err(AssocError::Configuration(format!(
                "association.max_feat must be non-negative and finite, got {}",
                params.max_feat
            )));
        }
        if params.life < 0 {
            return Err(AssocError::Configuration(format!(
                "association.life must be non-negative, got {}",
                params.life
            )));
        }
        Ok(())
    }
}
