//! Tree construction settings, loadable from YAML

use crate::error::{IrError, IrResult};
use serde::{Deserialize, Serialize};
use std::path::Path;

fn default_true() -> bool {
    true
}

/// Settings applied by a [`QueryTree`](crate::QueryTree)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IrConfig {
    /// Reject node handles that are dangling or of the wrong family when
    /// they are stored into a field
    #[serde(default = "default_true")]
    pub validate_references: bool,

    /// Record referrer handles on CTEs when CTE references are created
    #[serde(default = "default_true")]
    pub track_cte_referrers: bool,
}

impl Default for IrConfig {
    fn default() -> Self {
        Self {
            validate_references: true,
            track_cte_referrers: true,
        }
    }
}

impl IrConfig {
    /// Parse a YAML document
    pub fn from_yaml_str(content: &str) -> IrResult<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Load from a YAML file
    pub fn load(path: &Path) -> IrResult<Self> {
        if !path.exists() {
            return Err(IrError::ConfigNotFound {
                path: path.display().to_string(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| IrError::IoWithPath {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::from_yaml_str(&content)
    }
}
