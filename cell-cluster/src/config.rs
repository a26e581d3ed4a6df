use crate::error::{ClusterError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Community detection method applied to the shared-neighbor graph.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClusterMethod {
    /// CPM optimization with a resolution parameter.
    Leiden,
    /// Best-of-N modularity maximization.
    Louvain,
    /// Legacy tree-based density-peak clustering, supplied by an external detector.
    #[serde(alias = "DDRTree")]
    DdrTree,
}

impl ClusterMethod {
    /// Key of the auxiliary dataset slot holding this method's result.
    pub fn key(&self) -> &'static str {
        match self {
            ClusterMethod::Leiden => "leiden",
            ClusterMethod::Louvain => "louvain",
            ClusterMethod::DdrTree => "ddrtree",
        }
    }

    /// True for the neighbor-graph methods implemented in this crate.
    pub fn is_graph_based(&self) -> bool {
        matches!(self, ClusterMethod::Leiden | ClusterMethod::Louvain)
    }
}

impl fmt::Display for ClusterMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ClusterMethod::Leiden => "leiden",
            ClusterMethod::Louvain => "louvain",
            ClusterMethod::DdrTree => "DDRTree",
        })
    }
}

impl FromStr for ClusterMethod {
    type Err = ClusterError;

    fn from_str(s: &str) -> Result<Self> {
        Ok(match s.to_ascii_lowercase().as_str() {
            "leiden" => ClusterMethod::Leiden,
            "louvain" => ClusterMethod::Louvain,
            "ddrtree" => ClusterMethod::DdrTree,
            _ => {
                return Err(ClusterError::InvalidArgument(format!(
                    "unknown clustering method '{s}', expected one of leiden, louvain, DDRTree"
                )))
            }
        })
    }
}

/// Options recognized by `cluster_cells`. Omitted fields take their defaults when deserialized.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterConfig {
    /// Number of nearest neighbors per point
    pub k: usize,
    /// Louvain trial count, or the Leiden iteration budget
    pub louvain_iter: usize,
    /// Jaccard-normalize shared-neighbor counts
    pub weight: bool,
    /// Leiden CPM resolution
    pub resolution_parameter: f64,
    pub method: ClusterMethod,
    /// Log pipeline stages at info level instead of debug
    pub verbose: bool,
    /// Cluster count for the legacy method
    pub num_clusters: Option<usize>,
    /// Base seed; Louvain trial `t` uses `random_seed + t`
    pub random_seed: u64,
    /// Leiden refinement randomness
    pub randomness: f64,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        ClusterConfig {
            k: 20,
            louvain_iter: 1,
            weight: false,
            resolution_parameter: leiden::leiden::DEFAULT_RESOLUTION,
            method: ClusterMethod::Leiden,
            verbose: false,
            num_clusters: None,
            random_seed: 0xBADC0FFEE0DDF00D,
            randomness: leiden::leiden::DEFAULT_RANDOMNESS,
        }
    }
}

impl ClusterConfig {
    /// Check the options that do not depend on the data. `k` is checked against the number of
    /// points by the neighbor search.
    pub fn validate(&self) -> Result<()> {
        if self.k < 1 {
            return Err(ClusterError::KNotPositive);
        }
        if self.louvain_iter < 1 {
            return Err(ClusterError::InvalidArgument(
                "louvain_iter must be a positive integer".to_string(),
            ));
        }
        if !(self.resolution_parameter.is_finite() && self.resolution_parameter > 0.0) {
            return Err(ClusterError::InvalidArgument(format!(
                "resolution_parameter must be finite and positive, got {}",
                self.resolution_parameter
            )));
        }
        if !(self.randomness.is_finite() && self.randomness > 0.0) {
            return Err(ClusterError::InvalidArgument(format!(
                "randomness must be finite and positive, got {}",
                self.randomness
            )));
        }
        if self.method.is_graph_based() && self.num_clusters.is_some() {
            return Err(ClusterError::UnsupportedConfiguration(format!(
                "num_clusters is only used by the DDRTree method, not {}",
                self.method
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_method() {
        assert_eq!("leiden".parse::<ClusterMethod>(), Ok(ClusterMethod::Leiden));
        assert_eq!("Louvain".parse::<ClusterMethod>(), Ok(ClusterMethod::Louvain));
        assert_eq!("DDRTree".parse::<ClusterMethod>(), Ok(ClusterMethod::DdrTree));
        let err = "kmeans".parse::<ClusterMethod>().unwrap_err();
        assert!(err.is_invalid_argument());
    }

    #[test]
    fn test_defaults_from_partial_json() {
        let config: ClusterConfig = serde_json::from_str(r#"{"k": 15, "method": "louvain"}"#).unwrap();
        assert_eq!(config.k, 15);
        assert_eq!(config.method, ClusterMethod::Louvain);
        assert_eq!(config.louvain_iter, 1);
        assert!(!config.weight);
        assert_eq!(config.resolution_parameter, 0.1);

        let config: ClusterConfig = serde_json::from_str(r#"{"method": "DDRTree"}"#).unwrap();
        assert_eq!(config.method, ClusterMethod::DdrTree);
    }

    #[test]
    fn test_validate() {
        assert_eq!(ClusterConfig::default().validate(), Ok(()));

        let config = ClusterConfig {
            k: 0,
            ..ClusterConfig::default()
        };
        assert_eq!(config.validate(), Err(ClusterError::KNotPositive));

        let config = ClusterConfig {
            louvain_iter: 0,
            ..ClusterConfig::default()
        };
        assert!(config.validate().unwrap_err().is_invalid_argument());

        let config = ClusterConfig {
            resolution_parameter: f64::NAN,
            ..ClusterConfig::default()
        };
        assert!(config.validate().unwrap_err().is_invalid_argument());

        let config = ClusterConfig {
            method: ClusterMethod::Louvain,
            num_clusters: Some(5),
            ..ClusterConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ClusterError::UnsupportedConfiguration(_))
        ));

        let config = ClusterConfig {
            method: ClusterMethod::DdrTree,
            num_clusters: Some(5),
            ..ClusterConfig::default()
        };
        assert_eq!(config.validate(), Ok(()));
    }
}
