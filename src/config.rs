//! Configuration for the tungate controller
//!
//! Gateway API native configuration; the tunnel credentials and transport
//! are owned by the embedding binary.

use serde::{Deserialize, Serialize};
use std::env;

/// Controller configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ControllerConfig {
    /// Controller name (for Gateway API)
    #[serde(default = "default_controller_name")]
    pub controller_name: String,

    /// GatewayClass name to watch (for Gateway API)
    pub gateway_class_name: Option<String>,

    /// Cluster DNS domain used when synthesizing in-cluster service URLs
    #[serde(default = "default_cluster_domain")]
    pub cluster_domain: String,

    /// Record backend references of unsupported kinds/groups as failed refs
    /// instead of dropping them silently (default: false)
    #[serde(default = "default_false")]
    pub record_unsupported_backends: bool,
}

fn default_controller_name() -> String {
    "tungate.io/gateway-controller".to_string()
}

fn default_cluster_domain() -> String {
    "cluster.local".to_string()
}

fn default_false() -> bool {
    false
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            controller_name: default_controller_name(),
            gateway_class_name: Some("tungate".to_string()),
            cluster_domain: default_cluster_domain(),
            record_unsupported_backends: default_false(),
        }
    }
}

impl ControllerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        let mut config = Self::default();

        // Controller identity
        if let Ok(val) = env::var("TUNGATE_CONTROLLER_NAME") {
            config.controller_name = val;
        }

        if let Ok(val) = env::var("TUNGATE_GATEWAY_CLASS") {
            config.gateway_class_name = Some(val);
        }

        if let Ok(val) = env::var("TUNGATE_CLUSTER_DOMAIN") {
            config.cluster_domain = val;
        }

        if let Ok(val) = env::var("TUNGATE_RECORD_UNSUPPORTED_BACKENDS") {
            config.record_unsupported_backends = val.parse().unwrap_or(false);
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ControllerConfig::default();
        assert_eq!(config.controller_name, "tungate.io/gateway-controller");
        assert_eq!(config.gateway_class_name, Some("tungate".to_string()));
        assert_eq!(config.cluster_domain, "cluster.local");
        assert!(
            !config.record_unsupported_backends,
            "Unsupported backends should be dropped silently by default"
        );
    }
}
