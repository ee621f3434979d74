//! Request bodies for fleet creation and allocation

use crate::config::Config;
use crate::constants::{ALLOCATION_GENERATE_NAME, API_GROUP_VERSION, FLEET_LABEL_KEY};
use serde_json::{Value, json};

/// Fleet manifest with packed scheduling and a single dynamic port
pub fn fleet(config: &Config) -> Value {
    json!({
        "apiVersion": API_GROUP_VERSION,
        "kind": "Fleet",
        "metadata": {
            "name": config.fleet.name,
            "namespace": config.fleet.namespace,
        },
        "spec": {
            "replicas": config.fleet.size,
            "scheduling": "Packed",
            "strategy": {"type": "RollingUpdate"},
            "template": {
                "spec": {
                    "ports": [{
                        "name": "default",
                        "portPolicy": "dynamic",
                        "containerPort": config.fleet.container_port,
                    }],
                    "template": {
                        "spec": {
                            "containers": [{
                                "name": "game-server",
                                "image": config.fleet.image,
                            }]
                        }
                    }
                }
            }
        }
    })
}

/// Allocation request selecting any ready game server in the fleet
pub fn allocation(config: &Config) -> Value {
    json!({
        "apiVersion": API_GROUP_VERSION,
        "kind": "GameServerAllocation",
        "metadata": {
            "generateName": ALLOCATION_GENERATE_NAME,
            "namespace": config.fleet.namespace,
        },
        "spec": {
            "required": {
                "matchLabels": { FLEET_LABEL_KEY: config.fleet.name }
            }
        }
    })
}
