//! # ot-sim Document Module
//!
//! Every node in the topology ends up with a single ot-sim configuration
//! document. This module assembles it from three sources:
//!
//! - application-wide settings (`defaults` in the topology file)
//! - per-node overrides in the node's metadata
//! - the protocol roots and module declarations produced by the device
//!   configurators
//!
//! Node settings win over application settings key by key; anything left
//! unset takes ot-sim's stock values.
//!
//! ## Example Generated Structure
//!
//! ```yaml
//! message-bus:
//!   pull-endpoint: tcp://127.0.0.1:1234
//!   pub-endpoint: tcp://127.0.0.1:5678
//! cpu:
//!   api-endpoint: 0.0.0.0:9101
//!   modules:
//!     - name: backplane
//!       command: ot-sim-message-bus {{config_file}}
//!     - name: dnp3
//!       command: ot-sim-dnp3-module {{config_file}}
//! dnp3:
//!   - name: dnp3-outstation
//!     mode: server
//!     endpoint: 10.0.0.10:20000
//!     outstation: { ... }
//! ```

pub mod types;

pub use types::{
    Cpu, CpuModuleSettings, ElasticGroundTruth, ElasticGroundTruthSettings, ElasticLogSettings,
    ElasticLogs, GroundTruth, GroundTruthSettings, LogSettings, Logs, MessageBus,
    MessageBusSettings, OtSimConfig, OtSimSettings,
};

use crate::device::NodeArtifacts;
use crate::protocol::SimulatorModule;
use types::{
    DEFAULT_API_ENDPOINT, DEFAULT_ELASTIC_ENDPOINT, DEFAULT_INDEX_BASE_NAME, DEFAULT_LOG_INDEX,
    DEFAULT_PUB_ENDPOINT, DEFAULT_PULL_ENDPOINT,
};

/// Build the ot-sim document of one node.
pub fn build_config(
    defaults: &OtSimSettings,
    node: &OtSimSettings,
    artifacts: NodeArtifacts,
) -> OtSimConfig {
    let message_bus = message_bus(defaults, node);

    let api_endpoint = pick(
        node.cpu_module.as_ref().and_then(|c| c.api_endpoint.as_ref()),
        defaults.cpu_module.as_ref().and_then(|c| c.api_endpoint.as_ref()),
        DEFAULT_API_ENDPOINT,
    );

    let ground_truth = ground_truth(defaults, node);

    let mut modules = vec![SimulatorModule::new(
        "backplane",
        "ot-sim-message-bus {{config_file}}",
    )];
    if ground_truth.is_some() {
        modules.push(SimulatorModule::new(
            "ground-truth",
            "ot-sim-ground-truth-module {{config_file}}",
        ));
    }
    modules.extend(artifacts.modules);

    OtSimConfig {
        message_bus,
        cpu: Cpu {
            api_endpoint,
            logs: logs(defaults, node),
            modules,
        },
        ground_truth,
        dnp3: artifacts.dnp3,
        modbus: artifacts.modbus,
    }
}

fn pick(node: Option<&String>, app: Option<&String>, fallback: &str) -> String {
    node.or(app).cloned().unwrap_or_else(|| fallback.to_string())
}

fn message_bus(defaults: &OtSimSettings, node: &OtSimSettings) -> MessageBus {
    let app = defaults.message_bus.as_ref();
    let own = node.message_bus.as_ref();

    MessageBus {
        pull_endpoint: pick(
            own.and_then(|m| m.pull_endpoint.as_ref()),
            app.and_then(|m| m.pull_endpoint.as_ref()),
            DEFAULT_PULL_ENDPOINT,
        ),
        pub_endpoint: pick(
            own.and_then(|m| m.pub_endpoint.as_ref()),
            app.and_then(|m| m.pub_endpoint.as_ref()),
            DEFAULT_PUB_ENDPOINT,
        ),
    }
}

fn logs(defaults: &OtSimSettings, node: &OtSimSettings) -> Option<Logs> {
    let app = defaults.logs.as_ref();
    let own = node.logs.as_ref();

    // Elastic logging needs an endpoint; an index alone does not enable it.
    let app_elastic = app.and_then(|l| l.elastic.as_ref()).filter(|e| e.endpoint.is_some());
    let own_elastic = own.and_then(|l| l.elastic.as_ref()).filter(|e| e.endpoint.is_some());

    let elastic = own_elastic.or(app_elastic).map(|chosen| ElasticLogs {
        endpoint: pick(chosen.endpoint.as_ref(), None, DEFAULT_ELASTIC_ENDPOINT),
        index: pick(
            chosen.index.as_ref(),
            app_elastic.and_then(|e| e.index.as_ref()),
            DEFAULT_LOG_INDEX,
        ),
    });

    let loki = own
        .and_then(|l| l.loki.clone())
        .or_else(|| app.and_then(|l| l.loki.clone()));

    if elastic.is_none() && loki.is_none() {
        return None;
    }

    Some(Logs { elastic, loki })
}

fn ground_truth(defaults: &OtSimSettings, node: &OtSimSettings) -> Option<GroundTruth> {
    let app = defaults
        .ground_truth_module
        .as_ref()
        .and_then(|g| g.as_ref())
        .and_then(|g| g.elastic.as_ref());

    let own = match &node.ground_truth_module {
        // Explicit null: disabled for this node.
        Some(None) => return None,
        Some(Some(settings)) => settings.elastic.as_ref(),
        None => None,
    };

    let chosen = own.or(app)?;

    Some(GroundTruth {
        elastic: ElasticGroundTruth {
            endpoint: pick(
                chosen.endpoint.as_ref(),
                app.and_then(|e| e.endpoint.as_ref()),
                DEFAULT_ELASTIC_ENDPOINT,
            ),
            index_base_name: pick(
                chosen.index_base_name.as_ref(),
                app.and_then(|e| e.index_base_name.as_ref()),
                DEFAULT_INDEX_BASE_NAME,
            ),
            labels: chosen.labels.clone(),
        },
    })
}
