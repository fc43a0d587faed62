//! Application bootstrap and dependency wiring.
//!
//! The composition root: every service is instantiated and wired here, in
//! dependency order. The four network-facing seams (device control, event
//! subscriptions, the discovery probe and the publish sink) arrive as
//! [`Backends`] so tests can wire the same graph over in-memory doubles.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use tokio_util::sync::CancellationToken;

use crate::context::NetworkContext;
use crate::error::{BrokerError, BrokerResult};
use crate::protocol_constants::SOAP_TIMEOUT_SECS;
use crate::publish::{PublishSink, Publisher, UdpPublishSink};
use crate::runtime::TokioSpawner;
use crate::services::{
    DiscoveryLoop, EventDecoder, LeaseManager, SnippetOrchestrator, ZoneController,
};
use crate::sonos::device::{DeviceControl, SonosDevice};
use crate::sonos::discovery::{SsdpConfig, SsdpProbe, ZoneProbe};
use crate::sonos::gena_client::{GenaClient, SubscriptionTransport};
use crate::state::Config;
use crate::zone::ZoneRegistry;

/// The network-facing implementations the services run against.
pub struct Backends {
    pub device: Arc<dyn DeviceControl>,
    pub subscriptions: Arc<dyn SubscriptionTransport>,
    pub probe: Arc<dyn ZoneProbe>,
    pub sink: Arc<dyn PublishSink>,
}

/// Container for all bootstrapped services.
#[derive(Clone)]
pub struct BootstrappedServices {
    /// Every known zone.
    pub registry: Arc<ZoneRegistry>,
    pub publisher: Arc<Publisher>,
    /// Event subscription leases.
    pub leases: Arc<LeaseManager>,
    pub controller: Arc<ZoneController>,
    pub decoder: Arc<EventDecoder>,
    pub discovery: Arc<DiscoveryLoop>,
    pub snippets: Arc<SnippetOrchestrator>,
    /// Network configuration (port, local IP).
    pub network: NetworkContext,
    pub config: Config,
    /// Task spawner for background operations.
    pub spawner: TokioSpawner,
    /// Cancellation token for graceful shutdown.
    pub cancel_token: CancellationToken,
}

impl BootstrappedServices {
    /// Starts the discovery loop and the lease renewal task.
    pub fn start_background_tasks(&self) {
        Arc::clone(&self.discovery).start(&self.spawner, self.cancel_token.clone());
        Arc::clone(&self.leases).start_renewal_task(&self.spawner, self.cancel_token.clone());
        log::info!("[Bootstrap] Background tasks started");
    }

    /// Initiates graceful shutdown of all services.
    ///
    /// Background loops stop; snippets already playing run to completion.
    pub async fn shutdown(&self) {
        log::info!("[Bootstrap] Beginning graceful shutdown...");

        self.cancel_token.cancel();
        self.leases.shutdown().await;

        log::info!("[Bootstrap] Shutdown complete");
    }
}

/// Creates the shared HTTP client for all Sonos communication.
fn create_http_client() -> BrokerResult<Client> {
    Client::builder()
        .timeout(Duration::from_secs(SOAP_TIMEOUT_SECS))
        .build()
        .map_err(|e| BrokerError::Internal(format!("Failed to create HTTP client: {}", e)))
}

fn ssdp_config(config: &Config) -> SsdpConfig {
    SsdpConfig {
        send_count: u32::try_from(config.probe_send_count).unwrap_or(u32::MAX),
        window: Duration::from_millis(config.probe_window_ms),
        ..SsdpConfig::default()
    }
}

/// Wires every service over the given backends.
///
/// Order: registry, publisher, leases, controller, then the decoder,
/// discovery loop and snippet orchestrator which all sit on the controller.
pub fn wire_services(
    config: &Config,
    network: NetworkContext,
    backends: Backends,
    spawner: TokioSpawner,
) -> BootstrappedServices {
    let registry = Arc::new(ZoneRegistry::new());
    let publisher = Arc::new(Publisher::new(Arc::clone(&registry), backends.sink));
    let leases = Arc::new(LeaseManager::new(
        backends.subscriptions,
        network.clone(),
        config,
    ));
    let controller = Arc::new(ZoneController::new(
        Arc::clone(&registry),
        Arc::clone(&backends.device),
        Arc::clone(&publisher),
    ));
    let decoder = Arc::new(EventDecoder::new(
        Arc::clone(&registry),
        Arc::clone(&leases),
        Arc::clone(&publisher),
        Arc::clone(&controller),
        spawner.clone(),
    ));
    let discovery = Arc::new(DiscoveryLoop::new(
        backends.probe,
        backends.device,
        Arc::clone(&registry),
        Arc::clone(&leases),
        Arc::clone(&controller),
        Arc::clone(&publisher),
        network.clone(),
        config,
    ));
    let snippets = Arc::new(SnippetOrchestrator::new(
        Arc::clone(&registry),
        Arc::clone(&controller),
        spawner.clone(),
        Duration::from_millis(config.snippet_fade_ms),
    ));

    BootstrappedServices {
        registry,
        publisher,
        leases,
        controller,
        decoder,
        discovery,
        snippets,
        network,
        config: config.clone(),
        spawner,
        cancel_token: CancellationToken::new(),
    }
}

/// Bootstraps all services against real zone players.
///
/// # Errors
///
/// Returns an error if the configuration is invalid, the HTTP client cannot
/// be built or the publish socket cannot be opened.
pub async fn bootstrap_services(
    config: &Config,
    network: NetworkContext,
) -> BrokerResult<BootstrappedServices> {
    config.validate().map_err(BrokerError::Configuration)?;

    let http_client = create_http_client()?;
    let sink = UdpPublishSink::connect(&config.publish_host, config.publish_port).await?;
    log::info!(
        "[Bootstrap] Publishing to udp://{}:{}",
        config.publish_host,
        config.publish_port
    );

    let backends = Backends {
        device: Arc::new(SonosDevice::new(http_client.clone())),
        subscriptions: Arc::new(GenaClient::new(http_client)),
        probe: Arc::new(SsdpProbe::new(ssdp_config(config))),
        sink: Arc::new(sink),
    };

    Ok(wire_services(config, network, backends, TokioSpawner::current()))
}
