use std::sync::Arc;

use tlerelay_aggregator::{AggregationEngine, HttpTransport, Transport, TransportFailure};

use crate::config::Config;

pub struct AppState {
    pub config: Config,
    pub engine: AggregationEngine,
    pub transport: Arc<dyn Transport>,
}

impl AppState {
    pub fn new(config: Config) -> Result<Self, TransportFailure> {
        let transport = HttpTransport::new(&config.relay.transport)?;
        Ok(Self::with_transport(config, Arc::new(transport)))
    }

    pub fn with_transport(config: Config, transport: Arc<dyn Transport>) -> Self {
        let engine = AggregationEngine::from_config(&config.relay);
        AppState {
            config,
            engine,
            transport,
        }
    }
}
