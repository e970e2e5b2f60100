//! Kentik cloud export provider
//!
//! Resolves the provider configuration once and exposes the three host-facing
//! surfaces together with the schema each of them is bound to.

use crate::client::KentikClient;
use crate::error::Result;
use cloudexport::schema::list_schema;
use cloudexport::{AccessMode, ReconciliationController, Schema, fields_for};
use cloudexport_config::{ProviderSettings, ResolvedConfig};

pub const CLOUDEXPORT_ITEM: &str = "kentik-cloudexport_item";
pub const CLOUDEXPORT_LIST: &str = "kentik-cloudexport_list";

/// Host-facing surface of the provider
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Surface {
    /// Managed export, full create/read/update/delete
    ItemResource,
    /// Single export looked up by id
    ItemDataSource,
    /// Every export visible to the caller
    ListDataSource,
}

impl Surface {
    pub const ALL: [Surface; 3] = [
        Surface::ItemResource,
        Surface::ItemDataSource,
        Surface::ListDataSource,
    ];

    pub fn type_name(&self) -> &'static str {
        match self {
            Surface::ItemResource | Surface::ItemDataSource => CLOUDEXPORT_ITEM,
            Surface::ListDataSource => CLOUDEXPORT_LIST,
        }
    }

    pub fn schema(&self) -> Schema {
        match self {
            Surface::ItemResource => fields_for(AccessMode::Create),
            Surface::ItemDataSource => fields_for(AccessMode::ReadSingle),
            Surface::ListDataSource => list_schema(),
        }
    }
}

/// Configured provider session
pub struct CloudExportProvider {
    config: ResolvedConfig,
    controller: ReconciliationController<KentikClient>,
}

impl CloudExportProvider {
    /// Resolve `settings` against the environment and build the API client
    ///
    /// Configuration errors surface here, before any request is sent.
    pub fn configure(settings: &ProviderSettings) -> Result<Self> {
        let config = ResolvedConfig::resolve(settings)?;
        Self::with_config(config)
    }

    pub fn with_config(config: ResolvedConfig) -> Result<Self> {
        tracing::debug!("Creating Kentik API client with config: {:?}", config);
        let client = KentikClient::new(&config)?;
        let controller = ReconciliationController::new(client, config.retry);
        tracing::info!("Kentik cloud export provider configured for {}", config.api_url);
        Ok(Self { config, controller })
    }

    pub fn config(&self) -> &ResolvedConfig {
        &self.config
    }

    pub fn controller(&self) -> &ReconciliationController<KentikClient> {
        &self.controller
    }

    pub fn into_controller(self) -> ReconciliationController<KentikClient> {
        self.controller
    }
}
