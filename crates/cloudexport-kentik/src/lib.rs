//! Kentik Cloud Export provider
//!
//! Connects the cloud export reconciliation core to the Kentik Cloud Export
//! REST API.
//!
//! # Example
//!
//! ```ignore
//! use cloudexport::{CancellationToken, ExportState};
//! use cloudexport_config::ProviderSettings;
//! use cloudexport_kentik::CloudExportProvider;
//!
//! // credentials fall back to KTAPI_AUTH_EMAIL / KTAPI_AUTH_TOKEN
//! let provider = CloudExportProvider::configure(&ProviderSettings::default())?;
//! let controller = provider.controller();
//!
//! let cancel = CancellationToken::new();
//! let mut state = ExportState::absent();
//! controller.create(&mut state, &config, &cancel).await?;
//! ```

pub mod client;
pub mod error;
pub mod provider;
pub mod wire;

pub use client::{EXPORTS_PATH, KentikClient};
pub use error::{KentikError, Result};
pub use provider::{CLOUDEXPORT_ITEM, CLOUDEXPORT_LIST, CloudExportProvider, Surface};
