//! Kentik Cloud Export reconciliation
//!
//! This crate keeps a user-declared cloud export configuration in sync with
//! the Kentik Cloud Export service.
//!
//! # Architecture
//!
//! ```text
//! user configuration (flat tree)
//!         │
//! ┌───────▼────────┐   schema::fields_for(AccessMode)
//! │   assembler    │◄─ requiredness per attribute
//! └───────┬────────┘
//!         │ CloudExport (tagged union over aws/azure/gce/ibm)
//! ┌───────▼────────┐        ┌──────────────────────┐
//! │   controller   │───────►│ trait CloudExportApi │ (cloudexport-kentik)
//! └───────┬────────┘        └──────────────────────┘
//!         │ mapper::to_flat
//! ┌───────▼────────┐
//! │  ExportState   │ stored flat tree, StateStore on disk
//! └────────────────┘
//! ```
//!
//! Nested objects are encoded as single-element lists in the flat tree, and
//! the `cloud_provider` attribute selects which provider block is
//! authoritative.

pub mod action;
pub mod assembler;
pub mod client;
pub mod controller;
pub mod error;
pub mod flat;
pub mod mapper;
pub mod model;
pub mod schema;
pub mod state;

// Re-exports
pub use action::ActionType;
pub use assembler::assemble;
pub use client::{CloudExportApi, FailureClass, RetryPolicy, classify_status};
pub use controller::{ExportList, ReconciliationController, needs_update, plan};
pub use error::{ApiError, CloudExportError, Operation, Result, ValidationError};
pub use flat::{Flag, FlatTree};
pub use mapper::{from_flat, to_flat};
pub use model::{
    AwsProperties, AzureProperties, BgpProperties, CloudExport, CloudProvider, ExportStatus,
    ExportType, GceProperties, IbmProperties, ProviderProperties,
};
pub use schema::{AccessMode, FieldSpec, FieldType, Presence, Schema, fields_for};
pub use state::{ExportState, StateFile, StateLock, StateStore};
pub use tokio_util::sync::CancellationToken;
