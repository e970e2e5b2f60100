//! Reconciliation of managed cloud exports against the remote service
//!
//! Each managed export is either absent (no identifier) or present. Writes are
//! always followed by a read-back so that server-side normalization ends up
//! in the stored state. The caller's [`ExportState`] is only written after the
//! last external call of an operation has completed, so a cancelled
//! operation leaves it untouched.

use crate::action::ActionType;
use crate::assembler;
use crate::client::{CloudExportApi, RetryPolicy};
use crate::error::{ApiError, CloudExportError, Operation, Result, ValidationError};
use crate::flat::FlatTree;
use crate::mapper;
use crate::model::CloudExport;
use crate::schema::{ID, ITEMS};
use crate::state::{ExportState, StateStore};
use serde_json::Value;
use std::future::Future;
use tokio_util::sync::CancellationToken;

/// Drives create/read/update/delete of cloud exports through a [`CloudExportApi`]
pub struct ReconciliationController<A> {
    api: A,
    retry: RetryPolicy,
}

/// Result of the list data source
#[derive(Debug, Clone, PartialEq)]
pub struct ExportList {
    /// Identity token, fresh on every listing
    pub id: String,

    /// Every visible export, as flat trees
    pub items: Vec<FlatTree>,
}

impl ExportList {
    /// Flat tree shaped like [`crate::schema::list_schema`]
    pub fn to_flat(&self) -> FlatTree {
        FlatTree::new().with(ID, self.id.clone()).with(
            ITEMS,
            Value::Array(
                self.items
                    .iter()
                    .map(|item| item.clone().into_value())
                    .collect(),
            ),
        )
    }
}

impl<A: CloudExportApi> ReconciliationController<A> {
    /// `retry` is the policy `api` was built with; it is fixed for the
    /// lifetime of the controller
    pub fn new(api: A, retry: RetryPolicy) -> Self {
        Self { api, retry }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Create the export described by `config` and read it back
    ///
    /// A duplicate name surfaces as [`CloudExportError::Conflict`] and leaves
    /// the export absent.
    pub async fn create(
        &self,
        state: &mut ExportState,
        config: &FlatTree,
        cancel: &CancellationToken,
    ) -> Result<()> {
        if state.is_present() {
            return Err(CloudExportError::InvalidState {
                operation: Operation::Create,
                reason: format!("export already exists with id {}", state.id),
            });
        }

        let export = assembler::assemble(config).map_err(validation(Operation::Create, None))?;
        tracing::debug!("Create cloud export request: {:?}", export);

        let created = call(cancel, Operation::Create, None, self.api.create(&export))
            .await?
            .map_err(|e| match e {
                ApiError::Conflict(message) => CloudExportError::Conflict {
                    name: export.name.clone(),
                    message,
                },
                other => api_error(Operation::Create, None, other),
            })?;
        tracing::debug!("Create cloud export response: {:?}", created);

        if created.id.is_empty() {
            return Err(api_error(
                Operation::Create,
                None,
                ApiError::Decode("server assigned no identifier".to_string()),
            ));
        }
        tracing::info!("Created cloud export {} ({})", created.id, created.name);

        match self.fetch(cancel, &created.id).await {
            Ok(fetched) => {
                absorb(state, &created.id, fetched);
                Ok(())
            }
            Err(e @ CloudExportError::Cancelled { .. }) => Err(e),
            Err(e) => {
                // the export exists remotely; keep what the create returned
                state.set_present(created.id.clone(), mapper::to_flat(&created));
                Err(e)
            }
        }
    }

    /// Refresh `state` from the server
    ///
    /// An export the server no longer knows becomes absent; that is not an
    /// error.
    pub async fn read(&self, state: &mut ExportState, cancel: &CancellationToken) -> Result<()> {
        if !state.is_present() {
            tracing::debug!("Skipping read of absent cloud export");
            return Ok(());
        }

        let id = state.id.clone();
        let fetched = self.fetch(cancel, &id).await?;
        if fetched.is_none() {
            tracing::warn!("Cloud export {} not found, removing it from state", id);
        }
        absorb(state, &id, fetched);
        Ok(())
    }

    /// Submit `config` if it differs from `state`, then read the export back
    ///
    /// Returns [`ActionType::NoOp`] without contacting the server when nothing
    /// changed.
    pub async fn update(
        &self,
        state: &mut ExportState,
        config: &FlatTree,
        cancel: &CancellationToken,
    ) -> Result<ActionType> {
        if !state.is_present() {
            return Err(CloudExportError::InvalidState {
                operation: Operation::Update,
                reason: "export has no identifier".to_string(),
            });
        }
        if !needs_update(state, config).map_err(validation(Operation::Update, Some(&state.id)))? {
            tracing::debug!("Cloud export {} is up to date", state.id);
            return Ok(ActionType::NoOp);
        }

        let id = state.id.clone();
        let mut export =
            assembler::assemble(config).map_err(validation(Operation::Update, Some(&id)))?;
        export.id = id.clone();
        tracing::debug!("Update cloud export request: {:?}", export);

        let updated = call(cancel, Operation::Update, Some(&id), self.api.update(&id, &export))
            .await?
            .map_err(|e| api_error(Operation::Update, Some(&id), e))?;
        tracing::debug!("Update cloud export response: {:?}", updated);
        tracing::info!("Updated cloud export {} ({})", id, export.name);

        let fetched = self.fetch(cancel, &id).await?;
        absorb(state, &id, fetched);
        Ok(ActionType::Update)
    }

    /// Delete the export; an export that is already gone counts as deleted
    pub async fn delete(&self, state: &mut ExportState, cancel: &CancellationToken) -> Result<()> {
        if !state.is_present() {
            return Ok(());
        }

        let id = state.id.clone();
        match call(cancel, Operation::Delete, Some(&id), self.api.delete(&id)).await? {
            Ok(()) => tracing::info!("Deleted cloud export {}", id),
            Err(ApiError::NotFound(_)) => {
                tracing::debug!("Cloud export {} already absent", id)
            }
            Err(e) => return Err(api_error(Operation::Delete, Some(&id), e)),
        }
        state.clear();
        Ok(())
    }

    /// Refresh, plan and apply: bring the export in line with `desired`
    ///
    /// `None` means the export should not exist.
    pub async fn reconcile(
        &self,
        state: &mut ExportState,
        desired: Option<&FlatTree>,
        cancel: &CancellationToken,
    ) -> Result<ActionType> {
        self.read(state, cancel).await?;

        let action = plan(state, desired)?;
        if action.is_change() {
            tracing::info!("Planned {} of cloud export {}", action, display(&state.id));
        }
        match (action, desired) {
            (ActionType::Create, Some(config)) => self.create(state, config, cancel).await?,
            (ActionType::Update, Some(config)) => {
                self.update(state, config, cancel).await?;
            }
            (ActionType::Delete, _) => self.delete(state, cancel).await?,
            _ => {}
        }
        Ok(action)
    }

    /// Reconcile the export recorded under `address` in `store`
    ///
    /// The state lock is held for the whole run. The recorded state is saved
    /// whenever it changed, also when the operation failed after changing it
    /// (a create whose read-back failed still records the new id).
    pub async fn apply(
        &self,
        store: &StateStore,
        address: &str,
        desired: Option<&FlatTree>,
        cancel: &CancellationToken,
    ) -> Result<ActionType> {
        let lock = store.acquire_lock().await?;
        let mut file = store.load().await?;
        let recorded = file.export(address);

        let mut state = recorded.clone();
        let outcome = self.reconcile(&mut state, desired, cancel).await;
        if state != recorded {
            file.set_export(address, state);
            store.save(&file).await?;
        }
        lock.release().await?;

        match &outcome {
            Ok(action) if action.is_change() => tracing::info!("Applied {} to {}", action, address),
            Ok(_) => tracing::debug!("{} is up to date", address),
            Err(e) => tracing::warn!("Failed to apply {}: {}", address, e),
        }
        outcome
    }

    /// Read a single export by id, without managed state
    pub async fn read_item(&self, id: &str, cancel: &CancellationToken) -> Result<FlatTree> {
        tracing::debug!("Read cloud export item {}", id);
        match self.fetch(cancel, id).await? {
            Some(export) => Ok(mapper::to_flat(&export)),
            None => Err(CloudExportError::NotFound {
                operation: Operation::Read,
                id: id.to_string(),
            }),
        }
    }

    /// Every export visible to the caller
    ///
    /// The listing is never cached; its identity token changes on every call.
    pub async fn list(&self, cancel: &CancellationToken) -> Result<ExportList> {
        let exports = call(cancel, Operation::List, None, self.api.list())
            .await?
            .map_err(|e| api_error(Operation::List, None, e))?;
        tracing::debug!("Listed {} cloud exports", exports.len());

        Ok(ExportList {
            id: uuid::Uuid::new_v4().to_string(),
            items: exports.iter().map(mapper::to_flat).collect(),
        })
    }

    async fn fetch(&self, cancel: &CancellationToken, id: &str) -> Result<Option<CloudExport>> {
        match call(cancel, Operation::Read, Some(id), self.api.get(id)).await? {
            Ok(export) => {
                tracing::debug!("Get cloud export response: {:?}", export);
                Ok(Some(export))
            }
            Err(ApiError::NotFound(_)) => Ok(None),
            Err(e) => Err(api_error(Operation::Read, Some(id), e)),
        }
    }
}

/// Decide what `reconcile` has to do, without contacting the server
pub fn plan(state: &ExportState, desired: Option<&FlatTree>) -> Result<ActionType> {
    let action = match (state.is_present(), desired) {
        (false, Some(_)) => ActionType::Create,
        (false, None) => ActionType::NoOp,
        (true, None) => ActionType::Delete,
        (true, Some(config)) => {
            if needs_update(state, config).map_err(validation(Operation::Update, Some(&state.id)))? {
                ActionType::Update
            } else {
                ActionType::NoOp
            }
        }
    };
    Ok(action)
}

/// Whether `config` differs from the last-known state in any user-writable
/// attribute
pub fn needs_update(state: &ExportState, config: &FlatTree) -> std::result::Result<bool, ValidationError> {
    let mut desired = assembler::assemble(config)?;
    desired.id = state.id.clone();

    Ok(match mapper::from_flat(&state.attributes, desired.cloud_provider()) {
        Ok(current) => current != desired,
        // stored state no longer decodes as the configured provider
        Err(_) => true,
    })
}

/// Run an external call unless `cancel` fires first
///
/// The outer result carries cancellation, the inner one the API outcome.
async fn call<T, F>(
    cancel: &CancellationToken,
    operation: Operation,
    id: Option<&str>,
    request: F,
) -> Result<std::result::Result<T, ApiError>>
where
    F: Future<Output = std::result::Result<T, ApiError>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            tracing::warn!("Cancelled {} of cloud export {}", operation, id.unwrap_or("<unassigned>"));
            Err(CloudExportError::Cancelled {
                operation,
                id: id.map(str::to_string),
            })
        }
        result = request => Ok(result),
    }
}

/// Get the id for log output
fn display(id: &str) -> &str {
    if id.is_empty() {
        "<unassigned>"
    } else {
        id
    }
}

/// Record a fetched export in `state`, or clear it when the export is gone
///
/// An empty id in the response keeps the id we already know.
fn absorb(state: &mut ExportState, id: &str, fetched: Option<CloudExport>) {
    match fetched {
        Some(export) => {
            let id = if export.id.is_empty() {
                id.to_string()
            } else {
                export.id.clone()
            };
            let mut attributes = mapper::to_flat(&export);
            attributes.insert(ID, id.clone());
            state.set_present(id, attributes);
        }
        None => state.clear(),
    }
}

/// Map a validation failure of `operation` to a controller error
fn validation(
    operation: Operation,
    id: Option<&str>,
) -> impl FnOnce(ValidationError) -> CloudExportError {
    let id = id.map(str::to_string);
    move |source| CloudExportError::Validation {
        operation,
        id,
        source,
    }
}

/// Not found gets its own variant; everything else stays an API error
fn api_error(operation: Operation, id: Option<&str>, source: ApiError) -> CloudExportError {
    match source {
        ApiError::NotFound(_) => CloudExportError::NotFound {
            operation,
            id: id.unwrap_or_default().to_string(),
        },
        source => CloudExportError::Api {
            operation,
            id: id.map(str::to_string),
            source,
        },
    }
}
