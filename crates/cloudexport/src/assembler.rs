//! Assembly of a typed export from user configuration
//!
//! Only write paths (create/update) go through here. Reads trust the server
//! and use [`crate::mapper::to_flat`] directly.

use crate::error::ValidationError;
use crate::flat::FlatTree;
use crate::mapper;
use crate::model::{CloudExport, CloudProvider};
use crate::schema::{self, AccessMode, CLOUD_PROVIDER};

/// Build a [`CloudExport`] from a flat configuration tree
///
/// `cloud_provider` selects the authoritative provider block: a block of the
/// same name must be present, blocks of other providers are ignored.
pub fn assemble(tree: &FlatTree) -> Result<CloudExport, ValidationError> {
    let raw = tree
        .string(CLOUD_PROVIDER)
        .ok_or_else(|| ValidationError::MissingField {
            path: CLOUD_PROVIDER.to_string(),
        })?;
    let provider: CloudProvider = raw.parse()?;

    if !tree.has_block(provider.as_str()) {
        return Err(ValidationError::ProviderBlockMismatch { expected: provider });
    }

    let create = schema::fields_for(AccessMode::Create);
    for key in tree.keys() {
        if create
            .get(key.as_str())
            .is_some_and(|field| !field.presence.is_user_supplied())
        {
            tracing::debug!("Ignoring server-assigned attribute {:?} in configuration", key);
        }
    }

    let mut export = mapper::from_flat(tree, provider)?;
    export.id.clear();
    tracing::debug!(
        "Assembled {} cloud export {:?} (bgp: {})",
        provider,
        export.name,
        export.bgp.is_some()
    );
    Ok(export)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AwsProperties, ExportType, ProviderProperties};
    use serde_json::json;

    fn tree(value: serde_json::Value) -> FlatTree {
        FlatTree::try_from(value).unwrap()
    }

    fn aws_config() -> FlatTree {
        tree(json!({
            "name": "x",
            "type": "CLOUD_EXPORT_TYPE_KENTIK_MANAGED",
            "enabled": true,
            "plan_id": "11467",
            "cloud_provider": "aws",
            "aws": [{
                "bucket": "b",
                "iam_role_arn": "arn",
                "region": "us-east-2",
                "delete_after_read": false,
                "multiple_buckets": false,
            }],
        }))
    }

    #[test]
    fn test_server_assigned_attributes_are_ignored() {
        let mut config = aws_config();
        config.insert("id", "99");
        config.set_block(
            "current_status",
            FlatTree::new().with("status", "OK").with("flow_found", true),
        );

        let export = assemble(&config).unwrap();
        assert!(export.id.is_empty());
        assert!(export.current_status.is_none());
    }

    #[test]
    fn test_assemble_aws() {
        let export = assemble(&aws_config()).unwrap();

        assert_eq!(export.cloud_provider(), CloudProvider::Aws);
        assert_eq!(export.export_type, ExportType::KentikManaged);
        assert_eq!(export.name, "x");
        assert_eq!(export.plan_id, "11467");
        assert!(export.enabled);
        assert!(export.id.is_empty());
        assert!(export.bgp.is_none());
        assert!(export.current_status.is_none());
        assert_eq!(
            export.properties,
            ProviderProperties::Aws(AwsProperties {
                bucket: "b".to_string(),
                iam_role_arn: "arn".to_string(),
                region: "us-east-2".to_string(),
                delete_after_read: false,
                multiple_buckets: false,
            })
        );
    }

    #[test]
    fn test_provider_block_mismatch_despite_other_block() {
        let mut config = aws_config();
        config.remove("aws");
        config.set_block(
            "azure",
            FlatTree::new()
                .with("location", "centralus")
                .with("resource_group", "rg")
                .with("storage_account", "sa")
                .with("subscription_id", "sub")
                .with("security_principal_enabled", true),
        );

        assert_eq!(
            assemble(&config),
            Err(ValidationError::ProviderBlockMismatch {
                expected: CloudProvider::Aws
            })
        );
    }

    #[test]
    fn test_empty_provider_block_is_a_mismatch() {
        let mut config = aws_config();
        config.insert("aws", json!([]));
        assert_eq!(
            assemble(&config),
            Err(ValidationError::ProviderBlockMismatch {
                expected: CloudProvider::Aws
            })
        );
    }

    #[test]
    fn test_unsupported_provider() {
        let mut config = aws_config();
        config.insert("cloud_provider", "unknown");

        let err = assemble(&config).unwrap_err();
        assert_eq!(
            err,
            ValidationError::UnsupportedProvider {
                got: "unknown".to_string()
            }
        );
        assert_eq!(
            err.to_string(),
            "cloud_provider should be one of [aws, azure, gce, ibm], got: \"unknown\""
        );
    }

    #[test]
    fn test_missing_discriminator() {
        let mut config = aws_config();
        config.remove("cloud_provider");
        assert_eq!(
            assemble(&config),
            Err(ValidationError::MissingField {
                path: "cloud_provider".to_string()
            })
        );
    }

    #[test]
    fn test_foreign_blocks_are_ignored() {
        let config = aws_config().with_block("ibm", FlatTree::new().with("bucket", "other"));
        let export = assemble(&config).unwrap();
        assert_eq!(export.cloud_provider(), CloudProvider::Aws);
    }

    #[test]
    fn test_invalid_export_type() {
        let mut config = aws_config();
        config.insert("type", "KENTIK");
        assert!(matches!(
            assemble(&config),
            Err(ValidationError::InvalidField { path, .. }) if path == "type"
        ));
    }
}
