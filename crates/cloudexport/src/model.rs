//! Cloud export domain model
//!
//! The provider-specific payload is a sum type, so an export can never carry a
//! `cloud_provider` that disagrees with its properties.

use crate::error::ValidationError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A single cloud export task
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloudExport {
    /// Server-assigned identifier, empty until created
    pub id: String,

    pub export_type: ExportType,

    /// Whether this task is enabled and intended to run
    pub enabled: bool,

    /// A short name for this export
    pub name: String,

    /// An optional, longer description
    pub description: String,

    /// Identifier of the Kentik plan associated with this task
    pub plan_id: String,

    /// Provider-specific properties; their variant is the discriminator
    pub properties: ProviderProperties,

    /// Optional BGP related settings
    pub bgp: Option<BgpProperties>,

    /// Export task status, only ever populated by the server
    pub current_status: Option<ExportStatus>,
}

impl CloudExport {
    /// The cloud provider targeted by this export
    pub fn cloud_provider(&self) -> CloudProvider {
        self.properties.provider()
    }

    /// Copy of this export with server-only fields removed, as sent on write
    pub fn for_write(&self) -> Self {
        Self {
            current_status: None,
            ..self.clone()
        }
    }
}

/// Cloud export type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ExportType {
    /// Cloud exports that are managed by Kentik
    #[serde(rename = "CLOUD_EXPORT_TYPE_KENTIK_MANAGED")]
    KentikManaged,
    /// Exports that are managed by Kentik customers (eg. by running an agent)
    #[serde(rename = "CLOUD_EXPORT_TYPE_CUSTOMER_MANAGED")]
    CustomerManaged,
    /// Invalid or incomplete exports; also any type this client does not know
    #[default]
    #[serde(rename = "CLOUD_EXPORT_TYPE_UNSPECIFIED")]
    #[serde(other)]
    Unspecified,
}

impl ExportType {
    pub const ALL: [ExportType; 3] = [
        ExportType::Unspecified,
        ExportType::KentikManaged,
        ExportType::CustomerManaged,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ExportType::Unspecified => "CLOUD_EXPORT_TYPE_UNSPECIFIED",
            ExportType::KentikManaged => "CLOUD_EXPORT_TYPE_KENTIK_MANAGED",
            ExportType::CustomerManaged => "CLOUD_EXPORT_TYPE_CUSTOMER_MANAGED",
        }
    }
}

impl fmt::Display for ExportType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExportType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ExportType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| ValidationError::InvalidField {
                path: "type".to_string(),
                reason: format!(
                    "expected one of [{}], got: {:?}",
                    ExportType::ALL.map(|t| t.as_str()).join(", "),
                    s
                ),
            })
    }
}

/// Cloud provider discriminator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CloudProvider {
    Aws,
    Azure,
    Gce,
    Ibm,
}

impl CloudProvider {
    pub const ALL: [CloudProvider; 4] = [
        CloudProvider::Aws,
        CloudProvider::Azure,
        CloudProvider::Gce,
        CloudProvider::Ibm,
    ];

    /// Discriminator value, also the name of the matching flat-tree block
    pub fn as_str(&self) -> &'static str {
        match self {
            CloudProvider::Aws => "aws",
            CloudProvider::Azure => "azure",
            CloudProvider::Gce => "gce",
            CloudProvider::Ibm => "ibm",
        }
    }
}

impl fmt::Display for CloudProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CloudProvider {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CloudProvider::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| ValidationError::UnsupportedProvider { got: s.to_string() })
    }
}

/// Provider-specific export properties
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderProperties {
    Aws(AwsProperties),
    Azure(AzureProperties),
    Gce(GceProperties),
    Ibm(IbmProperties),
}

impl ProviderProperties {
    pub fn provider(&self) -> CloudProvider {
        match self {
            ProviderProperties::Aws(_) => CloudProvider::Aws,
            ProviderProperties::Azure(_) => CloudProvider::Azure,
            ProviderProperties::Gce(_) => CloudProvider::Gce,
            ProviderProperties::Ibm(_) => CloudProvider::Ibm,
        }
    }
}

/// Properties specific to Amazon Web Services "vpc flow logs" exports
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AwsProperties {
    /// Source S3 bucket to fetch vpc flow logs from
    pub bucket: String,
    /// ARN for the IAM role to assume when fetching data or making AWS calls
    pub iam_role_arn: String,
    /// AWS region where this bucket resides
    pub region: String,
    /// Delete vpc flow log chunks from S3 after they've been read
    pub delete_after_read: bool,
    pub multiple_buckets: bool,
}

/// Properties specific to Azure exports
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AzureProperties {
    pub location: String,
    pub resource_group: String,
    pub storage_account: String,
    pub subscription_id: String,
    pub security_principal_enabled: bool,
}

/// Properties specific to Google Cloud exports
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GceProperties {
    pub project: String,
    pub subscription: String,
}

/// Properties specific to IBM Cloud exports
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IbmProperties {
    pub bucket: String,
}

/// BGP related settings
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BgpProperties {
    /// Apply BGP data discovered via another device to the flow from this export
    pub apply_bgp: bool,
    /// Which other device to get BGP data from
    pub use_bgp_device_id: String,
    /// device, other_device, none
    pub device_bgp_type: String,
}

/// Export task status (read-only)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportStatus {
    /// OK, ERROR or other short and descriptive status
    pub status: String,
    /// If not empty, the current error
    pub error_message: String,
    /// Whether flow logs were found
    pub flow_found: bool,
    pub api_access: bool,
    pub storage_account_access: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cloud_provider_parse() {
        assert_eq!("gce".parse::<CloudProvider>().unwrap(), CloudProvider::Gce);
        assert_eq!(
            "GCE".parse::<CloudProvider>(),
            Err(ValidationError::UnsupportedProvider {
                got: "GCE".to_string()
            })
        );
    }

    #[test]
    fn test_export_type_parse() {
        for t in ExportType::ALL {
            assert_eq!(t.as_str().parse::<ExportType>().unwrap(), t);
        }
        assert!(matches!(
            "KENTIK_MANAGED".parse::<ExportType>(),
            Err(ValidationError::InvalidField { .. })
        ));
    }

    #[test]
    fn test_export_type_unknown_wire_value_is_unspecified() {
        let parsed: ExportType = serde_json::from_str("\"CLOUD_EXPORT_TYPE_FUTURE\"").unwrap();
        assert_eq!(parsed, ExportType::Unspecified);

        let known: ExportType =
            serde_json::from_str("\"CLOUD_EXPORT_TYPE_CUSTOMER_MANAGED\"").unwrap();
        assert_eq!(known, ExportType::CustomerManaged);
        assert_eq!(ExportType::default(), ExportType::Unspecified);
        assert_eq!(
            serde_json::to_string(&ExportType::Unspecified).unwrap(),
            "\"CLOUD_EXPORT_TYPE_UNSPECIFIED\""
        );
    }

    #[test]
    fn test_discriminator_follows_properties() {
        let export = CloudExport {
            id: String::new(),
            export_type: ExportType::KentikManaged,
            enabled: true,
            name: "ibm".to_string(),
            description: String::new(),
            plan_id: "1".to_string(),
            properties: ProviderProperties::Ibm(IbmProperties {
                bucket: "b".to_string(),
            }),
            bgp: None,
            current_status: Some(ExportStatus::default()),
        };
        assert_eq!(export.cloud_provider(), CloudProvider::Ibm);
        assert!(export.for_write().current_status.is_none());
    }
}
