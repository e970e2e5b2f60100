//! JSON representation used by the Kentik Cloud Export API (v202101beta1)
//!
//! Field names are camelCase and default-valued fields may be omitted by the
//! server, so every field deserializes with a default.

use cloudexport::{
    ApiError, AwsProperties, AzureProperties, BgpProperties, CloudExport, CloudProvider,
    ExportStatus, ExportType, GceProperties, IbmProperties, ProviderProperties,
};
use serde::{Deserialize, Serialize};

/// `{"export": {...}}` request and response body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportEnvelope {
    pub export: WireExport,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListExportsResponse {
    #[serde(default)]
    pub exports: Vec<WireExport>,

    /// Exports the server could not decode and left out of `exports`
    #[serde(default)]
    pub invalid_exports_count: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WireExport {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(rename = "type")]
    pub export_type: ExportType,
    pub enabled: bool,
    pub name: String,
    pub description: String,
    pub plan_id: String,
    pub cloud_provider: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aws: Option<WireAws>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub azure: Option<WireAzure>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gce: Option<WireGce>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ibm: Option<WireIbm>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bgp: Option<WireBgp>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_status: Option<WireStatus>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WireAws {
    pub bucket: String,
    pub iam_role_arn: String,
    pub region: String,
    pub delete_after_read: bool,
    pub multiple_buckets: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WireAzure {
    pub location: String,
    pub resource_group: String,
    pub storage_account: String,
    pub subscription_id: String,
    pub security_principal_enabled: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WireGce {
    pub project: String,
    pub subscription: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WireIbm {
    pub bucket: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WireBgp {
    pub apply_bgp: bool,
    pub use_bgp_device_id: String,
    pub device_bgp_type: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WireStatus {
    pub status: String,
    pub error_message: String,
    pub flow_found: bool,
    pub api_access: bool,
    pub storage_account_access: bool,
}

impl From<&CloudExport> for WireExport {
    fn from(export: &CloudExport) -> Self {
        let mut wire = WireExport {
            id: export.id.clone(),
            export_type: export.export_type,
            enabled: export.enabled,
            name: export.name.clone(),
            description: export.description.clone(),
            plan_id: export.plan_id.clone(),
            cloud_provider: export.cloud_provider().as_str().to_string(),
            bgp: export.bgp.as_ref().map(|bgp| WireBgp {
                apply_bgp: bgp.apply_bgp,
                use_bgp_device_id: bgp.use_bgp_device_id.clone(),
                device_bgp_type: bgp.device_bgp_type.clone(),
            }),
            current_status: export.current_status.as_ref().map(|s| WireStatus {
                status: s.status.clone(),
                error_message: s.error_message.clone(),
                flow_found: s.flow_found,
                api_access: s.api_access,
                storage_account_access: s.storage_account_access,
            }),
            ..Default::default()
        };

        match &export.properties {
            ProviderProperties::Aws(aws) => {
                wire.aws = Some(WireAws {
                    bucket: aws.bucket.clone(),
                    iam_role_arn: aws.iam_role_arn.clone(),
                    region: aws.region.clone(),
                    delete_after_read: aws.delete_after_read,
                    multiple_buckets: aws.multiple_buckets,
                })
            }
            ProviderProperties::Azure(azure) => {
                wire.azure = Some(WireAzure {
                    location: azure.location.clone(),
                    resource_group: azure.resource_group.clone(),
                    storage_account: azure.storage_account.clone(),
                    subscription_id: azure.subscription_id.clone(),
                    security_principal_enabled: azure.security_principal_enabled,
                })
            }
            ProviderProperties::Gce(gce) => {
                wire.gce = Some(WireGce {
                    project: gce.project.clone(),
                    subscription: gce.subscription.clone(),
                })
            }
            ProviderProperties::Ibm(ibm) => {
                wire.ibm = Some(WireIbm {
                    bucket: ibm.bucket.clone(),
                })
            }
        }
        wire
    }
}

impl TryFrom<WireExport> for CloudExport {
    type Error = ApiError;

    fn try_from(wire: WireExport) -> Result<Self, Self::Error> {
        let provider: CloudProvider = wire
            .cloud_provider
            .parse()
            .map_err(|e| ApiError::Decode(format!("cloud export {:?}: {}", wire.id, e)))?;
        let missing = || {
            ApiError::Decode(format!(
                "cloud export {:?}: cloudProvider is {} but no {} properties were returned",
                wire.id, provider, provider
            ))
        };

        let properties = match provider {
            CloudProvider::Aws => {
                let aws = wire.aws.clone().ok_or_else(missing)?;
                ProviderProperties::Aws(AwsProperties {
                    bucket: aws.bucket,
                    iam_role_arn: aws.iam_role_arn,
                    region: aws.region,
                    delete_after_read: aws.delete_after_read,
                    multiple_buckets: aws.multiple_buckets,
                })
            }
            CloudProvider::Azure => {
                let azure = wire.azure.clone().ok_or_else(missing)?;
                ProviderProperties::Azure(AzureProperties {
                    location: azure.location,
                    resource_group: azure.resource_group,
                    storage_account: azure.storage_account,
                    subscription_id: azure.subscription_id,
                    security_principal_enabled: azure.security_principal_enabled,
                })
            }
            CloudProvider::Gce => {
                let gce = wire.gce.clone().ok_or_else(missing)?;
                ProviderProperties::Gce(GceProperties {
                    project: gce.project,
                    subscription: gce.subscription,
                })
            }
            CloudProvider::Ibm => {
                let ibm = wire.ibm.clone().ok_or_else(missing)?;
                ProviderProperties::Ibm(IbmProperties { bucket: ibm.bucket })
            }
        };

        Ok(CloudExport {
            id: wire.id,
            export_type: wire.export_type,
            enabled: wire.enabled,
            name: wire.name,
            description: wire.description,
            plan_id: wire.plan_id,
            properties,
            bgp: wire.bgp.map(|bgp| BgpProperties {
                apply_bgp: bgp.apply_bgp,
                use_bgp_device_id: bgp.use_bgp_device_id,
                device_bgp_type: bgp.device_bgp_type,
            }),
            current_status: wire.current_status.map(|s| ExportStatus {
                status: s.status,
                error_message: s.error_message,
                flow_found: s.flow_found,
                api_access: s.api_access,
                storage_account_access: s.storage_account_access,
            }),
        })
    }
}
