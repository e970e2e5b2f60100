//! Mapping between [`CloudExport`] and its [`FlatTree`] encoding
//!
//! `to_flat` is used on every read path; `from_flat` is its inverse for all
//! user-writable attributes (`current_status` is server-only and never decoded).

use crate::error::ValidationError;
use crate::flat::FlatTree;
use crate::model::{
    AwsProperties, AzureProperties, BgpProperties, CloudExport, CloudProvider, ExportStatus,
    GceProperties, IbmProperties, ProviderProperties,
};
use crate::schema::{
    self, AccessMode, CLOUD_PROVIDER, DESCRIPTION, ENABLED, FieldSpec, ID, NAME, PLAN_ID, Presence,
    Schema, TYPE,
};
use serde_json::Value;

/// Encode an export into its flat tree
///
/// Only the populated provider block is emitted; absent BGP and status blocks
/// are omitted rather than written as empty lists.
pub fn to_flat(export: &CloudExport) -> FlatTree {
    let mut tree = FlatTree::new()
        .with(ID, export.id.clone())
        .with(TYPE, export.export_type.as_str())
        .with(ENABLED, export.enabled)
        .with(NAME, export.name.clone())
        .with(DESCRIPTION, export.description.clone())
        .with(PLAN_ID, export.plan_id.clone())
        .with(CLOUD_PROVIDER, export.cloud_provider().as_str());

    match &export.properties {
        ProviderProperties::Aws(aws) => put(&mut tree, aws),
        ProviderProperties::Azure(azure) => put(&mut tree, azure),
        ProviderProperties::Gce(gce) => put(&mut tree, gce),
        ProviderProperties::Ibm(ibm) => put(&mut tree, ibm),
    }
    if let Some(bgp) = &export.bgp {
        put(&mut tree, bgp);
    }
    if let Some(status) = &export.current_status {
        put(&mut tree, status);
    }
    tree
}

/// Decode a flat tree into an export whose properties are the `provider` variant
///
/// Attribute requiredness follows [`AccessMode::Create`]: a missing required
/// attribute fails, a missing optional one takes its zero value. The `bgp`
/// block is decoded whenever present, independently of `provider`.
pub fn from_flat(tree: &FlatTree, provider: CloudProvider) -> Result<CloudExport, ValidationError> {
    let schema = schema::fields_for(AccessMode::Create);
    let top = BlockReader::top(tree, &schema);

    let properties = match provider {
        CloudProvider::Aws => ProviderProperties::Aws(decode_variant(tree, &schema, provider)?),
        CloudProvider::Azure => ProviderProperties::Azure(decode_variant(tree, &schema, provider)?),
        CloudProvider::Gce => ProviderProperties::Gce(decode_variant(tree, &schema, provider)?),
        CloudProvider::Ibm => ProviderProperties::Ibm(decode_variant(tree, &schema, provider)?),
    };

    let bgp = match tree.block(BgpProperties::NAME) {
        Some(block) => Some(BgpProperties::decode(&BlockReader::nested(
            BgpProperties::NAME,
            &block,
            nested_schema(&schema, BgpProperties::NAME),
        ))?),
        None => None,
    };

    Ok(CloudExport {
        id: top.string(ID)?,
        export_type: top.string(TYPE)?.parse()?,
        enabled: top.flag(ENABLED)?,
        name: top.string(NAME)?,
        description: top.string(DESCRIPTION)?,
        plan_id: top.string(PLAN_ID)?,
        properties,
        bgp,
        current_status: None,
    })
}

fn put<B: EncodeBlock>(tree: &mut FlatTree, block: &B) {
    tree.set_block(B::NAME, block.encode());
}

/// Decode the block of the selected provider
fn decode_variant<B: DecodeBlock>(
    tree: &FlatTree,
    schema: &Schema,
    provider: CloudProvider,
) -> Result<B, ValidationError> {
    let block = tree
        .block(B::NAME)
        .ok_or(ValidationError::MissingVariantBlock { block: provider })?;
    B::decode(&BlockReader::nested(
        B::NAME,
        &block,
        nested_schema(schema, B::NAME),
    ))
}

fn nested_schema<'a>(schema: &'a Schema, name: &str) -> Option<&'a Schema> {
    schema.get(name).and_then(FieldSpec::block)
}

/// A block that can be written into a flat tree
trait EncodeBlock {
    const NAME: &'static str;

    fn encode(&self) -> FlatTree;
}

/// A block that can be read back from a flat tree
trait DecodeBlock: EncodeBlock + Sized {
    fn decode(reader: &BlockReader<'_>) -> Result<Self, ValidationError>;
}

/// Reads scalar attributes of one tree level, applying schema requiredness
struct BlockReader<'a> {
    block: Option<&'static str>,
    tree: &'a FlatTree,
    schema: Option<&'a Schema>,
}

impl<'a> BlockReader<'a> {
    fn top(tree: &'a FlatTree, schema: &'a Schema) -> Self {
        Self {
            block: None,
            tree,
            schema: Some(schema),
        }
    }

    fn nested(block: &'static str, tree: &'a FlatTree, schema: Option<&'a Schema>) -> Self {
        Self {
            block: Some(block),
            tree,
            schema,
        }
    }

    fn path(&self, field: &str) -> String {
        match self.block {
            Some(block) => format!("{}.0.{}", block, field),
            None => field.to_string(),
        }
    }

    fn is_required(&self, field: &str) -> bool {
        self.schema
            .and_then(|s| s.get(field))
            .is_some_and(|f| f.presence == Presence::Required)
    }

    /// Absent attribute: an error if required, otherwise the zero value applies
    fn absent(&self, field: &str) -> Result<(), ValidationError> {
        if self.is_required(field) {
            return Err(ValidationError::MissingField {
                path: self.path(field),
            });
        }
        Ok(())
    }

    fn invalid(&self, field: &str, expected: &str, got: &Value) -> ValidationError {
        ValidationError::InvalidField {
            path: self.path(field),
            reason: format!("expected {}, got: {}", expected, got),
        }
    }

    fn string(&self, field: &str) -> Result<String, ValidationError> {
        match self.tree.get(field) {
            Some(Value::String(s)) => Ok(s.clone()),
            None | Some(Value::Null) => self.absent(field).map(|()| String::new()),
            Some(other) => Err(self.invalid(field, "string", other)),
        }
    }

    fn flag(&self, field: &str) -> Result<bool, ValidationError> {
        if let Some(value) = self.tree.flag(field).value() {
            return Ok(value);
        }
        match self.tree.get(field) {
            None | Some(Value::Null) => self.absent(field).map(|()| false),
            Some(other) => Err(self.invalid(field, "boolean", other)),
        }
    }
}

impl EncodeBlock for AwsProperties {
    const NAME: &'static str = schema::AWS;

    fn encode(&self) -> FlatTree {
        FlatTree::new()
            .with("bucket", self.bucket.clone())
            .with("iam_role_arn", self.iam_role_arn.clone())
            .with("region", self.region.clone())
            .with("delete_after_read", self.delete_after_read)
            .with("multiple_buckets", self.multiple_buckets)
    }
}

impl DecodeBlock for AwsProperties {
    fn decode(r: &BlockReader<'_>) -> Result<Self, ValidationError> {
        Ok(Self {
            bucket: r.string("bucket")?,
            iam_role_arn: r.string("iam_role_arn")?,
            region: r.string("region")?,
            delete_after_read: r.flag("delete_after_read")?,
            multiple_buckets: r.flag("multiple_buckets")?,
        })
    }
}

impl EncodeBlock for AzureProperties {
    const NAME: &'static str = schema::AZURE;

    fn encode(&self) -> FlatTree {
        FlatTree::new()
            .with("location", self.location.clone())
            .with("resource_group", self.resource_group.clone())
            .with("storage_account", self.storage_account.clone())
            .with("subscription_id", self.subscription_id.clone())
            .with("security_principal_enabled", self.security_principal_enabled)
    }
}

impl DecodeBlock for AzureProperties {
    fn decode(r: &BlockReader<'_>) -> Result<Self, ValidationError> {
        Ok(Self {
            location: r.string("location")?,
            resource_group: r.string("resource_group")?,
            storage_account: r.string("storage_account")?,
            subscription_id: r.string("subscription_id")?,
            security_principal_enabled: r.flag("security_principal_enabled")?,
        })
    }
}

impl EncodeBlock for GceProperties {
    const NAME: &'static str = schema::GCE;

    fn encode(&self) -> FlatTree {
        FlatTree::new()
            .with("project", self.project.clone())
            .with("subscription", self.subscription.clone())
    }
}

impl DecodeBlock for GceProperties {
    fn decode(r: &BlockReader<'_>) -> Result<Self, ValidationError> {
        Ok(Self {
            project: r.string("project")?,
            subscription: r.string("subscription")?,
        })
    }
}

impl EncodeBlock for IbmProperties {
    const NAME: &'static str = schema::IBM;

    fn encode(&self) -> FlatTree {
        FlatTree::new().with("bucket", self.bucket.clone())
    }
}

impl DecodeBlock for IbmProperties {
    fn decode(r: &BlockReader<'_>) -> Result<Self, ValidationError> {
        Ok(Self {
            bucket: r.string("bucket")?,
        })
    }
}

impl EncodeBlock for BgpProperties {
    const NAME: &'static str = schema::BGP;

    fn encode(&self) -> FlatTree {
        FlatTree::new()
            .with("apply_bgp", self.apply_bgp)
            .with("use_bgp_device_id", self.use_bgp_device_id.clone())
            .with("device_bgp_type", self.device_bgp_type.clone())
    }
}

impl DecodeBlock for BgpProperties {
    fn decode(r: &BlockReader<'_>) -> Result<Self, ValidationError> {
        Ok(Self {
            apply_bgp: r.flag("apply_bgp")?,
            use_bgp_device_id: r.string("use_bgp_device_id")?,
            device_bgp_type: r.string("device_bgp_type")?,
        })
    }
}

impl EncodeBlock for ExportStatus {
    const NAME: &'static str = schema::CURRENT_STATUS;

    fn encode(&self) -> FlatTree {
        FlatTree::new()
            .with("status", self.status.clone())
            .with("error_message", self.error_message.clone())
            .with("flow_found", self.flow_found)
            .with("api_access", self.api_access)
            .with("storage_account_access", self.storage_account_access)
    }
}
