//! Attribute schema catalog
//!
//! One pure function describes every attribute of a cloud export for each
//! access mode. Nesting is only possible through single-element list blocks,
//! so every sub-object is a [`FieldType::Block`].

use std::collections::BTreeMap;

pub const ID: &str = "id";
pub const TYPE: &str = "type";
pub const ENABLED: &str = "enabled";
pub const NAME: &str = "name";
pub const DESCRIPTION: &str = "description";
pub const PLAN_ID: &str = "plan_id";
pub const CLOUD_PROVIDER: &str = "cloud_provider";
pub const AWS: &str = "aws";
pub const AZURE: &str = "azure";
pub const GCE: &str = "gce";
pub const IBM: &str = "ibm";
pub const BGP: &str = "bgp";
pub const CURRENT_STATUS: &str = "current_status";

/// Element container of the list data source
pub const ITEMS: &str = "items";

/// How an attribute is accessed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessMode {
    /// Managed resource, written by the user
    Create,
    /// Single-item data source, looked up by id
    ReadSingle,
    /// Element of the list data source
    ReadList,
}

/// Who supplies an attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    Required,
    Optional,
    /// Required only when `cloud_provider` names this block
    Selected,
    /// Provided by the server
    Computed,
}

impl Presence {
    pub fn is_computed(&self) -> bool {
        matches!(self, Presence::Computed)
    }

    /// Whether the user may write this attribute
    pub fn is_user_supplied(&self) -> bool {
        !self.is_computed()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldType {
    String,
    Bool,
    Block(Schema),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    pub presence: Presence,
    pub field_type: FieldType,
    pub description: &'static str,
}

impl FieldSpec {
    fn new(presence: Presence, field_type: FieldType, description: &'static str) -> Self {
        Self {
            presence,
            field_type,
            description,
        }
    }

    /// Nested schema of a block attribute
    pub fn block(&self) -> Option<&Schema> {
        match &self.field_type {
            FieldType::Block(schema) => Some(schema),
            _ => None,
        }
    }
}

/// Attribute name → field definition
pub type Schema = BTreeMap<&'static str, FieldSpec>;

/// Attribute schema of a cloud export for the given access mode
pub fn fields_for(mode: AccessMode) -> Schema {
    // user-written on create, server-authoritative everywhere else
    let user = |on_create: Presence| match mode {
        AccessMode::Create => on_create,
        AccessMode::ReadSingle | AccessMode::ReadList => Presence::Computed,
    };
    let id = match mode {
        AccessMode::Create | AccessMode::ReadList => Presence::Computed,
        AccessMode::ReadSingle => Presence::Required,
    };
    let required = user(Presence::Required);

    let mut schema = Schema::new();
    schema.insert(
        ID,
        FieldSpec::new(
            id,
            FieldType::String,
            "The internal cloud export identifier. This is Read-only and assigned by Kentik",
        ),
    );
    schema.insert(
        TYPE,
        FieldSpec::new(
            required,
            FieldType::String,
            "CLOUD_EXPORT_TYPE_UNSPECIFIED: Invalid or incomplete exports. \
             CLOUD_EXPORT_TYPE_KENTIK_MANAGED: Cloud exports that are managed by Kentik. \
             CLOUD_EXPORT_TYPE_CUSTOMER_MANAGED: Exports that are managed by Kentik customers \
             (eg. by running an agent)",
        ),
    );
    schema.insert(
        ENABLED,
        FieldSpec::new(
            required,
            FieldType::Bool,
            "Whether this task is enabled and intended to run, or disabled",
        ),
    );
    schema.insert(
        NAME,
        FieldSpec::new(required, FieldType::String, "A short name for this export"),
    );
    schema.insert(
        DESCRIPTION,
        FieldSpec::new(
            user(Presence::Optional),
            FieldType::String,
            "An optional, longer description",
        ),
    );
    schema.insert(
        PLAN_ID,
        FieldSpec::new(
            required,
            FieldType::String,
            "The identifier of the Kentik plan associated with this task",
        ),
    );
    schema.insert(
        CLOUD_PROVIDER,
        FieldSpec::new(
            required,
            FieldType::String,
            "The cloud provider targeted by this export (aws, azure, gce, ibm)",
        ),
    );

    let variant = user(Presence::Selected);
    schema.insert(
        AWS,
        FieldSpec::new(
            variant,
            FieldType::Block(block(
                required,
                &[
                    (
                        "bucket",
                        FieldKind::String,
                        "Source S3 bucket to fetch vpc flow logs from",
                    ),
                    (
                        "iam_role_arn",
                        FieldKind::String,
                        "ARN for the IAM role to assume when fetching data or making AWS calls for this export",
                    ),
                    (
                        "region",
                        FieldKind::String,
                        "AWS region where this bucket resides",
                    ),
                    (
                        "delete_after_read",
                        FieldKind::Bool,
                        "If true, attempt to delete vpc flow log chunks from S3 after they've been read",
                    ),
                    ("multiple_buckets", FieldKind::Bool, ""),
                ],
            )),
            "Properties specific to Amazon Web Services \"vpc flow logs\" exports",
        ),
    );
    schema.insert(
        AZURE,
        FieldSpec::new(
            variant,
            FieldType::Block(block(
                required,
                &[
                    ("location", FieldKind::String, ""),
                    ("resource_group", FieldKind::String, ""),
                    ("storage_account", FieldKind::String, ""),
                    ("subscription_id", FieldKind::String, ""),
                    ("security_principal_enabled", FieldKind::Bool, ""),
                ],
            )),
            "Properties specific to Azure exports",
        ),
    );
    schema.insert(
        GCE,
        FieldSpec::new(
            variant,
            FieldType::Block(block(
                required,
                &[
                    ("project", FieldKind::String, ""),
                    ("subscription", FieldKind::String, ""),
                ],
            )),
            "Properties specific to Google Cloud export",
        ),
    );
    schema.insert(
        IBM,
        FieldSpec::new(
            variant,
            FieldType::Block(block(required, &[("bucket", FieldKind::String, "")])),
            "Properties specific to IBM Cloud exports",
        ),
    );
    schema.insert(
        BGP,
        FieldSpec::new(
            user(Presence::Optional),
            FieldType::Block(block(
                required,
                &[
                    (
                        "apply_bgp",
                        FieldKind::Bool,
                        "If true, apply BGP data discovered via another device to the flow from this export",
                    ),
                    (
                        "use_bgp_device_id",
                        FieldKind::String,
                        "Which other device to get BGP data from",
                    ),
                    ("device_bgp_type", FieldKind::String, "device, other_device, none"),
                ],
            )),
            "Optional BGP related settings",
        ),
    );
    schema.insert(
        CURRENT_STATUS,
        FieldSpec::new(
            Presence::Computed,
            FieldType::Block(block(
                Presence::Computed,
                &[
                    (
                        "status",
                        FieldKind::String,
                        "OK, ERROR or other short and descriptive status",
                    ),
                    ("error_message", FieldKind::String, "If not empty, the current error"),
                    ("flow_found", FieldKind::Bool, "If true, we found flow logs"),
                    ("api_access", FieldKind::Bool, ""),
                    ("storage_account_access", FieldKind::Bool, ""),
                ],
            )),
            "Export task status",
        ),
    );
    schema
}

/// Schema of the list data source: a computed `items` list of
/// [`AccessMode::ReadList`] elements
pub fn list_schema() -> Schema {
    let mut schema = Schema::new();
    schema.insert(
        ITEMS,
        FieldSpec::new(
            Presence::Computed,
            FieldType::Block(fields_for(AccessMode::ReadList)),
            "",
        ),
    );
    schema
}

#[derive(Clone, Copy)]
enum FieldKind {
    String,
    Bool,
}

/// Nested block schema made of scalar fields
fn block(presence: Presence, fields: &[(&'static str, FieldKind, &'static str)]) -> Schema {
    fields
        .iter()
        .map(|&(name, kind, description)| {
            let field_type = match kind {
                FieldKind::String => FieldType::String,
                FieldKind::Bool => FieldType::Bool,
            };
            (name, FieldSpec::new(presence, field_type, description))
        })
        .collect()
}
