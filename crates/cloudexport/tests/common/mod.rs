use async_trait::async_trait;
use cloudexport::{
    ApiError, AwsProperties, AzureProperties, BgpProperties, CloudExport, CloudExportApi,
    ExportStatus, ExportType, GceProperties, IbmProperties, ProviderProperties,
};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

/// In-memory cloud export service
///
/// Ids are allocated sequentially, a duplicate name on create is a conflict
/// and every created export gets an OK status.
#[derive(Default)]
pub struct FakeExportService {
    data: Mutex<Vec<CloudExport>>,
    calls: Mutex<HashMap<&'static str, usize>>,
    get_delay: Option<Duration>,
    normalize: Option<fn(&mut CloudExport)>,
}

impl FakeExportService {
    pub fn new(data: Vec<CloudExport>) -> Self {
        Self {
            data: Mutex::new(data),
            ..Default::default()
        }
    }

    /// Delay every `get`, leaving room to cancel a read-back
    #[allow(dead_code)]
    pub fn with_get_delay(mut self, delay: Duration) -> Self {
        self.get_delay = Some(delay);
        self
    }

    /// Server-side rewrite applied to every stored export
    #[allow(dead_code)]
    pub fn with_normalizer(mut self, normalize: fn(&mut CloudExport)) -> Self {
        self.normalize = Some(normalize);
        self
    }

    pub fn calls(&self, method: &str) -> usize {
        self.calls.lock().unwrap().get(method).copied().unwrap_or(0)
    }

    #[allow(dead_code)]
    pub fn stored(&self, id: &str) -> Option<CloudExport> {
        self.data.lock().unwrap().iter().find(|e| e.id == id).cloned()
    }

    #[allow(dead_code)]
    pub fn remove(&self, id: &str) {
        self.data.lock().unwrap().retain(|e| e.id != id);
    }

    #[allow(dead_code)]
    pub fn len(&self) -> usize {
        self.data.lock().unwrap().len()
    }

    fn record(&self, method: &'static str) {
        *self.calls.lock().unwrap().entry(method).or_default() += 1;
    }

    fn allocate_id(data: &[CloudExport]) -> String {
        let max = data
            .iter()
            .map(|e| e.id.parse::<u64>().unwrap_or(1_000_000))
            .max()
            .unwrap_or(0);
        (max + 1).to_string()
    }
}

#[async_trait]
impl CloudExportApi for FakeExportService {
    async fn create(&self, export: &CloudExport) -> Result<CloudExport, ApiError> {
        self.record("create");
        let mut data = self.data.lock().unwrap();
        if data.iter().any(|e| e.name == export.name) {
            return Err(ApiError::Conflict(format!(
                "cloud export {:?} already exists",
                export.name
            )));
        }

        let mut created = export.clone();
        created.id = Self::allocate_id(&data);
        created.current_status = Some(ok_status());
        if let Some(normalize) = self.normalize {
            normalize(&mut created);
        }
        data.push(created.clone());
        Ok(created)
    }

    async fn get(&self, id: &str) -> Result<CloudExport, ApiError> {
        self.record("get");
        if let Some(delay) = self.get_delay {
            tokio::time::sleep(delay).await;
        }
        self.stored(id)
            .ok_or_else(|| ApiError::NotFound(format!("cloud export with ID {:?} not found", id)))
    }

    async fn update(&self, id: &str, export: &CloudExport) -> Result<CloudExport, ApiError> {
        self.record("update");
        let mut data = self.data.lock().unwrap();
        let Some(slot) = data.iter_mut().find(|e| e.id == id) else {
            return Err(ApiError::NotFound(format!(
                "cloud export of id {:?} doesn't exist",
                id
            )));
        };

        let status = slot.current_status.take();
        *slot = export.clone();
        slot.current_status = status;
        if let Some(normalize) = self.normalize {
            normalize(slot);
        }
        Ok(slot.clone())
    }

    async fn delete(&self, id: &str) -> Result<(), ApiError> {
        self.record("delete");
        let mut data = self.data.lock().unwrap();
        let before = data.len();
        data.retain(|e| e.id != id);
        if data.len() == before {
            return Err(ApiError::NotFound(format!("cloud export {:?} not found", id)));
        }
        Ok(())
    }

    async fn list(&self) -> Result<Vec<CloudExport>, ApiError> {
        self.record("list");
        Ok(self.data.lock().unwrap().clone())
    }
}

pub fn ok_status() -> ExportStatus {
    ExportStatus {
        status: "OK".to_string(),
        error_message: "No errors".to_string(),
        flow_found: true,
        api_access: true,
        storage_account_access: true,
    }
}

pub fn initial_exports() -> Vec<CloudExport> {
    vec![
        CloudExport {
            id: "1".to_string(),
            export_type: ExportType::KentikManaged,
            enabled: true,
            name: "test_terraform_aws_export".to_string(),
            description: "terraform aws cloud export".to_string(),
            plan_id: "11467".to_string(),
            properties: ProviderProperties::Aws(AwsProperties {
                bucket: "terraform-aws-bucket".to_string(),
                iam_role_arn: "arn:aws:iam::003740049406:role/trafficTerraformIngestRole"
                    .to_string(),
                region: "us-east-2".to_string(),
                delete_after_read: false,
                multiple_buckets: false,
            }),
            bgp: Some(BgpProperties {
                apply_bgp: true,
                use_bgp_device_id: "dummy-device-id".to_string(),
                device_bgp_type: "dummy-device-bgp-type".to_string(),
            }),
            current_status: Some(ok_status()),
        },
        CloudExport {
            id: "2".to_string(),
            export_type: ExportType::CustomerManaged,
            enabled: true,
            name: "test_terraform_gce_export".to_string(),
            description: "terraform gce cloud export".to_string(),
            plan_id: "21600".to_string(),
            properties: ProviderProperties::Gce(GceProperties {
                project: "project gce".to_string(),
                subscription: "subscription gce".to_string(),
            }),
            bgp: None,
            current_status: Some(ExportStatus {
                status: "NOK".to_string(),
                error_message: "Timeout".to_string(),
                ..Default::default()
            }),
        },
        CloudExport {
            id: "3".to_string(),
            export_type: ExportType::KentikManaged,
            enabled: false,
            name: "test_terraform_ibm_export".to_string(),
            description: "terraform ibm cloud export".to_string(),
            plan_id: "11467".to_string(),
            properties: ProviderProperties::Ibm(IbmProperties {
                bucket: "terraform-ibm-bucket".to_string(),
            }),
            bgp: None,
            current_status: Some(ExportStatus {
                status: "OK".to_string(),
                error_message: "No errors".to_string(),
                ..Default::default()
            }),
        },
        CloudExport {
            id: "4".to_string(),
            export_type: ExportType::KentikManaged,
            enabled: true,
            name: "test_terraform_azure_export".to_string(),
            description: "terraform azure cloud export".to_string(),
            plan_id: "11467".to_string(),
            properties: ProviderProperties::Azure(AzureProperties {
                location: "centralus".to_string(),
                resource_group: "traffic-generator".to_string(),
                storage_account: "kentikstorage".to_string(),
                subscription_id: "784bd5ec-122b-41b7-9719-22f23d5b49c8".to_string(),
                security_principal_enabled: true,
            }),
            bgp: None,
            current_status: Some(ExportStatus {
                status: "OK".to_string(),
                error_message: "No errors".to_string(),
                ..Default::default()
            }),
        },
    ]
}
