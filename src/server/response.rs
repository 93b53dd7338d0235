use serde::{Deserialize, Serialize};

/// Body of responses that carry no data.
#[derive(Debug, Serialize, Deserialize)]
pub struct CommonResponse {
    pub code: u16,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DataResponse<T> {
    pub code: u16,
    pub data: T,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct HealthzData {
    /// Whether the gateway integration is switched on in the config.
    pub enabled: bool,
    /// Whether the last synchronization succeeded.
    pub synced: bool,
}
