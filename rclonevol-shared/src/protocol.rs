//! Wire types for the Docker volume plugin protocol.
//!
//! Every endpoint is an HTTP POST carrying a JSON body. Field names follow
//! Docker's PascalCase convention.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::constants::plugin;

// ============================================================================
// REQUESTS
// ============================================================================

/// `/VolumeDriver.Create` body.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CreateRequest {
    pub name: String,
    /// Driver options from `docker volume create -o key=value`.
    /// Docker sends `null` when no option was given.
    #[serde(default)]
    pub opts: Option<HashMap<String, String>>,
}

/// Body shared by `Remove`, `Path` and `Get`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct NameRequest {
    pub name: String,
}

/// Body shared by `Mount` and `Unmount`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MountRequest {
    pub name: String,
    /// Caller (container) identifier. Informational only.
    #[serde(rename = "ID", default)]
    pub id: String,
}

// ============================================================================
// RESPONSES
// ============================================================================

/// Empty success body, or the error body of any endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ErrorResponse {
    pub err: String,
}

impl ErrorResponse {
    pub fn ok() -> Self {
        Self::default()
    }

    pub fn new(err: impl Into<String>) -> Self {
        Self { err: err.into() }
    }
}

/// `/Plugin.Activate` response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ActivateResponse {
    pub implements: Vec<String>,
}

impl Default for ActivateResponse {
    fn default() -> Self {
        Self {
            implements: vec![plugin::IMPLEMENTS.to_string()],
        }
    }
}

/// `Path` and `Mount` response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MountpointResponse {
    pub mountpoint: String,
}

/// Volume description returned by `Get` and `List`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct VolumeInfo {
    pub name: String,
    pub mountpoint: String,
    /// RFC 3339 creation time, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    /// Free-form status shown by `docker volume inspect`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<BTreeMap<String, serde_json::Value>>,
}

/// `/VolumeDriver.Get` response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct GetResponse {
    pub volume: VolumeInfo,
}

/// `/VolumeDriver.List` response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ListResponse {
    pub volumes: Vec<VolumeInfo>,
}

/// Scope declaration of the driver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Capability {
    pub scope: String,
}

/// `/VolumeDriver.Capabilities` response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CapabilitiesResponse {
    pub capabilities: Capability,
}

impl CapabilitiesResponse {
    /// Declare the scope volumes of this driver live in.
    pub fn with_scope(scope: impl Into<String>) -> Self {
        Self {
            capabilities: Capability {
                scope: scope.into(),
            },
        }
    }
}
