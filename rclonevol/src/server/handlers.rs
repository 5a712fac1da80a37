//! Docker VolumeDriver endpoint handlers.
//!
//! Each handler decodes the request, runs the registry operation on the
//! blocking pool (it may hold the registry lock across process and
//! filesystem calls) and encodes the response.

use std::collections::BTreeMap;

use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use rclonevol_shared::errors::{VolumeError, VolumeResult};
use rclonevol_shared::protocol::{
    ActivateResponse, CapabilitiesResponse, CreateRequest, ErrorResponse, GetResponse,
    ListResponse, MountRequest, MountpointResponse, NameRequest, VolumeInfo,
};
use serde::de::DeserializeOwned;

use super::error::ApiError;
use crate::volumes::{VolumeRegistry, VolumeSummary, split_driver_opts};

type ApiResult<T> = Result<Json<T>, ApiError>;

/// Decode a JSON body. Docker sends its own content type, so the header is
/// not checked; an empty body decodes to the default value.
fn decode<T: DeserializeOwned + Default>(body: &Bytes) -> Result<T, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body).map_err(|e| ApiError::BadRequest(format!("invalid request: {e}")))
}

async fn run_blocking<T, F>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> VolumeResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| VolumeError::Internal(format!("registry task failed: {e}")))?
        .map_err(ApiError::from)
}

fn volume_info(summary: VolumeSummary, with_status: bool) -> VolumeInfo {
    let status = with_status.then(|| {
        let mut status = BTreeMap::new();
        status.insert("Connections".to_string(), summary.connections.into());
        if let Some(pid) = summary.pid {
            status.insert("Pid".to_string(), pid.into());
        }
        status
    });

    VolumeInfo {
        name: summary.name,
        mountpoint: summary.mountpoint.display().to_string(),
        created_at: summary.created_at.map(|t| t.to_rfc3339()),
        status,
    }
}

pub(super) async fn activate() -> Json<ActivateResponse> {
    Json(ActivateResponse::default())
}

pub(super) async fn create(
    State(registry): State<VolumeRegistry>,
    body: Bytes,
) -> ApiResult<ErrorResponse> {
    let req: CreateRequest = decode(&body)?;
    let (backend, options) = split_driver_opts(req.opts.unwrap_or_default());

    run_blocking(move || registry.create(&req.name, &backend, options)).await?;
    Ok(Json(ErrorResponse::ok()))
}

pub(super) async fn remove(
    State(registry): State<VolumeRegistry>,
    body: Bytes,
) -> ApiResult<ErrorResponse> {
    let req: NameRequest = decode(&body)?;

    run_blocking(move || registry.remove(&req.name)).await?;
    Ok(Json(ErrorResponse::ok()))
}

pub(super) async fn path(
    State(registry): State<VolumeRegistry>,
    body: Bytes,
) -> ApiResult<MountpointResponse> {
    let req: NameRequest = decode(&body)?;

    let mountpoint = run_blocking(move || registry.path(&req.name)).await?;
    Ok(Json(MountpointResponse {
        mountpoint: mountpoint.display().to_string(),
    }))
}

pub(super) async fn mount(
    State(registry): State<VolumeRegistry>,
    body: Bytes,
) -> ApiResult<MountpointResponse> {
    let req: MountRequest = decode(&body)?;
    tracing::debug!(volume = %req.name, caller = %req.id, "Mount requested");

    let mountpoint = run_blocking(move || registry.mount(&req.name)).await?;
    Ok(Json(MountpointResponse {
        mountpoint: mountpoint.display().to_string(),
    }))
}

pub(super) async fn unmount(
    State(registry): State<VolumeRegistry>,
    body: Bytes,
) -> ApiResult<ErrorResponse> {
    let req: MountRequest = decode(&body)?;
    tracing::debug!(volume = %req.name, caller = %req.id, "Unmount requested");

    run_blocking(move || registry.unmount(&req.name)).await?;
    Ok(Json(ErrorResponse::ok()))
}

pub(super) async fn get(
    State(registry): State<VolumeRegistry>,
    body: Bytes,
) -> ApiResult<GetResponse> {
    let req: NameRequest = decode(&body)?;

    let summary = run_blocking(move || registry.get(&req.name)).await?;
    Ok(Json(GetResponse {
        volume: volume_info(summary, true),
    }))
}

pub(super) async fn list(State(registry): State<VolumeRegistry>) -> ApiResult<ListResponse> {
    let volumes = run_blocking(move || registry.list()).await?;
    Ok(Json(ListResponse {
        volumes: volumes.into_iter().map(|v| volume_info(v, false)).collect(),
    }))
}

pub(super) async fn capabilities(
    State(registry): State<VolumeRegistry>,
) -> Json<CapabilitiesResponse> {
    Json(CapabilitiesResponse::with_scope(registry.capabilities().as_str()))
}
