use crate::{
    error::{AppError, DOWNLOAD_FAILED, VIDEO_INFO_FAILED},
    gateway::{content_disposition, Delivery},
    models::{
        lenient_json, DeprecatedResponse, DownloadRequest, DownloadResponse, VideoInfoRequest,
        VideoInfoResponse,
    },
    AppState,
};
use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

// ===================================================================
//                          DOWNLOAD HANDLERS
// ===================================================================

/// # POST /download - Resolves a link and returns either its URLs or the video bytes.
pub async fn download(State(state): State<AppState>, body: Bytes) -> Result<Response, AppError> {
    let payload: DownloadRequest = lenient_json(&body);
    let request = payload
        .into_extraction()
        .map_err(|e| AppError::from_gateway(e, DOWNLOAD_FAILED))?;

    let delivery = state
        .gateway
        .run(&request)
        .await
        .map_err(|e| AppError::from_gateway(e, DOWNLOAD_FAILED))?;

    Ok(delivery.into_response())
}

/// # POST /video-info - Secondary lookup for the audio track.
pub async fn video_info(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<impl IntoResponse, AppError> {
    let payload: VideoInfoRequest = lenient_json(&body);
    let request = payload
        .into_extraction()
        .map_err(|e| AppError::from_gateway(e, VIDEO_INFO_FAILED))?;

    let track = state
        .gateway
        .audio_info(&request)
        .await
        .map_err(|e| AppError::from_gateway(e, VIDEO_INFO_FAILED))?;

    Ok((StatusCode::OK, Json(VideoInfoResponse::from(track))))
}

/// # POST /download-audio - Retired; audio comes from `/video-info` now.
pub async fn download_audio() -> impl IntoResponse {
    (
        StatusCode::BAD_REQUEST,
        Json(DeprecatedResponse {
            error: "This endpoint is deprecated",
            message: "Direct audio download is no longer supported; use /video-info to get the audio URL",
        }),
    )
}

/// # GET /health
pub async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

impl IntoResponse for Delivery {
    fn into_response(self) -> Response {
        match self {
            Delivery::Reference(result) => {
                (StatusCode::OK, Json(DownloadResponse::from(result))).into_response()
            }
            Delivery::Media { filename, bytes } => {
                let disposition = HeaderValue::from_str(&content_disposition(&filename))
                    .unwrap_or_else(|_| HeaderValue::from_static("attachment"));
                (
                    StatusCode::OK,
                    [
                        (header::CONTENT_TYPE, HeaderValue::from_static("video/mp4")),
                        (header::CONTENT_DISPOSITION, disposition),
                    ],
                    bytes,
                )
                    .into_response()
            }
        }
    }
}
