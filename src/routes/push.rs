use axum::{
    extract::{rejection::JsonRejection, State},
    headers::{authorization::Bearer, Authorization},
    response::Json,
    routing::{get, post},
    Router, TypedHeader,
};
use std::sync::Arc;
use tracing::debug;
use validator::Validate;

use crate::{
    error::{AppError, Result},
    models::{
        push::{NotificationPayload, PushSubscription, UnsubscribeRequest},
        response::{BroadcastResponse, OkResponse, VapidKeyResponse},
    },
    state::AppState,
    utils::endpoint::redact_endpoint,
};

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/subscribe", post(subscribe))
        .route("/unsubscribe", post(unsubscribe))
        .route("/vapid-public-key", get(vapid_public_key))
        .route("/broadcast", post(broadcast))
}

/// 保存浏览器推送订阅；请求体无法解析时同样返回 400
async fn subscribe(
    State(app_state): State<Arc<AppState>>,
    request: std::result::Result<Json<PushSubscription>, JsonRejection>,
) -> Result<Json<OkResponse>> {
    let Json(subscription) = request?;
    app_state.subscriptions.upsert(&subscription).await?;

    debug!("Push subscription enrolled: {}", redact_endpoint(&subscription.endpoint));
    Ok(Json(OkResponse::ok()))
}

/// 删除推送订阅；请求体可省略，未知 endpoint 也返回成功
async fn unsubscribe(
    State(app_state): State<Arc<AppState>>,
    request: Option<Json<UnsubscribeRequest>>,
) -> Result<Json<OkResponse>> {
    let endpoint = request
        .and_then(|Json(request)| request.endpoint)
        .filter(|endpoint| !endpoint.trim().is_empty());

    if let Some(endpoint) = endpoint {
        app_state.subscriptions.remove(&endpoint).await?;
        debug!("Push subscription removed: {}", redact_endpoint(&endpoint));
    }

    Ok(Json(OkResponse::ok()))
}

/// 浏览器订阅时需要的 applicationServerKey
async fn vapid_public_key(
    State(app_state): State<Arc<AppState>>,
) -> Result<Json<VapidKeyResponse>> {
    let key = app_state.vapid.public_key()?.to_string();
    Ok(Json(VapidKeyResponse { key }))
}

/// 向所有订阅广播，需要管理员令牌
async fn broadcast(
    State(app_state): State<Arc<AppState>>,
    auth: Option<TypedHeader<Authorization<Bearer>>>,
    request: std::result::Result<Json<NotificationPayload>, JsonRejection>,
) -> Result<Json<BroadcastResponse>> {
    let expected = app_state
        .config
        .push_admin_token
        .as_deref()
        .ok_or_else(|| AppError::forbidden("Broadcast is disabled: PUSH_ADMIN_TOKEN is not set"))?;

    match auth {
        Some(TypedHeader(Authorization(bearer))) if bearer.token() == expected => {}
        _ => return Err(AppError::unauthorized("Invalid broadcast token")),
    }

    let Json(payload) = request?;
    payload.validate()?;

    let attempted = app_state.dispatcher.broadcast(&payload).await?;
    debug!("Broadcast request for \"{}\" finished", payload.title);

    Ok(Json(BroadcastResponse { attempted }))
}
