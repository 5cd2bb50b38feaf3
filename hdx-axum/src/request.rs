use std::collections::HashMap;
use std::net::SocketAddr;

use axum::extract::{ConnectInfo, FromRequest, Request};
use axum::http::header;
use axum::Form;
use hdx_core::GatewayRequest;

/// Build the transport-agnostic request from an axum request.
///
/// The host comes from the `Host` header (or the URI authority), the peer
/// from `ConnectInfo` when the server was started with it. A body that is not
/// a urlencoded form leaves `form` empty.
pub async fn from_axum(req: Request) -> GatewayRequest {
    let (parts, body) = req.into_parts();

    let host = parts
        .headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .or_else(|| parts.uri.authority().map(|a| a.to_string()))
        .unwrap_or_default();

    let path = parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| parts.uri.path().to_string());

    let mut out = GatewayRequest::new(parts.method.as_str(), host, path);

    for (k, v) in parts.headers.iter() {
        if let Ok(s) = v.to_str() {
            out.headers.insert(k.as_str().to_ascii_lowercase(), s.to_string());
        }
    }

    out.peer = parts
        .extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string());

    let req = Request::from_parts(parts, body);
    if let Ok(Form(form)) = Form::<HashMap<String, String>>::from_request(req, &()).await {
        out.form = form;
    }

    out
}
