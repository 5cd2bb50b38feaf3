use std::net::SocketAddr;

use axum::extract::{Request, State};
use axum::response::IntoResponse;
use axum::Router;
use tokio::net::{TcpListener, ToSocketAddrs};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::gateway::Gateway;
use crate::request::from_axum;
use crate::HdxAxumState;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

pub struct AxumApp {
    pub state: HdxAxumState,
    pub router: Router<()>,
}

impl Clone for AxumApp {
    fn clone(&self) -> Self {
        Self {
            state: self.state.clone(),
            router: self.router.clone(),
        }
    }
}

impl AxumApp {
    /// Every path goes through the gateway pipeline; resources are routed by
    /// the module registry, not by axum.
    pub fn new(gateway: Gateway) -> Self {
        let state = HdxAxumState::new(gateway);
        let request_id = axum::http::HeaderName::from_static(REQUEST_ID_HEADER);

        let router = Router::new()
            .fallback(gateway_handler)
            .with_state(state.clone())
            .layer(PropagateRequestIdLayer::new(request_id.clone()))
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::new(request_id, MakeRequestUuid));

        Self { state, router }
    }

    pub fn gateway(&self) -> &Gateway {
        &self.state.gateway
    }

    pub async fn listen<A>(self, addr: A) -> anyhow::Result<()>
    where
        A: ToSocketAddrs,
    {
        let listener = TcpListener::bind(addr).await?;
        info!(addr = %listener.local_addr()?, modules = ?self.gateway().registry().names(), "listening");
        axum::serve(
            listener,
            self.router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await?;
        Ok(())
    }
}

async fn gateway_handler(State(state): State<HdxAxumState>, req: Request) -> impl IntoResponse {
    let req = from_axum(req).await;
    state.gateway.handle(req).await
}

pub fn axum(gateway: Gateway) -> AxumApp {
    AxumApp::new(gateway)
}
