use std::sync::Arc;

use chrono::Utc;
use poem::{Endpoint, Middleware, Request, Result as PoemResult, http::Method};

use crate::{
    application::services::auth_gate::{
        AuthGate, InboundRequest, NONCE_HEADER, SIGNATURE_HEADER, TIMESTAMP_HEADER, TOKEN_HEADER,
    },
    presentation::http::mappers::domain_error,
};

/// Applies the inbound auth rules to mutating requests. Reads stay public.
pub struct AuthGateMiddleware {
    gate: Arc<AuthGate>,
}

impl AuthGateMiddleware {
    pub fn new(gate: Arc<AuthGate>) -> Self {
        Self { gate }
    }
}

impl<E: Endpoint> Middleware<E> for AuthGateMiddleware {
    type Output = AuthGateEndpoint<E>;

    fn transform(&self, ep: E) -> Self::Output {
        AuthGateEndpoint {
            inner: ep,
            gate: self.gate.clone(),
        }
    }
}

pub struct AuthGateEndpoint<E> {
    inner: E,
    gate: Arc<AuthGate>,
}

impl<E: Endpoint> Endpoint for AuthGateEndpoint<E> {
    type Output = E::Output;

    async fn call(&self, mut req: Request) -> PoemResult<Self::Output> {
        let guarded = matches!(*req.method(), Method::POST | Method::PUT | Method::DELETE);
        if !guarded || self.gate.is_open() {
            return self.inner.call(req).await;
        }

        // The signature covers the body, so buffer it and put it back.
        let body = req.take_body().into_bytes().await?;
        req.set_body(body.clone());

        self.authorize(&req, &body)?;

        self.inner.call(req).await
    }
}

impl<E> AuthGateEndpoint<E> {
    fn authorize(&self, req: &Request, body: &[u8]) -> PoemResult<()> {
        let client_ip = client_ip(req);
        let header = |name: &str| req.headers().get(name).and_then(|v| v.to_str().ok());
        let inbound = InboundRequest {
            client_ip: &client_ip,
            token: header(TOKEN_HEADER),
            timestamp: header(TIMESTAMP_HEADER),
            nonce: header(NONCE_HEADER),
            signature: header(SIGNATURE_HEADER),
            body,
        };
        self.gate
            .authenticate(&inbound, Utc::now().timestamp())
            .map_err(domain_error)
    }
}

/// First `X-Forwarded-For` hop, then `X-Real-IP`, then the socket peer.
fn client_ip(req: &Request) -> String {
    let forwarded = req
        .headers()
        .get("X-Forwarded-For")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty());
    let real_ip = req
        .headers()
        .get("X-Real-IP")
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty());

    forwarded
        .or(real_ip)
        .map(str::to_string)
        .or_else(|| {
            req.remote_addr()
                .as_socket_addr()
                .map(|addr| addr.ip().to_string())
        })
        .unwrap_or_default()
}
