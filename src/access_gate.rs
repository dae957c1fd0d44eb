// src/access_gate.rs

use std::collections::HashSet;
use std::future::Future;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use actix_web::{
    body::{BoxBody, MessageBody},
    dev::{Service, ServiceRequest, ServiceResponse, Transform},
    Error, HttpResponse,
};
use futures::future::{ok, Ready};
use log::warn;

use crate::errors::ConfigError;

/// IP allow-list decision. Immutable once built.
///
/// An empty list lets everything through. Otherwise a peer must match an
/// entry exactly, or be any loopback address when `127.0.0.1` is listed.
/// IPv4-mapped IPv6 peers are compared in their IPv4 form.
#[derive(Debug, Clone, Default)]
pub struct AccessGate {
    allowed: HashSet<IpAddr>,
    allow_loopback: bool,
}

impl AccessGate {
    /// Every non-blank entry must be an IP address; one bad entry rejects
    /// the whole list.
    pub fn from_entries<I, S>(entries: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut allowed = HashSet::new();
        for entry in entries {
            let entry = entry.as_ref().trim();
            if entry.is_empty() {
                continue;
            }
            let ip: IpAddr = entry
                .parse()
                .map_err(|_| ConfigError::InvalidAllowedIp(entry.to_string()))?;
            allowed.insert(ip.to_canonical());
        }

        let allow_loopback = allowed.contains(&IpAddr::V4(Ipv4Addr::LOCALHOST));
        Ok(AccessGate {
            allowed,
            allow_loopback,
        })
    }

    pub fn is_enabled(&self) -> bool {
        !self.allowed.is_empty()
    }

    pub fn is_allowed(&self, remote: IpAddr) -> bool {
        if !self.is_enabled() {
            return true;
        }
        let remote = remote.to_canonical();
        self.allowed.contains(&remote) || (self.allow_loopback && remote.is_loopback())
    }

    /// Same decision for a textual peer, either `ip` or `ip:port`.
    /// Garbage is denied unless the gate is off.
    pub fn is_request_allowed(&self, remote_address: &str) -> bool {
        if !self.is_enabled() {
            return true;
        }
        let remote = remote_address.trim();
        remote
            .parse::<IpAddr>()
            .ok()
            .or_else(|| remote.parse::<SocketAddr>().ok().map(|addr| addr.ip()))
            .map(|ip| self.is_allowed(ip))
            .unwrap_or(false)
    }
}

/// Middleware answering `403 Access denied` to peers the gate rejects.
#[derive(Clone)]
pub struct IpAllowlist {
    gate: Arc<AccessGate>,
}

impl IpAllowlist {
    pub fn new(gate: Arc<AccessGate>) -> Self {
        IpAllowlist { gate }
    }
}

impl<S, B> Transform<S, ServiceRequest> for IpAllowlist
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: MessageBody + 'static,
{
    type Response = ServiceResponse<BoxBody>;
    type Error = Error;
    type Transform = IpAllowlistMiddleware<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(IpAllowlistMiddleware {
            service,
            gate: self.gate.clone(),
        })
    }
}

pub struct IpAllowlistMiddleware<S> {
    service: S,
    gate: Arc<AccessGate>,
}

impl<S, B> Service<ServiceRequest> for IpAllowlistMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: MessageBody + 'static,
{
    type Response = ServiceResponse<BoxBody>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    fn poll_ready(&self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.service.poll_ready(cx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        // unknown peer only passes when the gate is off
        let allowed = match req.connection_info().peer_addr() {
            Some(peer) => self.gate.is_request_allowed(peer),
            None => !self.gate.is_enabled(),
        };

        if !allowed {
            warn!(
                "Denied {} {} from {:?}",
                req.method(),
                req.path(),
                req.peer_addr()
            );
            let (req_parts, _payload) = req.into_parts();
            let resp = HttpResponse::Forbidden()
                .body("Access denied")
                .map_into_boxed_body();
            let srv_resp = ServiceResponse::new(req_parts, resp);
            return Box::pin(async move { Ok(srv_resp) });
        }

        let fut = self.service.call(req);
        Box::pin(async move {
            let res = fut.await?;
            Ok(res.map_into_boxed_body())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test as actix_test;
    use actix_web::{http::StatusCode, web, App};

    fn gate(entries: &[&str]) -> AccessGate {
        AccessGate::from_entries(entries).unwrap()
    }

    #[test]
    fn empty_list_allows_everyone() {
        let gate = gate(&[]);
        assert!(!gate.is_enabled());
        assert!(gate.is_request_allowed("8.8.8.8"));
        assert!(gate.is_request_allowed("not an address"));
    }

    #[test]
    fn blank_entries_are_ignored() {
        assert!(!gate(&["", "  "]).is_enabled());
    }

    #[test]
    fn localhost_entry_admits_both_loopback_forms() {
        let gate = gate(&["127.0.0.1"]);
        assert!(gate.is_request_allowed("127.0.0.1"));
        assert!(gate.is_request_allowed("::1"));
        assert!(gate.is_request_allowed("127.0.0.2"));
        assert!(!gate.is_request_allowed("10.0.0.5"));
    }

    #[test]
    fn other_entries_need_an_exact_match() {
        let gate = gate(&["10.0.0.5", "2001:db8::1"]);
        assert!(gate.is_request_allowed("10.0.0.5"));
        assert!(gate.is_request_allowed("10.0.0.5:51234"));
        assert!(gate.is_request_allowed("2001:db8::1"));
        assert!(gate.is_request_allowed("::ffff:10.0.0.5"));
        assert!(!gate.is_request_allowed("10.0.0.6"));
        assert!(!gate.is_request_allowed("127.0.0.1"));
        assert!(!gate.is_request_allowed("::1"));
    }

    #[test]
    fn ipv6_loopback_entry_does_not_open_all_loopback() {
        let gate = gate(&["::1"]);
        assert!(gate.is_request_allowed("::1"));
        assert!(!gate.is_request_allowed("127.0.0.1"));
    }

    #[test]
    fn garbage_peer_is_denied_when_enabled() {
        assert!(!gate(&["10.0.0.5"]).is_request_allowed("localhost"));
    }

    #[test]
    fn one_bad_entry_fails_the_whole_list() {
        let err = AccessGate::from_entries(["10.0.0.5", "10.0.0.300"]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidAllowedIp(ref entry) if entry == "10.0.0.300"));
    }

    async fn ping() -> HttpResponse {
        HttpResponse::Ok().body("pong")
    }

    #[actix_web::test]
    async fn middleware_blocks_unlisted_peers() {
        let gate = Arc::new(gate(&["127.0.0.1"]));
        let app = actix_test::init_service(
            App::new()
                .wrap(IpAllowlist::new(gate))
                .route("/ping", web::get().to(ping)),
        )
        .await;

        let req = actix_test::TestRequest::get()
            .uri("/ping")
            .peer_addr("10.0.0.5:40000".parse().unwrap())
            .to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
        let body = actix_test::read_body(resp).await;
        assert_eq!(body, web::Bytes::from_static(b"Access denied"));

        let req = actix_test::TestRequest::get()
            .uri("/ping")
            .peer_addr("[::1]:40000".parse().unwrap())
            .to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[actix_web::test]
    async fn middleware_denies_unknown_peer_when_enabled() {
        let app = actix_test::init_service(
            App::new()
                .wrap(IpAllowlist::new(Arc::new(gate(&["10.0.0.5"]))))
                .route("/ping", web::get().to(ping)),
        )
        .await;

        let req = actix_test::TestRequest::get().uri("/ping").to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }

    #[actix_web::test]
    async fn disabled_gate_lets_unknown_peer_through() {
        let app = actix_test::init_service(
            App::new()
                .wrap(IpAllowlist::new(Arc::new(AccessGate::default())))
                .route("/ping", web::get().to(ping)),
        )
        .await;

        let req = actix_test::TestRequest::get().uri("/ping").to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }
}
