//! Shared helpers for router-level integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, Response},
    Router,
};
use pinpoint::app::create_app;
use pinpoint::geo::{GeoError, GeoLocation, GeoProvider, GeoResolver};
use pinpoint::storage::{MemoryStorage, Storage};
use pinpoint::tracking::VisitRecorder;
use serde_json::Value;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;
use tower::Layer;

pub const PUBLIC_URL: &str = "https://track.example";

/// Provider double answering with fixed coordinates after an optional delay
pub struct StubProvider {
    pub latitude: f64,
    pub longitude: f64,
    pub delay: Duration,
}

#[async_trait]
impl GeoProvider for StubProvider {
    fn name(&self) -> &'static str {
        "stub"
    }

    async fn lookup(&self, ip: IpAddr) -> Result<GeoLocation, GeoError> {
        tokio::time::sleep(self.delay).await;
        Ok(GeoLocation {
            ip: Some(ip.to_string()),
            city: Some("Warsaw".to_string()),
            country: Some("Poland".to_string()),
            country_code: Some("PL".to_string()),
            latitude: Some(self.latitude),
            longitude: Some(self.longitude),
            source: Some("stub".to_string()),
            ..Default::default()
        })
    }
}

pub struct TestApp {
    pub router: Router,
    pub storage: Arc<dyn Storage>,
    pub recorder: Arc<VisitRecorder>,
}

pub fn create_test_app(lookup_delay: Duration) -> TestApp {
    create_test_app_from(SocketAddr::from(([127, 0, 0, 1], 12345)), lookup_delay)
}

pub fn create_test_app_from(peer: SocketAddr, lookup_delay: Duration) -> TestApp {
    let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
    let provider: Arc<dyn GeoProvider> = Arc::new(StubProvider {
        latitude: 52.2297,
        longitude: 21.0122,
        delay: lookup_delay,
    });
    let resolver = Arc::new(GeoResolver::new(vec![provider], 100, Duration::from_secs(60)));
    let recorder = Arc::new(VisitRecorder::new(Arc::clone(&storage), resolver, 64));

    let router = create_app(Arc::clone(&storage), Arc::clone(&recorder), PUBLIC_URL, None)
        .layer(TestConnectInfoLayer { peer });

    TestApp {
        router,
        storage,
        recorder,
    }
}

/// Helper layer to inject ConnectInfo for tests
#[derive(Clone)]
pub struct TestConnectInfoLayer {
    peer: SocketAddr,
}

impl<S> Layer<S> for TestConnectInfoLayer {
    type Service = TestConnectInfoMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        TestConnectInfoMiddleware {
            inner,
            peer: self.peer,
        }
    }
}

#[derive(Clone)]
pub struct TestConnectInfoMiddleware<S> {
    inner: S,
    peer: SocketAddr,
}

impl<S, B> tower::Service<Request<B>> for TestConnectInfoMiddleware<S>
where
    S: tower::Service<Request<B>> + Clone,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = S::Future;

    fn poll_ready(
        &mut self,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<B>) -> Self::Future {
        req.extensions_mut()
            .insert(axum::extract::connect_info::ConnectInfo(self.peer));
        self.inner.call(req)
    }
}

pub fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn get_request(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

pub async fn body_string(response: Response<Body>) -> String {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(body.to_vec()).unwrap()
}

pub async fn body_json(response: Response<Body>) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

/// Pull a `const name = "value";` literal out of the interstitial script
pub fn script_constant(html: &str, name: &str) -> String {
    let marker = format!("const {name} = \"");
    let start = html.find(&marker).expect("constant present") + marker.len();
    let end = start + html[start..].find('"').expect("closing quote");
    html[start..end].to_string()
}
