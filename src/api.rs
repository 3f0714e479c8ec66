mod bank;

use crate::domain::{BalanceStore, Withdrawals};
use anyhow::{Context, Result};
use axum::{
    body::Body,
    http::{HeaderMap, Request, StatusCode},
    routing::get,
    Router,
};
use opentelemetry::{global, propagation::Extractor, trace::TraceContextExt};
use serde::Deserialize;
use std::net::IpAddr;
use tokio::{
    net::TcpListener,
    signal::unix::{signal, SignalKind},
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{field, info, info_span, warn, Span};
use tracing_opentelemetry::OpenTelemetrySpanExt;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    addr: IpAddr,
    port: u16,
}

#[derive(Debug, OpenApi)]
#[openapi()]
pub struct ApiDoc;

pub async fn serve<S>(config: Config, withdrawals: Withdrawals<S>) -> Result<()>
where
    S: BalanceStore,
{
    let Config { addr, port } = config;

    let app = app(withdrawals).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http().make_span_with(make_span))
            .layer(CorsLayer::permissive())
            .map_request(accept_trace)
            .map_request(record_trace_id),
    );

    let listener = TcpListener::bind((addr, port))
        .await
        .context("bind TcpListener")?;
    info!(%addr, port, "listening");

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("run server")
}

fn app<S>(withdrawals: Withdrawals<S>) -> Router
where
    S: BalanceStore,
{
    let app_state = AppState { withdrawals };

    let mut api_doc = ApiDoc::openapi();
    api_doc.merge(bank::ApiDoc::openapi());

    Router::new()
        .route("/", get(ready))
        .nest("/bank", bank::app())
        .merge(SwaggerUi::new("/api-doc").url("/openapi.json", api_doc))
        .with_state(app_state)
}

#[derive(Debug, Clone)]
struct AppState<S> {
    withdrawals: Withdrawals<S>,
}

async fn ready() -> StatusCode {
    StatusCode::OK
}

async fn shutdown_signal() {
    let terminate = async {
        signal(SignalKind::terminate())
            .expect("install SIGTERM handler")
            .recv()
            .await;
    };

    tokio::select! {
        _ = terminate => {}
        _ = tokio::signal::ctrl_c() => {}
    }

    info!("received shutdown signal");
}

fn make_span(request: &Request<Body>) -> Span {
    let headers = request.headers();
    let method = request.method().as_str();
    let path = request.uri().path();
    info_span!("incoming request", method, path, ?headers, trace_id = field::Empty)
}

struct HeaderExtractor<'a>(&'a HeaderMap);

impl<'a> Extractor for HeaderExtractor<'a> {
    fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(|v| {
            let s = v.to_str();
            if let Err(ref error) = s {
                warn!(%error, ?v, "cannot convert header value to ASCII")
            };
            s.ok()
        })
    }

    fn keys(&self) -> Vec<&str> {
        self.0.keys().map(|k| k.as_str()).collect()
    }
}

fn accept_trace(request: Request<Body>) -> Request<Body> {
    // Current context, if no or invalid data is received.
    let parent_context = global::get_text_map_propagator(|propagator| {
        propagator.extract(&HeaderExtractor(request.headers()))
    });
    Span::current().set_parent(parent_context);

    request
}

fn record_trace_id(request: Request<Body>) -> Request<Body> {
    let span = Span::current();

    let trace_id = span.context().span().span_context().trace_id();
    span.record("trace_id", trace_id.to_string());

    request
}
