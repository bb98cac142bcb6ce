use std::sync::Arc;

use actix_web::{
    get, middleware, post,
    web::{self, Data},
    App, HttpRequest, HttpResponse, HttpServer, Responder,
};
use kube::{
    core::{admission::AdmissionReview, DynamicObject},
    Client,
};
use lbcfd_cert::util::{load_certificates_from_pem, load_private_key_from_file};
use lbcfd_driver::client::DriverClient;
use lbcfd_trace::init::{prepare_tracing, TraceConfig};
use prometheus::{Encoder, TextEncoder};
use rustls::ServerConfig;

use super::{
    admission::{handle_mutation, handle_validation},
    config::Config,
    error::ServerError,
};
use crate::{
    context::{Context, State},
    crd::{
        backend_group::BackendGroup, backend_record::BackendRecord, bind::Bind,
        load_balancer::LoadBalancer, load_balancer_driver::LoadBalancerDriver,
    },
    lister::Lookups,
};

/// Largest AdmissionReview body accepted.
const MAX_REVIEW_SIZE: usize = 4 * 1024 * 1024;

pub fn start(config: Config, trace: TraceConfig) -> Result<(), ServerError> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(ServerError::StdIo)?
        .block_on(run(config, trace))
}

#[tracing::instrument(skip_all)]
async fn run(config: Config, trace: TraceConfig) -> Result<(), ServerError> {
    prepare_tracing(trace).map_err(ServerError::Trace)?;

    // Configure TLS settings
    let cert_chain = load_certificates_from_pem(&config.tls.cert).map_err(ServerError::Cert)?;
    let private_key = load_private_key_from_file(&config.tls.key).map_err(ServerError::Cert)?;
    let server_config = ServerConfig::builder()
        .with_safe_defaults()
        .with_no_client_auth()
        .with_single_cert(cert_chain, private_key)
        .map_err(ServerError::Tls)?;

    let client = Client::try_default().await.map_err(ServerError::Kube)?;
    let drivers = DriverClient::http().map_err(ServerError::Driver)?;

    let state = State::new("webhook");
    let ctx = state
        .to_context(Lookups::from_client(client), drivers)
        .map_err(ServerError::Metrics)?;

    tracing::info!(
        http_port = config.http_port,
        https_port = config.https_port,
        "Start admission webhook server"
    );
    HttpServer::new(move || {
        App::new()
            .configure(app(state.clone(), ctx.clone()))
            .wrap(
                middleware::Logger::default()
                    .exclude("/healthz")
                    .exclude("/readyz"),
            )
    })
    .bind_rustls_021(format!("0.0.0.0:{}", config.https_port), server_config)?
    .bind(format!("0.0.0.0:{}", config.http_port))?
    .shutdown_timeout(5)
    .run()
    .await?;
    Ok(())
}

/// Shared state and every route of the admission server.
pub fn app(state: State, ctx: Arc<Context>) -> impl FnOnce(&mut web::ServiceConfig) {
    move |cfg| {
        cfg.app_data(Data::new(state))
            .app_data(Data::from(ctx))
            .app_data(web::JsonConfig::default().limit(MAX_REVIEW_SIZE));
        routes(cfg);
    }
}

pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.service(index)
        .service(health)
        .service(ready)
        .service(metrics_)
        .service(driver_health)
        .service(load_balancer_mutating_webhook)
        .service(load_balancer_validating_webhook)
        .service(load_balancer_driver_mutating_webhook)
        .service(load_balancer_driver_validating_webhook)
        .service(backend_group_mutating_webhook)
        .service(backend_group_validating_webhook)
        .service(backend_record_validating_webhook)
        .service(bind_mutating_webhook)
        .service(bind_validating_webhook);
}

#[get("/healthz")]
async fn health(_: HttpRequest) -> impl Responder {
    HttpResponse::Ok().json("healthy")
}

#[get("/readyz")]
async fn ready(_: HttpRequest) -> impl Responder {
    HttpResponse::Ok().json("ready")
}

#[get("/metrics")]
async fn metrics_(c: Data<State>, _req: HttpRequest) -> impl Responder {
    let metrics = c.metrics();
    let encoder = TextEncoder::new();
    let mut buffer = vec![];
    match encoder.encode(&metrics, &mut buffer) {
        Ok(()) => HttpResponse::Ok().body(buffer),
        Err(e) => HttpResponse::InternalServerError().json(e.to_string()),
    }
}

#[get("/")]
async fn index(c: Data<State>, _req: HttpRequest) -> impl Responder {
    let d = c.diagnostics().await;
    HttpResponse::Ok().json(&d)
}

#[get("/drivers/{namespace}/{name}/healthz")]
async fn driver_health(ctx: Data<Context>, path: web::Path<(String, String)>) -> impl Responder {
    let (namespace, name) = path.into_inner();
    let driver = match ctx.lookups.drivers.get(&namespace, &name).await {
        Ok(Some(d)) => d,
        Ok(None) => {
            return HttpResponse::NotFound().json(format!("driver {namespace}/{name} not found"))
        }
        Err(e) => return HttpResponse::InternalServerError().json(e.to_string()),
    };
    let endpoint = match driver.endpoint() {
        Ok(ep) => ep,
        Err(e) => return HttpResponse::InternalServerError().json(e.to_string()),
    };
    match ctx.drivers.health(&endpoint).await {
        Ok(()) => HttpResponse::Ok().json("healthy"),
        Err(e) => {
            tracing::warn!(namespace, name, error=%e, "driver is unhealthy");
            HttpResponse::ServiceUnavailable().json(e.to_string())
        }
    }
}

#[post("/mutate-lbcf-tkestack-io-v1beta1-loadbalancer")]
async fn load_balancer_mutating_webhook(
    ctx: Data<Context>,
    req: HttpRequest,
    body: web::Json<AdmissionReview<DynamicObject>>,
) -> impl Responder {
    handle_mutation::<LoadBalancer>(&ctx, req, body).await
}

#[post("/validate-lbcf-tkestack-io-v1beta1-loadbalancer")]
async fn load_balancer_validating_webhook(
    ctx: Data<Context>,
    req: HttpRequest,
    body: web::Json<AdmissionReview<DynamicObject>>,
) -> impl Responder {
    handle_validation::<LoadBalancer>(&ctx, req, body).await
}

#[post("/mutate-lbcf-tkestack-io-v1beta1-loadbalancerdriver")]
async fn load_balancer_driver_mutating_webhook(
    ctx: Data<Context>,
    req: HttpRequest,
    body: web::Json<AdmissionReview<DynamicObject>>,
) -> impl Responder {
    handle_mutation::<LoadBalancerDriver>(&ctx, req, body).await
}

#[post("/validate-lbcf-tkestack-io-v1beta1-loadbalancerdriver")]
async fn load_balancer_driver_validating_webhook(
    ctx: Data<Context>,
    req: HttpRequest,
    body: web::Json<AdmissionReview<DynamicObject>>,
) -> impl Responder {
    handle_validation::<LoadBalancerDriver>(&ctx, req, body).await
}

#[post("/mutate-lbcf-tkestack-io-v1beta1-backendgroup")]
async fn backend_group_mutating_webhook(
    ctx: Data<Context>,
    req: HttpRequest,
    body: web::Json<AdmissionReview<DynamicObject>>,
) -> impl Responder {
    handle_mutation::<BackendGroup>(&ctx, req, body).await
}

#[post("/validate-lbcf-tkestack-io-v1beta1-backendgroup")]
async fn backend_group_validating_webhook(
    ctx: Data<Context>,
    req: HttpRequest,
    body: web::Json<AdmissionReview<DynamicObject>>,
) -> impl Responder {
    handle_validation::<BackendGroup>(&ctx, req, body).await
}

#[post("/validate-lbcf-tkestack-io-v1beta1-backendrecord")]
async fn backend_record_validating_webhook(
    ctx: Data<Context>,
    req: HttpRequest,
    body: web::Json<AdmissionReview<DynamicObject>>,
) -> impl Responder {
    handle_validation::<BackendRecord>(&ctx, req, body).await
}

#[post("/mutate-lbcf-tkestack-io-v1beta1-bind")]
async fn bind_mutating_webhook(
    ctx: Data<Context>,
    req: HttpRequest,
    body: web::Json<AdmissionReview<DynamicObject>>,
) -> impl Responder {
    handle_mutation::<Bind>(&ctx, req, body).await
}

#[post("/validate-lbcf-tkestack-io-v1beta1-bind")]
async fn bind_validating_webhook(
    ctx: Data<Context>,
    req: HttpRequest,
    body: web::Json<AdmissionReview<DynamicObject>>,
) -> impl Responder {
    handle_validation::<Bind>(&ctx, req, body).await
}
