pub mod config;
pub mod response;

use std::sync::Arc;
use std::time::Duration;

use actix_web::http::StatusCode;
use actix_web::middleware::from_fn;
use actix_web::web::{self, Data, ServiceConfig};
use actix_web::{HttpRequest, HttpResponse, HttpServer};
use anyhow::{Context, Result};
use log::{debug, info};
use sd_notify::NotifyState;

use crate::gateway::guard::KeyGuard;
use crate::gateway::middleware::gateway_key;

use self::response::{CommonResponse, DataResponse, HealthzData};

/// Forward-auth server: every request is checked by the gateway key
/// middleware and answered with `200` once allowed.
pub struct RestfulServer {
    bind: String,
    ctx: Arc<RestfulContext>,

    keep_alive_secs: Option<u64>,
    workers: Option<u64>,
}

pub struct RestfulContext {
    pub enabled: bool,
    pub guard: Arc<KeyGuard>,
}

impl RestfulServer {
    const HEALTHZ_PATH: &str = "/healthz";

    pub fn new(bind: String, ctx: Arc<RestfulContext>) -> Self {
        Self {
            bind,
            ctx,
            keep_alive_secs: None,
            workers: None,
        }
    }

    pub fn set_keep_alive_secs(&mut self, keep_alive_secs: u64) {
        self.keep_alive_secs = Some(keep_alive_secs);
    }

    pub fn set_workers(&mut self, workers: u64) {
        self.workers = Some(workers);
    }

    pub async fn run(self) -> Result<()> {
        let ctx = self.ctx.clone();
        let mut srv = HttpServer::new(move || {
            actix_web::App::new()
                .app_data(Data::from(ctx.clone()))
                .app_data(Data::from(ctx.guard.clone()))
                .configure(Self::routes)
        });

        info!("Binding to http://{}", self.bind);
        srv = srv.bind(&self.bind).context("bind server")?;

        if let Some(keep_alive) = self.keep_alive_secs {
            srv = srv.keep_alive(Duration::from_secs(keep_alive));
        }
        if let Some(workers) = self.workers {
            srv = srv.workers(workers as usize);
        }

        sd_notify::notify(true, &[NotifyState::Ready]).context("notify systemd")?;
        info!("Starting restful server");
        srv.run().await.context("run server")?;

        info!("Server stopped by user");
        Ok(())
    }

    /// Registers the routes. Expects `Data<RestfulContext>` and
    /// `Data<KeyGuard>` in the app data.
    pub fn routes(cfg: &mut ServiceConfig) {
        cfg.service(web::resource(Self::HEALTHZ_PATH).route(web::get().to(Self::handle_healthz)))
            .service(
                web::scope("")
                    .wrap(from_fn(gateway_key))
                    .default_service(web::route().to(Self::default_handler)),
            );
    }

    async fn handle_healthz(ctx: Data<RestfulContext>) -> HttpResponse {
        HttpResponse::Ok().json(DataResponse {
            code: StatusCode::OK.into(),
            data: HealthzData {
                enabled: ctx.enabled,
                synced: ctx.guard.is_synced(),
            },
        })
    }

    async fn default_handler(req: HttpRequest) -> HttpResponse {
        debug!("Allow {} {}", req.method(), req.uri().path());
        HttpResponse::Ok().json(CommonResponse {
            code: StatusCode::OK.into(),
            message: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use actix_web::{test, App};

    use crate::authz::config::{AuthorizationConfig, PathRule};
    use crate::authz::PolicyStore;
    use crate::errors::ErrorBody;
    use crate::resource::KeyCredential;
    use crate::sync::SyncState;

    use super::*;

    fn context() -> Arc<RestfulContext> {
        let store = PolicyStore::new(&AuthorizationConfig {
            enable_paths: vec![],
            public_paths: vec![PathRule::new("/status", "GET", false)],
            protected_paths: vec![],
        })
        .unwrap();
        Arc::new(RestfulContext {
            enabled: true,
            guard: Arc::new(KeyGuard::new(store)),
        })
    }

    #[actix_web::test]
    async fn test_routes() {
        let ctx = context();
        let app = test::init_service(
            App::new()
                .app_data(Data::from(ctx.clone()))
                .app_data(Data::from(ctx.guard.clone()))
                .configure(RestfulServer::routes),
        )
        .await;

        let req = test::TestRequest::get().uri("/healthz").to_request();
        let resp: DataResponse<HealthzData> = test::call_and_read_body_json(&app, req).await;
        assert_eq!(
            resp.data,
            HealthzData {
                enabled: true,
                synced: false
            }
        );

        // Not synced yet, everything passes.
        let req = test::TestRequest::delete().uri("/orders/1").to_request();
        let resp: CommonResponse = test::call_and_read_body_json(&app, req).await;
        assert_eq!(resp.code, 200);

        ctx.guard.publish(Arc::new(SyncState {
            resources: vec![],
            credential: Some(KeyCredential {
                key: "secret".to_string(),
                id: "cred-1".to_string(),
            }),
        }));

        let req = test::TestRequest::get().uri("/healthz").to_request();
        let resp: DataResponse<HealthzData> = test::call_and_read_body_json(&app, req).await;
        assert!(resp.data.synced);

        let req = test::TestRequest::delete().uri("/orders/1").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        let body: ErrorBody = test::read_body_json(resp).await;
        assert_eq!(body.name, "GatewayKeyNotFoundInHeader");

        let req = test::TestRequest::get().uri("/status").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }
}
