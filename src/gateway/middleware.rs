use actix_web::body::{EitherBody, MessageBody};
use actix_web::dev::{ServiceRequest, ServiceResponse};
use actix_web::error::ErrorInternalServerError;
use actix_web::http::header::HeaderValue;
use actix_web::middleware::Next;
use actix_web::web::Data;
use actix_web::Error;
use log::{debug, error};

use crate::authz::{Authorizer, AuthzRequest, Decision, GATEWAY_KEY_HEADER};

use super::guard::KeyGuard;

/// Checks the `x-gateway-key` header of every request before it reaches a
/// handler. Use with [`actix_web::middleware::from_fn`], the [`KeyGuard`]
/// must be registered as `Data<KeyGuard>`.
///
/// Rejected requests get the error record's status and a `{name, message}`
/// JSON body.
pub async fn gateway_key(
    req: ServiceRequest,
    next: Next<impl MessageBody>,
) -> Result<ServiceResponse<EitherBody<impl MessageBody>>, Error> {
    let decision = {
        let guard = match req.app_data::<Data<KeyGuard>>() {
            Some(guard) => guard,
            None => {
                error!("Gateway key guard is not registered, refuse request");
                return Err(ErrorInternalServerError("gateway key guard not configured"));
            }
        };
        let key = req
            .headers()
            .get(GATEWAY_KEY_HEADER)
            .map(HeaderValue::as_bytes);
        let authz = AuthzRequest {
            path: req.path(),
            method: req.method().as_str(),
            key,
        };
        guard.authorize_request(&authz)
    };

    match decision {
        Decision::Allow => {
            let resp = next.call(req).await?;
            Ok(resp.map_into_left_body())
        }
        Decision::Reject(kind) => {
            let record = kind.record();
            debug!(
                "Reject {} {}: {} ({})",
                req.method(),
                req.path(),
                record.name,
                record.return_code
            );
            let resp = req.into_response(record.to_response());
            Ok(resp.map_into_right_body())
        }
    }
}
