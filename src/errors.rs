use actix_web::http::StatusCode;
use actix_web::{HttpResponse, HttpResponseBuilder};
use serde::{Deserialize, Serialize};

pub type RetCode = i32;

pub const GATEWAY_KEY_NOT_FOUND_IN_HEADER: RetCode = 3001;
pub const GATEWAY_KEY_INVALID: RetCode = 3002;

/// Symbolic names of the errors a request can be rejected with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    GatewayKeyNotFoundInHeader,
    GatewayKeyInvalid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrorRecord {
    pub name: &'static str,
    pub message: &'static str,
    pub return_code: RetCode,
    pub status_code: u16,
}

/// JSON body written back to the caller when a request is rejected.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorBody {
    pub name: String,
    pub message: String,
}

const KEY_NOT_FOUND_IN_HEADER: ErrorRecord = ErrorRecord {
    name: "GatewayKeyNotFoundInHeader",
    message: "X-GateWay-Key not found in headers",
    return_code: GATEWAY_KEY_NOT_FOUND_IN_HEADER,
    status_code: 401,
};

const KEY_INVALID: ErrorRecord = ErrorRecord {
    name: "GatewayKeyInvalid",
    message: "X-GateWay-Key invalid",
    return_code: GATEWAY_KEY_INVALID,
    status_code: 400,
};

impl ErrorKind {
    pub fn record(self) -> &'static ErrorRecord {
        match self {
            ErrorKind::GatewayKeyNotFoundInHeader => &KEY_NOT_FOUND_IN_HEADER,
            ErrorKind::GatewayKeyInvalid => &KEY_INVALID,
        }
    }
}

impl ErrorRecord {
    pub fn status(&self) -> StatusCode {
        StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    pub fn body(&self) -> ErrorBody {
        ErrorBody {
            name: self.name.to_string(),
            message: self.message.to_string(),
        }
    }

    pub fn to_response(&self) -> HttpResponse {
        HttpResponseBuilder::new(self.status()).json(self.body())
    }
}
