use actix_web::ResponseError;
use anyhow::Error as ANYHOW_ERROR;
use cosmos_sdk_proto::prost::DecodeError as DECODE_ERROR;
use reqwest::Error as REQWEST_ERROR;
use serde_json::Error as JSON_ERROR;
use std::num::TryFromIntError as TRY_FROM_INT_ERROR;
use std::{io::Error as IO_ERROR, num::ParseIntError};
use thiserror::Error;
use tokio::task::JoinError;
use tokio::time::error::Elapsed;
use tonic::transport::Error as TRANSPORT_ERROR;
use tonic::Status;
use tracing::subscriber::SetGlobalDefaultError as TRACING_GLOBAL_DEFAULT_ERROR;
use url::ParseError as URL_ERROR;

#[derive(Error, Debug)]
pub enum Error {
    #[error("{0}")]
    Io(#[from] IO_ERROR),

    #[error("{0}")]
    URL(#[from] URL_ERROR),

    #[error("{0}")]
    INT(#[from] ParseIntError),

    #[error("{0}")]
    TokioJoinError(#[from] JoinError),

    #[error("{0}")]
    TokioElapsedError(#[from] Elapsed),

    #[error("Field not exists: {0}")]
    FieldNotExist(String),

    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    #[error("{0}")]
    JsonError(#[from] JSON_ERROR),

    #[error("Task message error: {0}")]
    TaskError(String),

    #[error("{0}")]
    DecodeError(#[from] DECODE_ERROR),

    #[error("Tracing error: {0}")]
    SetGlobalDefaultError(#[from] TRACING_GLOBAL_DEFAULT_ERROR),

    #[error("{0}")]
    TryFromIntError(#[from] TRY_FROM_INT_ERROR),

    #[error("{0}")]
    AnyHowError(#[from] ANYHOW_ERROR),

    #[error("{0}")]
    ReqwestError(#[from] REQWEST_ERROR),

    #[error("{0}")]
    TransportError(#[from] TRANSPORT_ERROR),

    #[error("{0}")]
    TonicStatus(Box<Status>),

    #[error("Malformed amount: {0}")]
    MalformedAmount(String),

    #[error("Not expected type: {0}")]
    NotExpectedType(String),

    #[error("Unknown message type: {0}")]
    UnknownMessageType(String),

    #[error("TypeURL is not in a recognized format: {0}")]
    TypeUrlFormat(String),

    #[error("Upstream responded with status {status}: {message}")]
    Upstream { status: u16, message: String },

    #[error("Error fetching height {height}: {source}")]
    RangeFetch {
        height: u64,
        #[source]
        source: Box<Error>,
    },

    #[error("Request cancelled")]
    Cancelled,
}

impl From<Status> for Error {
    fn from(status: Status) -> Self {
        Error::TonicStatus(Box::new(status))
    }
}

impl Error {
    /// Errors worth another attempt against the same endpoint.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::TokioElapsedError(_) => true,
            Error::ReqwestError(err) => err.is_timeout(),
            Error::Upstream { status, .. } => *status >= 500,
            Error::TonicStatus(status) => matches!(
                status.code(),
                tonic::Code::DeadlineExceeded | tonic::Code::Unavailable
            ),
            Error::AnyHowError(err) => err
                .downcast_ref::<Error>()
                .is_some_and(Error::is_retryable),
            _ => false,
        }
    }
}

impl ResponseError for Error {}
