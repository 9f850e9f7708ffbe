use actix_web::{get, web, HttpResponse, Responder};
use serde::Serialize;

use crate::{
    configuration::{AppState, State},
    error::Error,
    router::DecodeStatsSnapshot,
};

#[get("/health")]
async fn index(
    state: web::Data<AppState<State>>,
) -> Result<impl Responder, Error> {
    const VERSION: Option<&str> = option_env!("CARGO_PKG_VERSION");

    Ok(HttpResponse::Ok().json(Response {
        status: "ok",
        version: VERSION,
        chain_id: &state.config.chain_id,
        decode: state.stats.snapshot(),
    }))
}

#[derive(Debug, Serialize)]
pub struct Response<'a> {
    pub status: &'a str,
    pub version: Option<&'a str>,
    pub chain_id: &'a str,
    pub decode: DecodeStatsSnapshot,
}
