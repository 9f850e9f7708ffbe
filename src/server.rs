use actix_web::{dev::Server, web, App, HttpServer};
use tracing::info;

use crate::{
    configuration::{AppState, State},
    controller::{health, task},
    error::Error,
};

pub async fn server_task(app_state: &AppState<State>) -> Result<(), Error> {
    let app = app_state.clone();
    tokio::spawn(async move {
        let server = init_server(app)?;
        server.await?;
        Ok(())
    })
    .await?
}

fn init_server(app_state: AppState<State>) -> Result<Server, Error> {
    let host = app_state.config.server_host.to_owned();
    let port = app_state.config.port;

    info!("listening on {}:{} ({})", host, port, app_state.config.app_env);

    let server = HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .app_data(web::JsonConfig::default().limit(4096))
            .service(health::index)
            .service(web::scope("/api").service(task::index))
    })
    .bind((host, port))?
    .disable_signals()
    .run();
    Ok(server)
}
