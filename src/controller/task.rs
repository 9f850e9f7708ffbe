use actix_web::{post, web, HttpResponse};
use futures::stream;

use crate::{
    configuration::{AppState, State},
    error::Error,
    types::{TaskRequest, TaskResponse},
};

/// Runs one task and streams its responses as newline-delimited JSON.
#[post("/task")]
async fn index(
    state: web::Data<AppState<State>>,
    request: web::Json<TaskRequest>,
) -> Result<HttpResponse, Error> {
    let receiver = state.dispatcher.dispatch(request.into_inner());

    let body = stream::unfold(receiver, |mut receiver| async move {
        let response = receiver.recv().await?;
        Some((ndjson_line(&response), receiver))
    });

    Ok(HttpResponse::Ok()
        .content_type("application/x-ndjson")
        .streaming(body))
}

fn ndjson_line(response: &TaskResponse) -> Result<web::Bytes, Error> {
    let mut line = serde_json::to_vec(response)?;
    line.push(b'\n');
    Ok(web::Bytes::from(line))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lines_are_newline_terminated_json() {
        let response = TaskResponse {
            id: String::from("1"),
            kind: String::from("END"),
            order: 3,
            payload: serde_json::Value::Null,
            error: None,
            is_final: true,
        };

        let line = ndjson_line(&response).unwrap();
        assert_eq!(
            line.as_ref(),
            br#"{"id":"1","type":"END","order":3,"final":true}
"#
        );
    }
}
