//! Export/Import HTTP Routes
//!
//! - `GET /export`: streams the dump as `application/octet-stream`
//! - `POST /import[?reset=true]`: consumes a dump from the request body
//!
//! Export commits to a 200 before the first byte is produced. A failure
//! after that point turns into a body error, which makes the server tear
//! the connection down without the terminating chunk; the missing END frame
//! tells the same story at the content level.

use std::io;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Query, State},
    http::header,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use futures_util::StreamExt;
use serde::Deserialize;
use tokio::sync::mpsc;

use crate::api::{ApiError, ApiHandler, ApiResult};
use crate::export::StreamAborted;
use crate::import::{ImportOptions, ImportSummary};
use crate::stream::CancelFlag;

use super::body::{BodyChunk, ChannelReader, ChannelWriter, CHANNEL_DEPTH};

pub const EXPORT_FILENAME: &str = "configstore.dump";

#[derive(Debug, Default, Deserialize)]
pub struct ImportQuery {
    #[serde(default)]
    pub reset: bool,
}

pub fn dump_routes(state: Arc<ApiHandler>) -> Router {
    Router::new()
        .route("/export", get(export_handler))
        .route("/import", post(import_handler))
        .with_state(state)
}

async fn export_handler(State(api): State<Arc<ApiHandler>>) -> ApiResult<Response> {
    let permit = api.begin_dump()?;
    let (tx, rx) = mpsc::channel::<BodyChunk>(CHANNEL_DEPTH);

    tokio::task::spawn_blocking(move || {
        let mut sink = ChannelWriter::new(tx);
        if let Err(e) = api.export(&permit, &mut sink, &CancelFlag::new()) {
            sink.abort(StreamAborted::from(e));
        }
    });

    let stream = futures_util::stream::unfold(rx, |mut rx| async move {
        rx.recv().await.map(|chunk| (chunk, rx))
    });

    Ok((
        [
            (header::CONTENT_TYPE, "application/octet-stream".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", EXPORT_FILENAME),
            ),
        ],
        Body::from_stream(stream),
    )
        .into_response())
}

async fn import_handler(
    State(api): State<Arc<ApiHandler>>,
    Query(query): Query<ImportQuery>,
    body: Body,
) -> ApiResult<Json<ImportSummary>> {
    let permit = api.begin_dump()?;

    let (tx, rx) = mpsc::channel::<io::Result<axum::body::Bytes>>(CHANNEL_DEPTH);
    let mut data = body.into_data_stream();
    let forward = tokio::spawn(async move {
        while let Some(chunk) = data.next().await {
            let chunk = chunk.map_err(|e| io::Error::new(io::ErrorKind::Other, e));
            let failed = chunk.is_err();
            if tx.send(chunk).await.is_err() || failed {
                break;
            }
        }
    });

    // Dropping this future (client gone) cancels the import between records
    let cancel = CancelFlag::new();
    let on_drop = cancel.cancel_on_drop();
    let options = ImportOptions { reset: query.reset };

    let joined = tokio::task::spawn_blocking(move || {
        api.import(&permit, ChannelReader::new(rx), options, cancel)
    })
    .await;

    on_drop.disarm();
    forward.abort();

    let summary = joined.map_err(|e| ApiError::Internal(format!("import task failed: {}", e)))??;
    Ok(Json(summary))
}
