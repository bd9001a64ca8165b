use crate::{
    error::Result,
    metrics,
    playlist::Track,
    server::{conditional, state::AppState},
};
use axum::{
    extract::State,
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use std::time::Instant;
use tracing::{debug, info};

#[derive(Serialize)]
struct PlaylistResponse<'a> {
    data: &'a [Track],
}

/// Serve the current playlist as JSON
///
/// The body carries a weak ETag over its bytes; a matching `If-None-Match`
/// gets `304 Not Modified` with an empty body.
pub async fn serve_playlist(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response> {
    let start = Instant::now();

    let tracks = match state.playlist.load().await {
        Ok(tracks) => tracks,
        Err(e) => {
            metrics::record_request("playlist", e.status_code().as_u16());
            metrics::record_duration("playlist", start);
            return Err(e);
        }
    };

    let body = serde_json::to_vec(&PlaylistResponse { data: &tracks })?;
    let etag = conditional::compute_etag(&body);

    let unchanged = headers
        .get(header::IF_NONE_MATCH)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|client| conditional::if_none_match(client, &etag));

    let response = if unchanged {
        debug!("Client playlist is current ({})", etag);
        metrics::record_request("playlist", 304);
        (StatusCode::NOT_MODIFIED, [(header::ETAG, etag)]).into_response()
    } else {
        info!("Serving {} tracks", tracks.len());
        metrics::record_request("playlist", 200);
        (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, "application/json".to_string()),
                (header::ETAG, etag),
                (header::CACHE_CONTROL, "no-cache".to_string()),
            ],
            body,
        )
            .into_response()
    };

    metrics::record_duration("playlist", start);
    Ok(response)
}
