use axum::Json;
use serde_json::{Value, json};

/// Web app manifest for the installable playlist client
pub async fn serve_manifest() -> Json<Value> {
    Json(json!({
        "short_name": "Suff am Ring",
        "name": "Suff am Ring - Die Playlist",
        "manifest_version": "2",
        "description": "...",
        "start_url": "/",
        "background_color": "#070a0a",
        "display": "fullscreen",
        "theme_color": "#b50e12",
        "orientation": "portrait",
        "prefer_related_applications": false,
        "icons": [
            {
                "src": "/static/images/192.png",
                "type": "image/png",
                "size": "192x192",
            },
            {
                "src": "/static/images/512.png",
                "type": "image/png",
                "size": "512x512",
            },
        ],
    }))
}
