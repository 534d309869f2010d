//! Notes API Example - CRUD resources over an in-memory bucket store
//!
//! Two resources share one `MemoryStore`:
//!
//! - `/notes` validates bodies with a marshal hook and logs through the
//!   success and error hooks
//! - `/tags` binds bodies straight to a typed record and keys them by name
//!
//! Run with: cargo run --example notes-api
//!
//! The service runs on port 8080 by default (configurable via BUCKET_CRUD_SERVICE__PORT)
//!
//! Test with:
//!   curl http://localhost:8080/notes
//!   curl -i 'http://localhost:8080/notes?_perPage=2'
//!   curl 'http://localhost:8080/notes?_perPage=2&afterKey=<last key>'
//!   curl -X POST -H 'Content-Type: application/json' -d '{"title":"hello"}' http://localhost:8080/notes
//!   curl -X POST -F title=upload -F attachment=@Cargo.toml http://localhost:8080/notes
//!   curl -X PUT -H 'Content-Type: application/vnd.api+json' -d '{"title":"edited"}' http://localhost:8080/notes/<key>
//!   curl -X DELETE http://localhost:8080/notes/<key>
//!   curl -X POST -H 'Content-Type: application/json' -d '{"name":"rust"}' http://localhost:8080/tags

use bucket_crud::prelude::*;
use serde_json::json;
use tokio::signal;
use tower_http::{
    catch_panic::CatchPanicLayer,
    limit::RequestBodyLimitLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Tag {
    name: String,
    #[serde(default)]
    color: Option<String>,
}

#[derive(Clone)]
struct AppState {
    notes: Crud<MemoryStore>,
    tags: Crud<MemoryStore, Tag>,
}

fn validate_note(_: &http::request::Parts, doc: Document) -> std::result::Result<Marshaled, MarshalError> {
    let mut problems = Document::new();
    match doc.get("title").and_then(|t| t.as_str()) {
        None => {
            problems.insert("title".into(), json!("is required"));
        }
        Some(title) if title.trim().is_empty() => {
            problems.insert("title".into(), json!("must not be blank"));
        }
        Some(_) => {}
    }

    if problems.is_empty() {
        Ok(Marshaled::Created(doc))
    } else {
        Err(MarshalError::with_details("invalid note", problems))
    }
}

fn notes(store: MemoryStore, config: &Config) -> Crud<MemoryStore> {
    Crud::new("notes", store)
        .with_config(config.crud.clone())
        .with_marshal(validate_note)
        .on_success(|ctx| {
            info!(bucket = ctx.bucket, key = ?ctx.key, operation = %ctx.operation, "note handled");
            Ok(())
        })
        .on_error(|ctx, error| {
            warn!(bucket = ctx.bucket, key = ?ctx.key, path = %ctx.request.uri, "{}", error);
        })
}

fn tags(store: MemoryStore, config: &Config) -> Crud<MemoryStore, Tag> {
    Crud::new("tags", store)
        .with_config(config.crud.clone())
        .with_record::<Tag>()
        .with_key(|doc, _| {
            doc.get("name")
                .and_then(|n| n.as_str())
                .map(|n| n.trim().to_lowercase())
                .unwrap_or_default()
        })
}

async fn seed(store: &MemoryStore) -> Result<()> {
    for (key, title) in [("welcome", "Welcome to bucket-crud"), ("paging", "Try ?_perPage=1")] {
        let body = serde_json::to_vec(&json!({ "title": title }))?;
        store.save("notes", key, body).await?;
    }
    Ok(())
}

// Notes handlers
async fn list_notes(State(state): State<AppState>, request: Request) -> std::result::Result<ListResponse, ApiError> {
    state.notes.get_all(&request.into_parts().0).await
}

async fn create_note(State(state): State<AppState>, request: Request) -> std::result::Result<ItemResponse, ApiError> {
    state.notes.post(request).await
}

async fn get_note(
    State(state): State<AppState>,
    Path(key): Path<String>,
    request: Request,
) -> std::result::Result<ItemResponse, ApiError> {
    state.notes.get(&key, &request.into_parts().0).await
}

async fn update_note(
    State(state): State<AppState>,
    Path(key): Path<String>,
    request: Request,
) -> std::result::Result<ItemResponse, ApiError> {
    state.notes.put(&key, request).await
}

async fn delete_note(
    State(state): State<AppState>,
    Path(key): Path<String>,
    request: Request,
) -> std::result::Result<Message, ApiError> {
    state.notes.delete(&key, &request.into_parts().0).await
}

// Tags handlers
async fn list_tags(State(state): State<AppState>, request: Request) -> std::result::Result<ListResponse, ApiError> {
    state.tags.get_all(&request.into_parts().0).await
}

async fn create_tag(State(state): State<AppState>, request: Request) -> std::result::Result<ItemResponse, ApiError> {
    state.tags.post(request).await
}

async fn get_tag(
    State(state): State<AppState>,
    Path(key): Path<String>,
    request: Request,
) -> std::result::Result<ItemResponse, ApiError> {
    state.tags.get(&key, &request.into_parts().0).await
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT (Ctrl+C), starting graceful shutdown"),
        _ = terminate => info!("Received SIGTERM, starting graceful shutdown"),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load_for_service("notes-api")?;
    init_tracing(&config)?;

    let store = MemoryStore::new();
    seed(&store).await?;

    let state = AppState {
        notes: notes(store.clone(), &config),
        tags: tags(store.clone(), &config),
    };

    let app = Router::new()
        .route("/notes", get(list_notes).post(create_note))
        .route("/notes/{key}", get(get_note).put(update_note).delete(delete_note))
        .route("/tags", get(list_tags).post(create_tag))
        .route("/tags/{key}", get(get_tag))
        .with_state(state)
        .layer(RequestBodyLimitLayer::new(config.crud.body_limit_bytes))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().include_headers(true))
                .on_response(DefaultOnResponse::new().include_headers(true)),
        )
        .layer(CatchPanicLayer::new());

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], config.service.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Listening on {} (buckets: {:?})", addr, store.buckets().await);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}
