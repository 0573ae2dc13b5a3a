//! Servidor web Axum expondo o tagger POS e o chunker via JSON.
//!
//! Variáveis de ambiente:
//! - `SEQTAG_ADDR`: endereço de escuta (padrão `0.0.0.0:3000`)
//! - `SEQTAG_TAGGER_MODEL` / `SEQTAG_CHUNKER_MODEL`: payloads já treinados
//!   (sem elas, os modelos são treinados no corpus embutido)
//! - `RUST_LOG`: filtro de logs (padrão `info`)

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use seqtag_core::{
    corpus::demo_sentences, Analysis, ChunkedSentence, Chunker, Pipeline, TaggedSentence, Tagger,
    TrainConfig, Vocabulary,
};
use tower_http::cors::{Any, CorsLayer};
use tracing::info;
use tracing_subscriber::EnvFilter;

const DEFAULT_ADDR: &str = "0.0.0.0:3000";

/// Estado compartilhado da aplicação
struct AppState {
    pipeline: Pipeline,
}

#[derive(Deserialize)]
struct TokensRequest {
    tokens: Vec<String>,
}

#[derive(Deserialize)]
struct ChunkRequest {
    tagged: TaggedSentence,
}

#[derive(Serialize)]
struct TagResponse {
    tagged: TaggedSentence,
}

#[derive(Serialize)]
struct ChunkResponse {
    chunked: ChunkedSentence,
    rendered: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let pipeline = load_pipeline()?;
    let state = Arc::new(AppState { pipeline });

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/health", get(health_handler))
        .route("/tag", post(tag_handler))
        .route("/chunk", post(chunk_handler))
        .route("/analyze", post(analyze_handler))
        .route("/demo-sentences", get(demo_sentences_handler))
        .layer(cors)
        .with_state(state);

    let addr = std::env::var("SEQTAG_ADDR").unwrap_or_else(|_| DEFAULT_ADDR.to_string());
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("🚀 Servidor seqtag iniciado em http://{addr}");
    axum::serve(listener, app).await?;
    Ok(())
}

/// Carrega os modelos indicados no ambiente ou treina no corpus embutido.
fn load_pipeline() -> anyhow::Result<Pipeline> {
    let tagger_path = std::env::var("SEQTAG_TAGGER_MODEL").ok();
    let chunker_path = std::env::var("SEQTAG_CHUNKER_MODEL").ok();
    if tagger_path.is_none() && chunker_path.is_none() {
        return Ok(Pipeline::demo(&TrainConfig::default())?);
    }

    let demo = Pipeline::demo(&TrainConfig::default())?;
    let tagger = match tagger_path {
        Some(path) => {
            let bytes = read_model(&path)?;
            Tagger::deserialize(Vocabulary::brown(), &bytes)
                .with_context(|| format!("invalid tagger model {path}"))?
        }
        None => demo.tagger().clone(),
    };
    let chunker = match chunker_path {
        Some(path) => {
            let bytes = read_model(&path)?;
            Chunker::deserialize(Vocabulary::conll_chunk(), &bytes)
                .with_context(|| format!("invalid chunker model {path}"))?
        }
        None => demo.chunker().clone(),
    };
    Ok(Pipeline::new(tagger, chunker))
}

fn read_model(path: &str) -> anyhow::Result<Vec<u8>> {
    info!(path, "loading model");
    std::fs::read(Path::new(path)).with_context(|| format!("failed to read {path}"))
}

fn bad_request(message: &str) -> axum::response::Response {
    (
        StatusCode::BAD_REQUEST,
        Json(serde_json::json!({ "error": message })),
    )
        .into_response()
}

async fn health_handler() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

/// Tokens -> sentença etiquetada
async fn tag_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<TokensRequest>,
) -> impl IntoResponse {
    if req.tokens.is_empty() {
        return bad_request("lista de tokens vazia");
    }
    let tagged = state.pipeline.tagger().tag(&req.tokens);
    Json(TagResponse { tagged }).into_response()
}

/// Sentença etiquetada -> sentença com chunks
async fn chunk_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ChunkRequest>,
) -> impl IntoResponse {
    if req.tagged.is_empty() {
        return bad_request("sentença vazia");
    }
    let chunked = state.pipeline.chunker().chunk(&req.tagged);
    let rendered = chunked.to_string();
    Json(ChunkResponse { chunked, rendered }).into_response()
}

/// Tokens -> POS + chunks
async fn analyze_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<TokensRequest>,
) -> impl IntoResponse {
    if req.tokens.is_empty() {
        return bad_request("lista de tokens vazia");
    }
    let analysis: Analysis = state.pipeline.analyze(&req.tokens);
    Json(analysis).into_response()
}

/// Retorna sentenças de demonstração
async fn demo_sentences_handler() -> impl IntoResponse {
    Json(demo_sentences())
}
