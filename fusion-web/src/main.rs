//! Servidor web Axum com WebSocket para alinhar e fundir saídas de motores NER

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use fusion_core::{
    combine, DateRecognizer, EngineId, EngineOutput, FusionConfig, FusionEvent, FusionPipeline, RawOutput,
    Recognizer, SpanSet,
};
use serde::Deserialize;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const DEFAULT_ADDR: &str = "0.0.0.0:3000";

/// Estado compartilhado da aplicação
struct AppState {
    config: FusionConfig,
    pipeline: FusionPipeline,
    dater: DateRecognizer,
}

#[derive(Debug, Deserialize)]
struct FuseRequest {
    text: String,
    #[serde(default)]
    outputs: Vec<EngineOutput>,
    /// Roda o motor interno de datas e inclui a saída dele
    #[serde(default)]
    with_dates: bool,
}

#[derive(Debug, Deserialize)]
struct ExtractRequest {
    text: String,
    engine: EngineId,
    output: RawOutput,
}

#[derive(Debug, Deserialize)]
struct CombineRequest {
    sets: Vec<SpanSet>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = match std::env::var("FUSION_CONFIG") {
        Ok(path) => FusionConfig::from_path(&path)?,
        Err(_) => FusionConfig::default(),
    };
    let state = Arc::new(AppState {
        pipeline: FusionPipeline::new(config.clone())?,
        config,
        dater: DateRecognizer::new()?,
    });

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/profiles", get(profiles_handler))
        .route("/fuse", post(fuse_handler))
        .route("/extract", post(extract_handler))
        .route("/combine", post(combine_handler))
        .route("/ws", get(ws_handler))
        .layer(ServiceBuilder::new().layer(cors))
        .with_state(state);

    let addr: SocketAddr = std::env::var("FUSION_ADDR")
        .unwrap_or_else(|_| DEFAULT_ADDR.to_string())
        .parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("🚀 Servidor de fusão iniciado em http://{addr}");
    axum::serve(listener, app).await?;
    Ok(())
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(serde_json::json!({ "error": message.into() }))).into_response()
}

/// Acrescenta a saída do motor de datas, a menos que o cliente já tenha mandado uma.
fn with_date_output(dater: &DateRecognizer, text: &str, mut outputs: Vec<EngineOutput>) -> Vec<EngineOutput> {
    if outputs.iter().any(|o| &o.engine == dater.id()) {
        return outputs;
    }
    match dater.recognize(text) {
        Ok(output) => outputs.push(EngineOutput {
            engine: dater.id().clone(),
            output,
        }),
        Err(e) => warn!("motor de datas falhou: {e}"),
    }
    outputs
}

fn prepare(state: &AppState, req: FuseRequest) -> (String, Vec<EngineOutput>) {
    let outputs = if req.with_dates {
        with_date_output(&state.dater, &req.text, req.outputs)
    } else {
        req.outputs
    };
    (req.text, outputs)
}

/// Perfis configurados, na ordem de prioridade
async fn profiles_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(serde_json::json!({
        "priority": state.config.priority,
        "profiles": state.pipeline.profiles(),
    }))
}

/// Fusão via HTTP POST (sem streaming)
async fn fuse_handler(State(state): State<Arc<AppState>>, Json(req): Json<FuseRequest>) -> Response {
    if req.text.trim().is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "Texto vazio");
    }

    // alinhamento é síncrono e usa rayon: fora do runtime
    let worker = Arc::clone(&state);
    let handle = tokio::task::spawn_blocking(move || {
        let (text, outputs) = prepare(&worker, req);
        worker.pipeline.fuse(&text, &outputs)
    });

    match handle.await {
        Ok(outcome) => Json(outcome).into_response(),
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

/// Converte a saída de um único motor
async fn extract_handler(State(state): State<Arc<AppState>>, Json(req): Json<ExtractRequest>) -> Response {
    let output = EngineOutput {
        engine: req.engine,
        output: req.output,
    };
    match state.pipeline.convert_one(&req.text, &output) {
        Ok(set) => Json(set).into_response(),
        Err(e) => error_response(StatusCode::UNPROCESSABLE_ENTITY, e.to_string()),
    }
}

/// Combina conjuntos já alinhados, na ordem recebida
async fn combine_handler(Json(req): Json<CombineRequest>) -> impl IntoResponse {
    Json(combine(&req.sets))
}

/// Upgrade HTTP → WebSocket
async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_websocket(socket, state))
}

/// Lógica do WebSocket: cada mensagem é um pedido de fusão, respondido com o fluxo de eventos
async fn handle_websocket(mut socket: WebSocket, state: Arc<AppState>) {
    info!("WebSocket conectado");

    while let Some(Ok(msg)) = socket.recv().await {
        match msg {
            Message::Text(text) => {
                let req = match serde_json::from_str::<FuseRequest>(&text) {
                    Ok(req) if !req.text.trim().is_empty() => req,
                    Ok(_) => continue,
                    Err(e) => {
                        let reply = serde_json::json!({ "type": "Error", "data": { "message": e.to_string() } });
                        if socket.send(Message::Text(reply.to_string())).await.is_err() {
                            return;
                        }
                        continue;
                    }
                };

                info!("Fundindo via WebSocket: {} bytes, {} saídas", req.text.len(), req.outputs.len());

                let (tx, rx) = std::sync::mpsc::channel::<FusionEvent>();
                let worker = Arc::clone(&state);
                let handle = tokio::task::spawn_blocking(move || {
                    let (text, outputs) = prepare(&worker, req);
                    worker.pipeline.fuse_streaming(&text, &outputs, tx);
                });
                if handle.await.is_err() {
                    warn!("tarefa de fusão abortada");
                    continue;
                }

                // coleta numa Vec: o receptor std não é Send
                let events: Vec<FusionEvent> = rx.try_iter().collect();
                for event in &events {
                    if let Ok(json) = serde_json::to_string(event) {
                        if socket.send(Message::Text(json)).await.is_err() {
                            return; // cliente desconectou
                        }
                    }
                }
            }
            Message::Close(_) => {
                info!("WebSocket desconectado");
                return;
            }
            Message::Ping(payload) => {
                let _ = socket.send(Message::Pong(payload)).await;
            }
            _ => {}
        }
    }
}
