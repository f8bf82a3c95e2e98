//! Chat Server: warp HTTP server for the student chat endpoints.
//!
//! Runs in the background via bind_with_graceful_shutdown; `stop()` fires
//! the oneshot shutdown channel.

use serde::Serialize;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use warp::http::StatusCode;
use warp::Filter;

use super::chat_service::ChatService;
use super::chat_types::{
    ResultEnvelope, SendMessageRequest, SendMessageResponse, StudentByNameRequest,
    StudentByRegistrationNumberRequest,
};
use crate::error::{ChatError, Result};

/// Largest accepted request body.
const MAX_BODY_BYTES: u64 = 64 * 1024;

/// HTTP server exposing [`ChatService`].
pub struct ChatServer {
    addr: SocketAddr,
    shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
    running: bool,
}

impl ChatServer {
    pub fn new(host: &str, port: u16) -> Result<Self> {
        let addr: SocketAddr = format!("{}:{}", host, port).parse().map_err(|e| {
            ChatError::Config(format!("Invalid listen address {}:{}: {}", host, port, e))
        })?;
        Ok(Self {
            addr,
            shutdown_tx: None,
            running: false,
        })
    }

    /// Bind and serve in the background. Returns the bound address, which
    /// differs from the configured one when port 0 was requested.
    pub async fn start(&mut self, chat: Arc<ChatService>) -> Result<SocketAddr> {
        if self.running {
            return Ok(self.addr);
        }

        let (tx, rx) = tokio::sync::oneshot::channel();

        let (bound, server) = warp::serve(routes(chat))
            .try_bind_with_graceful_shutdown(self.addr, async {
                rx.await.ok();
            })
            .map_err(|e| ChatError::Config(format!("Bind {}: {}", self.addr, e)))?;

        tokio::spawn(server);
        self.shutdown_tx = Some(tx);
        self.addr = bound;
        self.running = true;
        log::info!("Chat server started on http://{}", bound);
        Ok(bound)
    }

    pub fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
            self.running = false;
            log::info!("Chat server stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }
}

/// All chat routes, with rejection handling and request logging.
pub fn routes(
    chat: Arc<ChatService>,
) -> impl Filter<Extract = (impl warp::Reply,), Error = Infallible> + Clone {
    let with_chat = warp::any().map(move || chat.clone());

    // GET /api/student/chat/health
    let health_route = warp::path!("api" / "student" / "chat" / "health")
        .and(warp::get())
        .and(with_chat.clone())
        .and_then(handle_health);

    // GET /api/student/chat/previousChats/{senderName}
    let previous_route = warp::path!("api" / "student" / "chat" / "previousChats" / String)
        .and(warp::get())
        .and(with_chat.clone())
        .and_then(handle_previous_chats);

    // GET /api/student/chat/newerChats/{receiverName}
    let newer_route = warp::path!("api" / "student" / "chat" / "newerChats" / String)
        .and(warp::get())
        .and(with_chat.clone())
        .and_then(handle_newer_chats);

    // GET /api/student/chat/{roomKey}
    let conversation_route = warp::path!("api" / "student" / "chat" / String)
        .and(warp::get())
        .and(with_chat.clone())
        .and_then(handle_get_conversation);

    // POST /api/student/chat/{roomKey}
    let send_route = warp::path!("api" / "student" / "chat" / String)
        .and(warp::post())
        .and(warp::body::content_length_limit(MAX_BODY_BYTES))
        .and(warp::body::json())
        .and(with_chat.clone())
        .and_then(handle_send);

    // POST /api/student/getStudentByRegNum
    let by_reg_num_route = warp::path!("api" / "student" / "getStudentByRegNum")
        .and(warp::post())
        .and(warp::body::content_length_limit(MAX_BODY_BYTES))
        .and(warp::body::json())
        .and(with_chat.clone())
        .and_then(handle_student_by_reg_num);

    // POST /api/student/getStudentByName
    let by_name_route = warp::path!("api" / "student" / "getStudentByName")
        .and(warp::post())
        .and(warp::body::content_length_limit(MAX_BODY_BYTES))
        .and(warp::body::json())
        .and(with_chat)
        .and_then(handle_student_by_name);

    health_route
        .or(by_reg_num_route)
        .or(by_name_route)
        .or(previous_route)
        .or(newer_route)
        .or(conversation_route)
        .or(send_route)
        .recover(handle_rejection)
        .with(warp::log("chat_server"))
}

// ── Handlers ───────────────────────────────────────────────────

type Reply = warp::reply::WithStatus<warp::reply::Json>;

async fn handle_health(
    chat: Arc<ChatService>,
) -> std::result::Result<Reply, warp::Rejection> {
    let messages = chat.message_count().await;
    Ok(warp::reply::with_status(
        warp::reply::json(&serde_json::json!({"status": "ok", "messages": messages})),
        StatusCode::OK,
    ))
}

async fn handle_send(
    room_key: String,
    request: SendMessageRequest,
    chat: Arc<ChatService>,
) -> std::result::Result<Reply, warp::Rejection> {
    let result = match decode_segment("roomKey", &room_key) {
        Ok(room_key) => chat.send(&room_key, request).await,
        Err(e) => Err(e),
    };
    Ok(respond(result.map(|message| SendMessageResponse {
        message_id: message.id,
        message: "Message sent successfully".to_string(),
    })))
}

async fn handle_get_conversation(
    room_key: String,
    chat: Arc<ChatService>,
) -> std::result::Result<Reply, warp::Rejection> {
    let result = match decode_segment("roomKey", &room_key) {
        Ok(room_key) => chat.get_conversation(&room_key).await,
        Err(e) => Err(e),
    };
    Ok(respond(result))
}

async fn handle_previous_chats(
    sender_name: String,
    chat: Arc<ChatService>,
) -> std::result::Result<Reply, warp::Rejection> {
    let result = match decode_segment("senderName", &sender_name) {
        Ok(name) => chat.previous_partners(&name).await,
        Err(e) => Err(e),
    };
    Ok(respond(result))
}

async fn handle_newer_chats(
    receiver_name: String,
    chat: Arc<ChatService>,
) -> std::result::Result<Reply, warp::Rejection> {
    let result = match decode_segment("receiverName", &receiver_name) {
        Ok(name) => chat.unanswered_inbound_partners(&name).await,
        Err(e) => Err(e),
    };
    Ok(respond(result))
}

async fn handle_student_by_reg_num(
    request: StudentByRegistrationNumberRequest,
    chat: Arc<ChatService>,
) -> std::result::Result<Reply, warp::Rejection> {
    let result = chat
        .student_by_registration_number(&request.registration_number)
        .await;
    Ok(respond(result))
}

async fn handle_student_by_name(
    request: StudentByNameRequest,
    chat: Arc<ChatService>,
) -> std::result::Result<Reply, warp::Rejection> {
    Ok(respond(chat.students_by_name(&request.name).await))
}

async fn handle_rejection(err: warp::Rejection) -> std::result::Result<Reply, Infallible> {
    let (status, message) = if err.is_not_found() {
        (StatusCode::NOT_FOUND, "Not Found".to_string())
    } else if let Some(e) = err.find::<warp::filters::body::BodyDeserializeError>() {
        (StatusCode::BAD_REQUEST, format!("Invalid request body: {}", e))
    } else if err.find::<warp::reject::PayloadTooLarge>().is_some() {
        (StatusCode::PAYLOAD_TOO_LARGE, "Request body too large".to_string())
    } else if err.find::<warp::reject::LengthRequired>().is_some() {
        (
            StatusCode::LENGTH_REQUIRED,
            "A JSON body with Content-Length is required".to_string(),
        )
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        (StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed".to_string())
    } else {
        log::error!("Unhandled rejection: {:?}", err);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Internal Server Error".to_string(),
        )
    };
    Ok(warp::reply::with_status(
        warp::reply::json(&serde_json::json!({"error": message})),
        status,
    ))
}

// ── Helpers ────────────────────────────────────────────────────

fn respond<T: Serialize>(result: Result<T>) -> Reply {
    match result {
        Ok(result) => warp::reply::with_status(
            warp::reply::json(&ResultEnvelope { result }),
            StatusCode::OK,
        ),
        Err(e) => {
            let status = status_for(&e);
            if status == StatusCode::INTERNAL_SERVER_ERROR {
                log::error!("Chat request failed: {}", e);
            } else {
                log::debug!("Chat request rejected: {}", e);
            }
            warp::reply::with_status(
                warp::reply::json(&serde_json::json!({"error": e, "field": e.field()})),
                status,
            )
        }
    }
}

fn status_for(err: &ChatError) -> StatusCode {
    match err {
        ChatError::Validation { .. } => StatusCode::BAD_REQUEST,
        ChatError::NotFound(_) => StatusCode::NOT_FOUND,
        ChatError::Storage(_) | ChatError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Path segments arrive percent-encoded; display names contain spaces.
fn decode_segment(field: &str, raw: &str) -> Result<String> {
    urlencoding::decode(raw)
        .map(|s| s.into_owned())
        .map_err(|e| ChatError::validation(field, format!("invalid encoding: {}", e)))
}
