//! In-process stand-ins for the remote collaborator.
//!
//! [`FixtureServer`] serves every endpoint the client consumes from in-memory
//! state over real HTTP, with failure injection. [`ScriptedScans`] replaces the
//! scan endpoints entirely when a test needs to control *when* a scan settles.

use async_trait::async_trait;
use axum::{
    Router,
    extract::{Extension, Json, Path},
    http::{HeaderMap, StatusCode, header::AUTHORIZATION},
    routing::{get, post, put},
};
use chrono::{Duration as ChronoDuration, NaiveDate, NaiveDateTime};
use serde_json::{Value, json};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::{Notify, oneshot};

use crate::errors::{ClientError, ClientResult};
use crate::models::{ScanOutcome, ScanRecord, SearchTerm, TermCategory};
use crate::repositories::ScanRepository;

type Reply = (StatusCode, Json<Value>);
type SharedState = Arc<Mutex<FixtureState>>;

#[derive(Debug, Clone)]
struct FixtureUser {
    id: i64,
    email: String,
    password: String,
    name: String,
}

impl FixtureUser {
    fn to_json(&self) -> Value {
        json!({
            "id": self.id,
            "email": self.email,
            "name": self.name,
            "role": "client",
            "created_at": "2024-01-01T00:00:00"
        })
    }
}

#[derive(Debug, Clone)]
struct FixtureSource {
    id: String,
    user_id: i64,
    url: String,
    name: String,
    status: String,
}

impl FixtureSource {
    fn to_json(&self) -> Value {
        json!({
            "id": self.id,
            "user_id": self.user_id,
            "url": self.url,
            "name": self.name,
            "status": self.status,
            "added_at": "2024-01-01T00:00:00"
        })
    }
}

#[derive(Debug, Default)]
struct FixtureState {
    users: Vec<FixtureUser>,
    tokens: HashMap<String, i64>,
    reset_tokens: HashSet<String>,
    sources: Vec<FixtureSource>,
    scans: Vec<(i64, Value)>,
    leaks: Vec<(String, String)>,
    fail_next: Option<(u16, Value)>,
    identity_delay: Option<Duration>,
    requests: usize,
    next_id: u64,
}

impl FixtureState {
    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn ensure_user(&mut self, email: &str, password: &str) -> i64 {
        if let Some(user) = self.users.iter().find(|user| user.email == email) {
            return user.id;
        }
        let id = self.next_id() as i64;
        self.users.push(FixtureUser {
            id,
            email: email.to_string(),
            password: password.to_string(),
            name: email.split('@').next().unwrap_or(email).to_string(),
        });
        id
    }

    fn issue_token(&mut self, user_id: i64) -> String {
        let token = format!("token-{}-{}", user_id, self.next_id());
        self.tokens.insert(token.clone(), user_id);
        token
    }
}

fn reply(status: StatusCode, body: Value) -> Reply {
    (status, Json(body))
}

/// Counts the request and consumes a pending injected failure, if any.
fn enter(state: &SharedState) -> Result<MutexGuard<'_, FixtureState>, Reply> {
    let mut guard = state.lock().unwrap();
    guard.requests += 1;
    if let Some((status, body)) = guard.fail_next.take() {
        let status = StatusCode::from_u16(status).unwrap();
        return Err(reply(status, body));
    }
    Ok(guard)
}

fn authorize(guard: &FixtureState, headers: &HeaderMap) -> Result<i64, Reply> {
    let token = headers
        .get(AUTHORIZATION)
        .and_then(|header| header.to_str().ok())
        .and_then(|header| header.strip_prefix("Bearer "))
        .ok_or_else(|| {
            reply(
                StatusCode::UNAUTHORIZED,
                json!({ "msg": "Missing Authorization Header" }),
            )
        })?;

    guard
        .tokens
        .get(token)
        .copied()
        .ok_or_else(|| reply(StatusCode::UNAUTHORIZED, json!({ "msg": "Token has expired" })))
}

fn text<'a>(payload: &'a Value, field: &str) -> &'a str {
    payload.get(field).and_then(Value::as_str).unwrap_or("").trim()
}

async fn register(Extension(state): Extension<SharedState>, Json(payload): Json<Value>) -> Reply {
    let mut guard = match enter(&state) {
        Ok(guard) => guard,
        Err(reply) => return reply,
    };
    let email = text(&payload, "email");
    let password = text(&payload, "password");
    if email.is_empty() || password.is_empty() {
        return reply(
            StatusCode::BAD_REQUEST,
            json!({ "error": "email and password are required" }),
        );
    }
    if guard.users.iter().any(|user| user.email == email) {
        return reply(StatusCode::CONFLICT, json!({ "error": "email already exists" }));
    }

    let id = guard.ensure_user(email, password);
    let name = text(&payload, "name");
    let user = guard.users.iter_mut().find(|user| user.id == id).unwrap();
    if !name.is_empty() {
        user.name = name.to_string();
    }
    reply(
        StatusCode::CREATED,
        json!({ "message": "user created successfully", "user": user.to_json() }),
    )
}

async fn login(Extension(state): Extension<SharedState>, Json(payload): Json<Value>) -> Reply {
    let mut guard = match enter(&state) {
        Ok(guard) => guard,
        Err(reply) => return reply,
    };
    let email = text(&payload, "email");
    let password = text(&payload, "password");
    let Some(user) = guard
        .users
        .iter()
        .find(|user| user.email == email && user.password == password)
        .cloned()
    else {
        return reply(StatusCode::UNAUTHORIZED, json!({ "error": "invalid credentials" }));
    };

    let token = guard.issue_token(user.id);
    reply(
        StatusCode::OK,
        json!({ "access_token": token, "user": user.to_json() }),
    )
}

async fn me(Extension(state): Extension<SharedState>, headers: HeaderMap) -> Reply {
    let delay = state.lock().unwrap().identity_delay;
    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }
    let guard = match enter(&state) {
        Ok(guard) => guard,
        Err(reply) => return reply,
    };
    match authorize(&guard, &headers) {
        Ok(user_id) => {
            let user = guard.users.iter().find(|user| user.id == user_id).unwrap();
            reply(StatusCode::OK, user.to_json())
        }
        Err(reply) => reply,
    }
}

async fn forgot_password(
    Extension(state): Extension<SharedState>,
    Json(payload): Json<Value>,
) -> Reply {
    let mut guard = match enter(&state) {
        Ok(guard) => guard,
        Err(reply) => return reply,
    };
    let email = text(&payload, "email").to_string();
    if guard.users.iter().any(|user| user.email == email) {
        guard.reset_tokens.insert(format!("reset-{}", email));
    }
    reply(
        StatusCode::OK,
        json!({ "msg": "If the email exists, a reset link has been sent" }),
    )
}

async fn reset_password(
    Extension(state): Extension<SharedState>,
    Json(payload): Json<Value>,
) -> Reply {
    let mut guard = match enter(&state) {
        Ok(guard) => guard,
        Err(reply) => return reply,
    };
    let token = text(&payload, "token").to_string();
    let password = text(&payload, "password").to_string();
    if !guard.reset_tokens.remove(&token) {
        return reply(
            StatusCode::BAD_REQUEST,
            json!({ "msg": "Invalid or expired reset token" }),
        );
    }
    let email = token.trim_start_matches("reset-");
    if let Some(user) = guard.users.iter_mut().find(|user| user.email == email) {
        user.password = password;
    }
    reply(StatusCode::OK, json!({ "msg": "Password has been reset" }))
}

async fn list_urls(Extension(state): Extension<SharedState>, headers: HeaderMap) -> Reply {
    let guard = match enter(&state) {
        Ok(guard) => guard,
        Err(reply) => return reply,
    };
    let user_id = match authorize(&guard, &headers) {
        Ok(user_id) => user_id,
        Err(reply) => return reply,
    };
    let sources: Vec<Value> = guard
        .sources
        .iter()
        .filter(|source| source.user_id == user_id)
        .map(FixtureSource::to_json)
        .collect();
    reply(StatusCode::OK, Value::Array(sources))
}

async fn create_url(
    Extension(state): Extension<SharedState>,
    headers: HeaderMap,
    Json(payload): Json<Value>,
) -> Reply {
    let mut guard = match enter(&state) {
        Ok(guard) => guard,
        Err(reply) => return reply,
    };
    let user_id = match authorize(&guard, &headers) {
        Ok(user_id) => user_id,
        Err(reply) => return reply,
    };
    let url = text(&payload, "url").to_string();
    let name = text(&payload, "name").to_string();
    if url.is_empty() || name.is_empty() {
        return reply(
            StatusCode::BAD_REQUEST,
            json!({ "error": "URL and Name are required" }),
        );
    }
    if guard
        .sources
        .iter()
        .any(|source| source.user_id == user_id && source.url == url)
    {
        return reply(StatusCode::CONFLICT, json!({ "error": "URL already exists" }));
    }

    let source = FixtureSource {
        id: format!("url-{}", guard.next_id()),
        user_id,
        url,
        name,
        status: "enabled".to_string(),
    };
    let body = source.to_json();
    guard.sources.push(source);
    reply(StatusCode::CREATED, body)
}

async fn update_url(
    Extension(state): Extension<SharedState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(payload): Json<Value>,
) -> Reply {
    let mut guard = match enter(&state) {
        Ok(guard) => guard,
        Err(reply) => return reply,
    };
    let user_id = match authorize(&guard, &headers) {
        Ok(user_id) => user_id,
        Err(reply) => return reply,
    };
    let Some(source) = guard
        .sources
        .iter_mut()
        .find(|source| source.id == id && source.user_id == user_id)
    else {
        return reply(StatusCode::NOT_FOUND, json!({ "error": "URL not found" }));
    };

    if let Some(url) = payload.get("url").and_then(Value::as_str) {
        source.url = url.to_string();
    }
    if let Some(name) = payload.get("name").and_then(Value::as_str) {
        source.name = name.to_string();
    }
    if let Some(status) = payload.get("status").and_then(Value::as_str) {
        source.status = status.to_string();
    }
    reply(StatusCode::OK, source.to_json())
}

async fn delete_url(
    Extension(state): Extension<SharedState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Reply {
    let mut guard = match enter(&state) {
        Ok(guard) => guard,
        Err(reply) => return reply,
    };
    let user_id = match authorize(&guard, &headers) {
        Ok(user_id) => user_id,
        Err(reply) => return reply,
    };
    let before = guard.sources.len();
    guard
        .sources
        .retain(|source| !(source.id == id && source.user_id == user_id));
    if guard.sources.len() == before {
        return reply(StatusCode::NOT_FOUND, json!({ "error": "URL not found" }));
    }
    reply(StatusCode::OK, json!({ "message": "URL deleted successfully" }))
}

fn fixture_timestamp(offset_seconds: i64, extra_millis: i64) -> String {
    let base: NaiveDateTime = NaiveDate::from_ymd_opt(2024, 5, 1)
        .unwrap()
        .and_hms_opt(10, 0, 0)
        .unwrap();
    (base + ChronoDuration::seconds(offset_seconds) + ChronoDuration::milliseconds(extra_millis))
        .format("%Y-%m-%dT%H:%M:%S%.6f")
        .to_string()
}

async fn run_scan(
    Extension(state): Extension<SharedState>,
    headers: HeaderMap,
    Json(payload): Json<Value>,
) -> Reply {
    let mut guard = match enter(&state) {
        Ok(guard) => guard,
        Err(reply) => return reply,
    };
    let user_id = match authorize(&guard, &headers) {
        Ok(user_id) => user_id,
        Err(reply) => return reply,
    };
    let keywords: Vec<String> = payload
        .get("keywords")
        .and_then(Value::as_array)
        .map(|values| {
            values
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();
    if keywords.is_empty() {
        return reply(StatusCode::BAD_REQUEST, json!({ "error": "No keywords provided" }));
    }

    let scanned: Vec<String> = guard
        .sources
        .iter()
        .filter(|source| source.user_id == user_id && source.status == "enabled")
        .map(|source| source.url.clone())
        .collect();
    if scanned.is_empty() {
        return reply(StatusCode::BAD_REQUEST, json!({ "error": "No enabled URLs to scan" }));
    }

    let mut matches: Vec<(String, Vec<String>)> = Vec::new();
    for (reported_source, term) in &guard.leaks {
        if !keywords.iter().any(|keyword| keyword.eq_ignore_ascii_case(term)) {
            continue;
        }
        match matches.iter_mut().find(|(source, _)| source == reported_source) {
            Some((_, terms)) => terms.push(term.clone()),
            None => matches.push((reported_source.clone(), vec![term.clone()])),
        }
    }

    let sequence = guard.next_id() as i64;
    let scan = json!({
        "id": format!("scan-{}", sequence),
        "user_id": user_id,
        "keywords": keywords,
        "urls_scanned": scanned,
        "matches": matches
            .into_iter()
            .map(|(url, keywords)| json!({ "url": url, "keywords": keywords }))
            .collect::<Vec<_>>(),
        "errors": [],
        "status": "complete",
        "started_at": fixture_timestamp(sequence * 60, 0),
        "completed_at": fixture_timestamp(sequence * 60, 1500),
    });
    guard.scans.push((user_id, scan.clone()));
    reply(StatusCode::CREATED, scan)
}

async fn list_scans(Extension(state): Extension<SharedState>, headers: HeaderMap) -> Reply {
    let guard = match enter(&state) {
        Ok(guard) => guard,
        Err(reply) => return reply,
    };
    let user_id = match authorize(&guard, &headers) {
        Ok(user_id) => user_id,
        Err(reply) => return reply,
    };
    let scans: Vec<Value> = guard
        .scans
        .iter()
        .rev()
        .filter(|(owner, _)| *owner == user_id)
        .map(|(_, scan)| scan.clone())
        .collect();
    reply(StatusCode::OK, Value::Array(scans))
}

/// Remote collaborator served from memory on an ephemeral local port.
pub struct FixtureServer {
    pub base_url: String,
    state: SharedState,
}

impl FixtureServer {
    pub async fn spawn() -> Self {
        let state: SharedState = Arc::new(Mutex::new(FixtureState::default()));
        let app = Router::new()
            .route("/auth/register", post(register))
            .route("/auth/login", post(login))
            .route("/auth/me", get(me))
            .route("/auth/forgot-password", post(forgot_password))
            .route("/auth/reset-password", post(reset_password))
            .route("/api/urls", get(list_urls).post(create_url))
            .route("/api/urls/{id}", put(update_url).delete(delete_url))
            .route("/api/scan", post(run_scan))
            .route("/api/scans", get(list_scans))
            .layer(Extension(state.clone()));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self {
            base_url: format!("http://{}", address),
            state,
        }
    }

    fn lock(&self) -> MutexGuard<'_, FixtureState> {
        self.state.lock().unwrap()
    }

    /// Registers `email` with `password` and returns the user id.
    pub fn add_user(&self, email: &str, password: &str) -> i64 {
        self.lock().ensure_user(email, password)
    }

    /// Registers `email` if needed and returns a valid bearer token for it.
    pub fn issue_token(&self, email: &str) -> String {
        let mut state = self.lock();
        let user_id = state.ensure_user(email, "secret1");
        state.issue_token(user_id)
    }

    pub fn revoke_all_tokens(&self) {
        self.lock().tokens.clear();
    }

    /// The next request answers `status` with `{"error": message}`.
    pub fn fail_next(&self, status: u16, message: &str) {
        self.lock().fail_next = Some((status, json!({ "error": message })));
    }

    /// The next request answers 200 with a body that matches no payload shape.
    pub fn malformed_next(&self) {
        self.lock().fail_next = Some((200, Value::String("<html>maintenance</html>".to_string())));
    }

    /// `/auth/me` waits `delay` before answering.
    pub fn delay_identity(&self, delay: Duration) {
        self.lock().identity_delay = Some(delay);
    }

    /// Scans that include `term` report a match on `reported_source`.
    pub fn leak(&self, reported_source: &str, term: &str) {
        self.lock()
            .leaks
            .push((reported_source.to_string(), term.to_string()));
    }

    pub fn add_source(&self, email: &str, url: &str, name: &str) -> String {
        let mut state = self.lock();
        let user_id = state.ensure_user(email, "secret1");
        let id = format!("url-{}", state.next_id());
        state.sources.push(FixtureSource {
            id: id.clone(),
            user_id,
            url: url.to_string(),
            name: name.to_string(),
            status: "enabled".to_string(),
        });
        id
    }

    pub fn source_status(&self, id: &str) -> Option<String> {
        self.lock()
            .sources
            .iter()
            .find(|source| source.id == id)
            .map(|source| source.status.clone())
    }

    pub fn has_reset_token(&self, email: &str) -> bool {
        self.lock().reset_tokens.contains(&format!("reset-{}", email))
    }

    pub fn request_count(&self) -> usize {
        self.lock().requests
    }
}

/// Scan repository whose `run` settles only when the test says so.
pub struct ScriptedScans {
    pending: Mutex<Option<oneshot::Receiver<ClientResult<ScanRecord>>>>,
    history: Mutex<Vec<ScanRecord>>,
    started: Notify,
    list_calls: Mutex<usize>,
}

impl ScriptedScans {
    /// Returns the repository and the sender that settles its next scan.
    pub fn new() -> (Arc<Self>, oneshot::Sender<ClientResult<ScanRecord>>) {
        let (sender, receiver) = oneshot::channel();
        let scans = Arc::new(Self {
            pending: Mutex::new(Some(receiver)),
            history: Mutex::new(Vec::new()),
            started: Notify::new(),
            list_calls: Mutex::new(0),
        });
        (scans, sender)
    }

    /// Resolves once `run` has been called.
    pub async fn started(&self) {
        self.started.notified().await;
    }

    pub fn list_calls(&self) -> usize {
        *self.list_calls.lock().unwrap()
    }
}

#[async_trait]
impl ScanRepository for ScriptedScans {
    async fn list(&self) -> ClientResult<Vec<ScanRecord>> {
        *self.list_calls.lock().unwrap() += 1;
        let mut records = self.history.lock().unwrap().clone();
        records.reverse();
        Ok(records)
    }

    async fn run(&self, _keywords: &[String]) -> ClientResult<ScanRecord> {
        self.started.notify_one();
        let receiver = self.pending.lock().unwrap().take();
        let result = match receiver {
            Some(receiver) => receiver
                .await
                .unwrap_or_else(|_| Err(ClientError::transport("scan script dropped"))),
            None => Err(ClientError::remote(500, "scan script exhausted")),
        };
        if let Ok(record) = &result {
            self.history.lock().unwrap().push(record.clone());
        }
        result
    }
}

/// A completed scan record as the collaborator would report it.
pub fn scan_record(id: &str, breached_on: &[&str], matched: &[&str]) -> ScanRecord {
    ScanRecord {
        id: id.to_string(),
        owner_id: "1".to_string(),
        terms: matched
            .iter()
            .enumerate()
            .map(|(index, value)| SearchTerm {
                id: index.to_string(),
                value: value.to_string(),
                category: TermCategory::Custom,
            })
            .collect(),
        outcome: if breached_on.is_empty() {
            ScanOutcome::Safe
        } else {
            ScanOutcome::Breached
        },
        breached_sources: breached_on.iter().map(|s| s.to_string()).collect(),
        matched_terms: matched.iter().map(|s| s.to_string()).collect(),
        scanned_sources: breached_on.iter().map(|s| s.to_string()).collect(),
        errors: Vec::new(),
        started_at: chrono::Utc::now(),
        duration_seconds: 1.5,
    }
}

/// A gateway whose session holds a valid token for `email` on `server`.
pub fn signed_in_gateway(server: &FixtureServer, email: &str) -> crate::api::gateway::RemoteGateway {
    use crate::auth::session::SessionStore;
    use crate::auth::storage::MemorySessionStorage;
    use crate::config::Config;
    use crate::models::{Identity, Role, Session};

    let store = Arc::new(SessionStore::new(MemorySessionStorage::new()));
    store.establish(Session {
        token: server.issue_token(email),
        identity: Identity {
            id: "1".to_string(),
            email: email.to_string(),
            role: Role::Client,
            display_name: None,
            created_at: None,
        },
    });
    let config = Config::for_base_url(&server.base_url, std::path::PathBuf::from("unused.json"));
    crate::api::gateway::RemoteGateway::new(&config, store).unwrap()
}
