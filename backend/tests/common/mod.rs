#![allow(dead_code)]
use std::{
    collections::HashMap,
    io,
    net::SocketAddr,
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc, Mutex,
    },
};

use async_trait::async_trait;
use serde_json::Value;

use showcase_backend::{
    api,
    auth::{IdentityError, IdentityProvider, SessionIdentity, TokenCodec},
    db::{Body, Collection, Document, DocumentStore, Filter, ObjectId, StoreError},
    images::{ImageHost, ImageHostError},
    models::upload::UploadedImage,
    AppState,
};

pub const JWT_SECRET: &str = "test-secret-that-is-at-least-32-chars-long!!";

/// Session tokens understood by [`StubIdentity`].
pub const VALID_SESSION: &str = "valid-session-token";
pub const EXPIRED_SESSION: &str = "expired-session-token";
pub const REVOKED_SESSION: &str = "revoked-session-token";

/// In-memory document store that counts every call.
#[derive(Default)]
pub struct MemoryStore {
    docs: Mutex<HashMap<(Collection, ObjectId), Body>>,
    order: Mutex<Vec<(Collection, ObjectId)>>,
    calls: AtomicUsize,
    fail_writes: AtomicBool,
}

impl MemoryStore {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn count(&self, collection: Collection) -> usize {
        self.docs
            .lock()
            .unwrap()
            .keys()
            .filter(|(c, _)| *c == collection)
            .count()
    }

    pub fn get(&self, collection: Collection, id: &str) -> Option<Body> {
        let id = ObjectId::parse_str(id).ok()?;
        self.docs.lock().unwrap().get(&(collection, id)).cloned()
    }

    /// Make every later insert fail as if the database were unreachable.
    pub fn fail_writes(&self) {
        self.fail_writes.store(true, Ordering::SeqCst);
    }

    fn touch(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn insert_one(&self, collection: Collection, body: Body) -> Result<Document, StoreError> {
        self.touch();
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Database(sqlx::Error::PoolTimedOut));
        }
        let id = ObjectId::new();
        self.docs.lock().unwrap().insert((collection, id), body.clone());
        self.order.lock().unwrap().push((collection, id));
        Ok(Document { id, body })
    }

    async fn find_one(
        &self,
        collection: Collection,
        id: ObjectId,
    ) -> Result<Option<Document>, StoreError> {
        self.touch();
        Ok(self
            .docs
            .lock()
            .unwrap()
            .get(&(collection, id))
            .cloned()
            .map(|body| Document { id, body }))
    }

    async fn find_many(
        &self,
        collection: Collection,
        filter: &Filter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Document>, StoreError> {
        self.touch();
        let docs = self.docs.lock().unwrap();
        let order = self.order.lock().unwrap();
        let mut matched: Vec<_> = order
            .iter()
            .rev()
            .filter(|(c, _)| *c == collection)
            .filter_map(|key| docs.get(key).map(|body| (key.1, body)))
            .filter(|(_, body)| filter.matches(body))
            .collect();
        if let Some(field) = filter.sort_field() {
            // Stable, so newest first survives as the tie-break.
            matched.sort_by_key(|(_, body)| match body.get(field).and_then(Value::as_i64) {
                Some(n) => (0, n),
                None => (1, 0),
            });
        }
        Ok(matched
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .map(|(id, body)| Document {
                id,
                body: body.clone(),
            })
            .collect())
    }

    async fn update_one(
        &self,
        collection: Collection,
        id: ObjectId,
        set: Body,
    ) -> Result<Option<Document>, StoreError> {
        self.touch();
        let mut docs = self.docs.lock().unwrap();
        Ok(docs.get_mut(&(collection, id)).map(|body| {
            body.extend(set);
            Document {
                id,
                body: body.clone(),
            }
        }))
    }

    async fn append(
        &self,
        collection: Collection,
        id: ObjectId,
        field: &str,
        value: Value,
        set: Body,
    ) -> Result<Option<Document>, StoreError> {
        self.touch();
        let mut docs = self.docs.lock().unwrap();
        Ok(docs.get_mut(&(collection, id)).map(|body| {
            match body.get_mut(field) {
                Some(Value::Array(items)) => items.push(value),
                _ => {
                    body.insert(field.to_string(), Value::Array(vec![value]));
                }
            }
            body.extend(set);
            Document {
                id,
                body: body.clone(),
            }
        }))
    }

    async fn delete_one(&self, collection: Collection, id: ObjectId) -> Result<bool, StoreError> {
        self.touch();
        let removed = self.docs.lock().unwrap().remove(&(collection, id)).is_some();
        self.order.lock().unwrap().retain(|key| *key != (collection, id));
        Ok(removed)
    }
}

pub struct StubIdentity;

#[async_trait]
impl IdentityProvider for StubIdentity {
    async fn verify_id_token(
        &self,
        token: &str,
        check_revoked: bool,
    ) -> Result<SessionIdentity, IdentityError> {
        assert!(check_revoked, "session checks must request revocation");
        match token {
            VALID_SESSION => Ok(SessionIdentity {
                uid: "dashboard-user".into(),
                email: Some("editor@showcase.test".into()),
                email_verified: true,
            }),
            EXPIRED_SESSION => Err(IdentityError::Expired),
            REVOKED_SESSION => Err(IdentityError::Revoked),
            _ => Err(IdentityError::InvalidArgument("not a stub token".into())),
        }
    }
}

pub struct StubImages;

#[async_trait]
impl ImageHost for StubImages {
    async fn upload(
        &self,
        image: &str,
        name: Option<&str>,
    ) -> Result<UploadedImage, ImageHostError> {
        if image == "reject-me" {
            return Err(ImageHostError::Rejected("Invalid image".into()));
        }
        let name = name.unwrap_or("upload");
        Ok(UploadedImage {
            url: format!("https://i.ibb.co/test/{name}.png"),
            display_url: format!("https://ibb.co/test/{name}"),
            delete_url: None,
        })
    }
}

pub struct TestApp {
    pub addr: SocketAddr,
    pub store: Arc<MemoryStore>,
    pub tokens: TokenCodec,
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

/// Spin up a real Axum server on a random port backed by an in-memory store.
pub async fn setup_test_app() -> TestApp {
    let store = Arc::new(MemoryStore::default());
    let tokens = TokenCodec::new(JWT_SECRET);

    let state = AppState {
        store: store.clone(),
        tokens: tokens.clone(),
        identity: Arc::new(StubIdentity),
        images: Arc::new(StubImages),
    };

    let app = api::router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind to random port");
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestApp {
        addr,
        store,
        tokens,
    }
}

/// Build a reqwest client (reusable across requests in a test).
pub fn http_client() -> reqwest::Client {
    reqwest::Client::new()
}

pub fn bearer(token: &str) -> String {
    format!("Bearer {}", token)
}

pub fn admin_token(app: &TestApp) -> String {
    app.tokens
        .issue_admin_token("65a1b2c3d4e5f60718293a4b", "support@showcase.test", None)
        .expect("Failed to issue admin token")
}

/// Create a project through the API and return its JSON.
pub async fn create_project(app: &TestApp, title: &str, category: &str) -> Value {
    let resp = http_client()
        .post(app.url("/api/projects"))
        .header("Authorization", bearer(VALID_SESSION))
        .json(&serde_json::json!({
            "title": title,
            "description": "A project used in tests",
            "category": category,
        }))
        .send()
        .await
        .expect("Create project request failed");
    assert_eq!(resp.status(), 201, "Project creation should return 201");
    resp.json().await.expect("Failed to parse project")
}

/// Open a ticket through the API and return `(ticket, access_token)`.
pub async fn open_ticket(app: &TestApp, email: &str) -> (Value, String) {
    let resp = http_client()
        .post(app.url("/api/tickets"))
        .json(&serde_json::json!({
            "name": "Ada",
            "email": email,
            "subject": "Docs build fails",
            "message": "The example in chapter 2 does not compile.",
        }))
        .send()
        .await
        .expect("Open ticket request failed");
    assert_eq!(resp.status(), 201, "Ticket creation should return 201");

    let body: Value = resp.json().await.expect("Failed to parse ticket");
    let token = body["access_token"]
        .as_str()
        .expect("Response should contain access_token")
        .to_string();
    (body["ticket"].clone(), token)
}

/// Shared buffer for capturing log output in a test.
#[derive(Clone, Default)]
pub struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl LogBuffer {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Route this thread's logs into a buffer until the guard drops.
/// Works with `#[tokio::test]`'s current-thread runtime.
pub fn capture_logs() -> (LogBuffer, tracing::subscriber::DefaultGuard) {
    let buffer = LogBuffer::default();
    let writer = buffer.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_ansi(false)
        .with_max_level(tracing::Level::DEBUG)
        .with_writer(move || writer.clone())
        .finish();
    let guard = tracing::subscriber::set_default(subscriber);
    (buffer, guard)
}
