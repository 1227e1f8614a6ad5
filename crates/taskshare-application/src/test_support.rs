//! Shared fixtures for the unit tests of this crate.

use crate::session::{SessionContext, SessionTicket};
use async_trait::async_trait;
use futures::StreamExt;
use futures::channel::mpsc;
use std::sync::{Arc, Mutex};
use taskshare_core::error::{Result, TaskShareError};
use taskshare_core::{
    AuthToken, Category, CategoryDraft, CategoryId, LoginResponse, PushStream, PushTransport,
    SharedWith, Task, TaskApi, TaskDraft, TaskId,
};
use tokio::sync::Notify;

pub fn sample_task(id: TaskId, owner: &str) -> Task {
    Task {
        id,
        title: format!("task {}", id),
        description: String::new(),
        is_done: false,
        category: Category::default_entry(1),
        owner: owner.to_string(),
        shared_with: SharedWith::new(),
        display_order: id,
    }
}

pub fn login_response(tasks: Vec<Task>) -> LoginResponse {
    LoginResponse {
        token: AuthToken::new("test-token"),
        tasks,
        categories: vec![Category::default_entry(1)],
    }
}

pub async fn logged_in(user: &str, tasks: Vec<Task>) -> (SessionContext, SessionTicket) {
    let session = SessionContext::new();
    let ticket = session.begin(user, login_response(tasks)).await;
    (session, ticket)
}

/// In-memory `TaskApi` that records calls.
///
/// `fail_next` makes the next mutating call fail; `gate` makes every
/// mutating call wait for a permit before answering.
pub struct MockTaskApi {
    calls: Mutex<Vec<String>>,
    failure: Mutex<Option<TaskShareError>>,
    next_id: Mutex<i64>,
    gate: Mutex<Option<Arc<Notify>>>,
    login: Mutex<Option<LoginResponse>>,
    deleted_category_tasks: Mutex<Vec<Task>>,
}

impl MockTaskApi {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            failure: Mutex::new(None),
            next_id: Mutex::new(100),
            gate: Mutex::new(None),
            login: Mutex::new(None),
            deleted_category_tasks: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn fail_next(&self, err: TaskShareError) {
        *self.failure.lock().unwrap() = Some(err);
    }

    pub fn set_next_id(&self, id: i64) {
        *self.next_id.lock().unwrap() = id;
    }

    pub fn set_login(&self, response: LoginResponse) {
        *self.login.lock().unwrap() = Some(response);
    }

    pub fn set_category_delete_result(&self, tasks: Vec<Task>) {
        *self.deleted_category_tasks.lock().unwrap() = tasks;
    }

    pub fn gate(&self) -> Arc<Notify> {
        let notify = Arc::new(Notify::new());
        *self.gate.lock().unwrap() = Some(notify.clone());
        notify
    }

    async fn call(&self, name: &str) -> Result<()> {
        let gate = self.gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        self.calls.lock().unwrap().push(name.to_string());
        match self.failure.lock().unwrap().take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn allocate_id(&self) -> i64 {
        let mut next = self.next_id.lock().unwrap();
        let id = *next;
        *next += 1;
        id
    }
}

#[async_trait]
impl TaskApi for MockTaskApi {
    async fn register(&self, _username: &str, _password: &str) -> Result<()> {
        self.call("register").await
    }

    async fn login(&self, _username: &str, _password: &str) -> Result<LoginResponse> {
        self.call("login").await?;
        Ok(self
            .login
            .lock()
            .unwrap()
            .clone()
            .unwrap_or_else(|| login_response(Vec::new())))
    }

    async fn create_task(&self, _token: &AuthToken, _draft: &TaskDraft) -> Result<TaskId> {
        self.call("create_task").await?;
        Ok(self.allocate_id())
    }

    async fn update_task(&self, _token: &AuthToken, _task: &Task) -> Result<()> {
        self.call("update_task").await
    }

    async fn delete_task(&self, _token: &AuthToken, _id: TaskId) -> Result<()> {
        self.call("delete_task").await
    }

    async fn share_task(&self, _token: &AuthToken, _id: TaskId, _target: &str) -> Result<()> {
        self.call("share_task").await
    }

    async fn unshare_task(&self, _token: &AuthToken, _id: TaskId, _target: &str) -> Result<()> {
        self.call("unshare_task").await
    }

    async fn swap_order(&self, _token: &AuthToken, _upper: TaskId, _lower: TaskId) -> Result<()> {
        self.call("swap_order").await
    }

    async fn create_category(
        &self,
        _token: &AuthToken,
        _draft: &CategoryDraft,
    ) -> Result<CategoryId> {
        self.call("create_category").await?;
        Ok(self.allocate_id())
    }

    async fn update_category(&self, _token: &AuthToken, _category: &Category) -> Result<()> {
        self.call("update_category").await
    }

    async fn delete_category(&self, _token: &AuthToken, _id: CategoryId) -> Result<Vec<Task>> {
        self.call("delete_category").await?;
        Ok(self.deleted_category_tasks.lock().unwrap().clone())
    }
}

/// Push transport backed by an in-memory channel; each `connect` hands out
/// the receiver prepared by the last [`MockPushTransport::sender`] call.
pub struct MockPushTransport {
    receiver: Mutex<Option<mpsc::UnboundedReceiver<Result<String>>>>,
    connects: Mutex<usize>,
}

impl MockPushTransport {
    pub fn new() -> Self {
        Self {
            receiver: Mutex::new(None),
            connects: Mutex::new(0),
        }
    }

    pub fn sender(&self) -> mpsc::UnboundedSender<Result<String>> {
        let (tx, rx) = mpsc::unbounded();
        *self.receiver.lock().unwrap() = Some(rx);
        tx
    }

    pub fn connects(&self) -> usize {
        *self.connects.lock().unwrap()
    }
}

#[async_trait]
impl PushTransport for MockPushTransport {
    async fn connect(&self, _token: &AuthToken) -> Result<PushStream> {
        *self.connects.lock().unwrap() += 1;
        match self.receiver.lock().unwrap().take() {
            Some(rx) => Ok(rx.boxed()),
            None => Err(TaskShareError::transport("connection refused")),
        }
    }
}
