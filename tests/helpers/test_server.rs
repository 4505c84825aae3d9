// ABOUTME: In-memory server fixture for HTTP integration tests
// ABOUTME: Fake Analysis Service, recording mailer, test config, and user/session helpers

use async_trait::async_trait;
use counsel_review::{
    config::{
        AnalysisLimits, AnalysisServiceConfig, AuthConfig, CorsConfig, DatabaseConfig,
        EmailConfig, Environment, ServerConfig,
    },
    database::{Database, UserRecord},
    errors::{AppError, AppResult},
    external::{AnalysisService, AnalyzeRequest, DetailedChatRequest},
    models::{AnalysisResult, AnalysisStatement},
    notifications::{Delivery, EmailMessage, Mailer},
    resources::ServerResources,
    routes,
};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// How the fake Analysis Service answers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(dead_code)]
pub enum FakeMode {
    /// Return the configured result
    Succeed,
    /// Upstream non-success
    Fail,
    /// Deadline exceeded
    Timeout,
}

/// Analysis Service double that records every request
pub struct FakeAnalysisService {
    mode: Mutex<FakeMode>,
    result: Mutex<AnalysisResult>,
    chat_answer: Mutex<String>,
    delay: Mutex<Duration>,
    /// Every `analyze` request received
    pub analyze_calls: Mutex<Vec<AnalyzeRequest>>,
    /// Every `detailed_chat` request received
    pub chat_calls: Mutex<Vec<DetailedChatRequest>>,
}

#[allow(dead_code)]
impl FakeAnalysisService {
    fn new() -> Self {
        Self {
            mode: Mutex::new(FakeMode::Succeed),
            result: Mutex::new(sample_analysis()),
            chat_answer: Mutex::new("Try reflecting the feeling first.".to_owned()),
            delay: Mutex::new(Duration::ZERO),
            analyze_calls: Mutex::new(Vec::new()),
            chat_calls: Mutex::new(Vec::new()),
        }
    }

    pub fn set_mode(&self, mode: FakeMode) {
        *self.mode.lock().unwrap() = mode;
    }

    pub fn set_result(&self, result: AnalysisResult) {
        *self.result.lock().unwrap() = result;
    }

    pub fn set_chat_answer(&self, answer: &str) {
        *self.chat_answer.lock().unwrap() = answer.to_owned();
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = delay;
    }

    pub fn analyze_count(&self) -> usize {
        self.analyze_calls.lock().unwrap().len()
    }

    pub fn last_chat_call(&self) -> DetailedChatRequest {
        self.chat_calls
            .lock()
            .unwrap()
            .last()
            .cloned()
            .expect("no detailed-chat call recorded")
    }

    fn failure(&self) -> Option<AppError> {
        match *self.mode.lock().unwrap() {
            FakeMode::Succeed => None,
            FakeMode::Fail => Some(AppError::external_service(
                "Analysis Service",
                "HTTP 500: model overloaded",
            )),
            FakeMode::Timeout => Some(AppError::upstream_timeout("Analysis Service")),
        }
    }

    async fn wait(&self) {
        let delay = *self.delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl AnalysisService for FakeAnalysisService {
    async fn analyze(&self, request: &AnalyzeRequest) -> AppResult<AnalysisResult> {
        self.analyze_calls.lock().unwrap().push(request.clone());
        self.wait().await;
        if let Some(err) = self.failure() {
            return Err(err);
        }
        Ok(self.result.lock().unwrap().clone())
    }

    async fn detailed_chat(&self, request: &DetailedChatRequest) -> AppResult<String> {
        self.chat_calls.lock().unwrap().push(request.clone());
        if let Some(err) = self.failure() {
            return Err(err);
        }
        Ok(self.chat_answer.lock().unwrap().clone())
    }
}

/// How the recording mailer answers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(dead_code)]
pub enum MailMode {
    /// Relay accepted the message
    Deliver,
    /// No relay configured
    Skip,
    /// Relay rejected the message
    Fail,
}

/// Mailer double that keeps every message
pub struct RecordingMailer {
    mode: Mutex<MailMode>,
    /// Every message handed to the mailer
    pub sent: Mutex<Vec<EmailMessage>>,
}

#[allow(dead_code)]
impl RecordingMailer {
    pub fn set_mode(&self, mode: MailMode) {
        *self.mode.lock().unwrap() = mode;
    }

    pub fn messages(&self) -> Vec<EmailMessage> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, message: EmailMessage) -> AppResult<Delivery> {
        self.sent.lock().unwrap().push(message);
        match *self.mode.lock().unwrap() {
            MailMode::Deliver => Ok(Delivery::Sent),
            MailMode::Skip => Ok(Delivery::Skipped),
            MailMode::Fail => Err(AppError::external_service("SMTP", "relay refused")),
        }
    }
}

/// Short statements under every axis, partnership left empty
pub fn sample_analysis() -> AnalysisResult {
    let statement = |text: &str, score: f64| AnalysisStatement {
        statement: text.to_owned(),
        evaluation: Some("Good".to_owned()),
        feedback: Some("Clear reflection".to_owned()),
        score: Some(score),
        ..AnalysisStatement::default()
    };
    AnalysisResult::from_axes(
        vec![statement("How have you been sleeping?", 4.0)],
        vec![statement("It sounds like work has been heavy.", 3.5)],
        vec![statement("It sounds like work has been heavy.", 5.0)],
        vec![],
    )
}

/// Transcript every `sample_analysis` statement refers to
#[allow(dead_code)]
pub const SAMPLE_TRANSCRIPT: &str = "How have you been sleeping?\n\nNot well, honestly.\nIt sounds like work has been heavy.";

/// Configuration with fast hashing and short thresholds
pub fn test_config() -> ServerConfig {
    ServerConfig {
        http_port: 0,
        host: "127.0.0.1".to_owned(),
        environment: Environment::Testing,
        database: DatabaseConfig {
            url: "sqlite::memory:".to_owned(),
        },
        auth: AuthConfig {
            jwt_secret: "integration-test-secret-with-enough-length".to_owned(),
            jwt_expiry_hours: 24,
            bcrypt_cost: 4,
        },
        analysis: AnalysisServiceConfig {
            base_url: "http://127.0.0.1:9".to_owned(),
            timeout_ms: 1_000,
            default_api_key: Some("sk-operator-default-0000".to_owned()),
        },
        limits: AnalysisLimits {
            long_text_threshold: 200,
            max_text_length: 1_000,
            max_chat_history: 50,
        },
        email: EmailConfig {
            app_base_url: "https://review.example.com".to_owned(),
            ..EmailConfig::default()
        },
        cors: CorsConfig {
            allowed_origins: vec!["*".to_owned()],
        },
    }
}

/// Fully wired server over an in-memory database
pub struct TestServer {
    pub resources: Arc<ServerResources>,
    pub analysis: Arc<FakeAnalysisService>,
    pub mailer: Arc<RecordingMailer>,
}

#[allow(dead_code)]
impl TestServer {
    pub async fn new() -> Self {
        Self::with_config(test_config()).await
    }

    /// Server without an operator default credential
    pub async fn without_default_key() -> Self {
        let mut config = test_config();
        config.analysis.default_api_key = None;
        Self::with_config(config).await
    }

    pub async fn with_config(config: ServerConfig) -> Self {
        let database = Database::new(&config.database.url)
            .await
            .expect("Failed to open in-memory database");
        let analysis = Arc::new(FakeAnalysisService::new());
        let mailer = Arc::new(RecordingMailer {
            mode: Mutex::new(MailMode::Deliver),
            sent: Mutex::new(Vec::new()),
        });
        let resources = Arc::new(ServerResources::new(
            database,
            Arc::new(config),
            Arc::clone(&analysis) as Arc<dyn AnalysisService>,
            Arc::clone(&mailer) as Arc<dyn Mailer>,
        ));
        Self {
            resources,
            analysis,
            mailer,
        }
    }

    pub fn router(&self) -> axum::Router {
        routes::router(Arc::clone(&self.resources))
    }

    /// Create an account directly and mint a session token for it
    pub async fn create_user(&self, email: &str) -> (UserRecord, String) {
        let hash = self
            .resources
            .auth_manager
            .hash_password("password123")
            .await
            .unwrap();
        let user = self
            .resources
            .database
            .create_user(email, &hash, Some("Test Counselor"))
            .await
            .unwrap();
        let token = self
            .resources
            .auth_manager
            .generate_token(&user)
            .unwrap()
            .token;
        (user, token)
    }

    /// A transcript long enough for the background path
    pub fn long_transcript(&self) -> String {
        let threshold = self.resources.config.limits.long_text_threshold;
        let mut text = String::from(SAMPLE_TRANSCRIPT);
        while text.chars().count() < threshold {
            text.push_str("\nAnd how did that feel for you at the time?");
        }
        text
    }
}
