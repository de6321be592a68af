use async_trait::async_trait;
use insight_protocol::{
    FilterCatalog, LoginRequest, ProblemDetails, Record, SelectedFilters, SessionGrant,
    SignupRequest, UserInfo,
};
use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;

#[derive(thiserror::Error, Debug)]
pub enum ClientError {
    #[error("transport: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    #[error("server returned {status}: {message}")]
    Status { status: u16, message: String },
}

impl ClientError {
    /// Text suitable for an "unavailable" banner.
    pub fn message(&self) -> String {
        match self {
            ClientError::Status { message, .. } | ClientError::Unauthorized(message) => {
                message.clone()
            }
            ClientError::Transport(err) => err.to_string(),
        }
    }
}

/// An authenticated session. Created by login or signup, consumed by logout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    token: String,
    pub user: UserInfo,
    pub expires_at: String,
}

impl Session {
    pub fn from_grant(grant: SessionGrant) -> Self {
        Self {
            token: grant.token,
            user: grant.user,
            expires_at: grant.expires_at,
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }
}

/// Read access the dashboard controller needs.
#[async_trait]
pub trait DashboardApi: Send + Sync + 'static {
    async fn catalog(&self) -> Result<FilterCatalog, ClientError>;

    async fn query(&self, filters: &SelectedFilters) -> Result<Vec<Record>, ClientError>;
}

#[derive(Debug, Clone)]
pub struct HttpDashboardApi {
    client: Client,
    base: String,
    session: Option<Session>,
}

impl HttpDashboardApi {
    pub fn new(base: impl Into<String>) -> Self {
        Self::with_client(Client::new(), base)
    }

    pub fn with_client(client: Client, base: impl Into<String>) -> Self {
        Self {
            client,
            base: base.into().trim_end_matches('/').to_string(),
            session: None,
        }
    }

    /// Attach a session; its token is sent on every dashboard request.
    pub fn with_session(mut self, session: Option<Session>) -> Self {
        self.session = session;
        self
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    fn bearer(req: RequestBuilder, session: Option<&Session>) -> RequestBuilder {
        match session {
            Some(s) if !s.token.trim().is_empty() => {
                req.header(AUTHORIZATION, format!("Bearer {}", s.token.trim()))
            }
            _ => req,
        }
    }

    pub async fn signup(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<Session, ClientError> {
        let body = SignupRequest {
            username: username.to_string(),
            email: email.to_string(),
            password: password.to_string(),
        };
        let resp = self
            .client
            .post(self.url("/api/auth/signup"))
            .header(ACCEPT, "application/json")
            .json(&body)
            .send()
            .await?;
        let grant: SessionGrant = decode(resp).await?;
        Ok(Session::from_grant(grant))
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<Session, ClientError> {
        let body = LoginRequest {
            username: username.to_string(),
            password: password.to_string(),
        };
        let resp = self
            .client
            .post(self.url("/api/auth/login"))
            .header(ACCEPT, "application/json")
            .json(&body)
            .send()
            .await?;
        let grant: SessionGrant = decode(resp).await?;
        Ok(Session::from_grant(grant))
    }

    /// End a session on the server. The session is consumed either way.
    pub async fn logout(&self, session: Session) -> Result<(), ClientError> {
        let req = self.client.post(self.url("/api/auth/logout"));
        let resp = Self::bearer(req, Some(&session)).send().await?;
        if resp.status().is_success() {
            Ok(())
        } else {
            Err(failure(resp).await)
        }
    }

    pub async fn me(&self, session: &Session) -> Result<UserInfo, ClientError> {
        let req = self
            .client
            .get(self.url("/api/auth/me"))
            .header(ACCEPT, "application/json");
        let resp = Self::bearer(req, Some(session)).send().await?;
        decode(resp).await
    }
}

#[async_trait]
impl DashboardApi for HttpDashboardApi {
    async fn catalog(&self) -> Result<FilterCatalog, ClientError> {
        let req = self
            .client
            .get(self.url("/api/dashboard/filters"))
            .header(ACCEPT, "application/json");
        let resp = Self::bearer(req, self.session.as_ref()).send().await?;
        decode(resp).await
    }

    async fn query(&self, filters: &SelectedFilters) -> Result<Vec<Record>, ClientError> {
        let req = self
            .client
            .get(self.url("/api/dashboard"))
            .query(&filters.query_pairs())
            .header(ACCEPT, "application/json");
        let resp = Self::bearer(req, self.session.as_ref()).send().await?;
        decode(resp).await
    }
}

async fn decode<T: DeserializeOwned>(resp: Response) -> Result<T, ClientError> {
    if !resp.status().is_success() {
        return Err(failure(resp).await);
    }
    Ok(resp.json::<T>().await?)
}

async fn failure(resp: Response) -> ClientError {
    let status = resp.status();
    let fallback = status
        .canonical_reason()
        .unwrap_or("request failed")
        .to_string();
    let message = match resp.json::<ProblemDetails>().await {
        Ok(problem) => problem.detail.or(problem.message).unwrap_or(problem.title),
        Err(_) => fallback,
    };
    if status == StatusCode::UNAUTHORIZED {
        ClientError::Unauthorized(message)
    } else {
        ClientError::Status {
            status: status.as_u16(),
            message,
        }
    }
}
