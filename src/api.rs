use reqwest::{
    header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE},
    Client, Method, Response, StatusCode,
};
use serde::Serialize;
use tracing::{debug, error};

use crate::session::Session;

/// Backend HTTP client carrying the session context. Injects JSON and
/// bearer headers on every call and reacts to unauthorized responses by
/// dropping the local session; navigation is left to the caller.
#[derive(Clone)]
pub struct ApiClient {
    http: Client,
    base_url: String,
    session: Session,
}

impl ApiClient {
    pub fn new(http: Client, base_url: String, session: Session) -> Self {
        Self {
            http,
            base_url,
            session,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    /// Perform a backend call. Header precedence on conflicts:
    /// caller-supplied > injected bearer > injected content-type. The
    /// caller's map is read, never mutated.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        headers: &HeaderMap,
        body: Option<&serde_json::Value>,
    ) -> Result<Response, reqwest::Error> {
        let url = self.url(path);

        let mut merged = HeaderMap::new();
        merged.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(token) = self.session.token() {
            if let Ok(value) = HeaderValue::from_str(&format!("Bearer {token}")) {
                merged.insert(AUTHORIZATION, value);
            }
        }
        for (name, value) in headers {
            merged.insert(name, value.clone());
        }

        let mut builder = self.http.request(method, &url).headers(merged);
        if let Some(body) = body {
            builder = builder.body(serde_json::to_vec(body).unwrap());
        }

        let response = builder.send().await.map_err(|err| {
            error!(%url, %err, "backend request failed");
            err
        })?;

        if response.status() == StatusCode::UNAUTHORIZED {
            debug!(%url, "unauthorized response, clearing session");
            self.session.clear_auth();
        }

        Ok(response)
    }

    pub async fn get(&self, path: &str) -> Result<Response, reqwest::Error> {
        self.request(Method::GET, path, &HeaderMap::new(), None)
            .await
    }

    pub async fn post_json<T: Serialize>(
        &self,
        path: &str,
        body: &T,
    ) -> Result<Response, reqwest::Error> {
        let body = serde_json::to_value(body).unwrap();
        self.request(Method::POST, path, &HeaderMap::new(), Some(&body))
            .await
    }
}

/// Pull the `detail` field out of a backend error body, the shape the
/// backend uses for rejections. Falls back to `None` on anything else.
pub async fn error_detail(response: Response) -> Option<String> {
    let body: serde_json::Value = response.json().await.ok()?;
    body.get("detail")
        .and_then(|d| d.as_str())
        .map(str::to_string)
}
