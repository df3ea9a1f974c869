use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::cookie::{CookieStore, Jar};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, COOKIE};
use reqwest::redirect::Policy;
use reqwest::{Client, Response, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use super::scrape;
use super::traits::DojoApi;
use super::types::{
    Account, ActionResult, ActiveModule, Belts, DockerStatus, Dojo, Module, Score, SolveResponse,
    Standing, StartRequest, WeChallRow,
};
use crate::app::Config;
use crate::constants::{
    AUTH_TOKEN_ENV_VAR, AUTH_TOKEN_PREFIX, AUTH_TOKEN_PURPOSE, HTTP_REQUEST_TIMEOUT_SECS,
    LOGIN_FAILED_MARKER, WECHALL_RANKING_PATH, WECHALL_URL,
};
use crate::flag::loads_timed_unsafe;
use crate::utils::DojoError;

/// How a request is routed and authenticated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestOptions {
    /// Prefix the path with the JSON API root
    pub api: bool,
    /// Attach the workspace token or session cookie
    pub auth: bool,
    /// Fetch and attach a CSRF nonce
    pub csrf: bool,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            api: true,
            auth: true,
            csrf: false,
        }
    }
}

impl RequestOptions {
    /// Unauthenticated API request
    pub fn public() -> Self {
        Self {
            auth: false,
            ..Self::default()
        }
    }

    /// Authenticated website page rather than API endpoint
    pub fn page() -> Self {
        Self {
            api: false,
            ..Self::default()
        }
    }

    pub fn without_auth(self) -> Self {
        Self { auth: false, ..self }
    }

    pub fn with_csrf(self) -> Self {
        Self { csrf: true, ..self }
    }
}

/// Request payload; a body turns the request into a POST
#[derive(Debug, Clone)]
pub enum Body {
    Empty,
    Json(Value),
    Form(Vec<(String, String)>),
}

/// HTTP client for the dojo website
pub struct DojoClient {
    http: Client,
    jar: Arc<Jar>,
    base_url: String,
    api: String,
    cookie_file: PathBuf,
}

impl DojoClient {
    pub fn new(config: &Config) -> Result<Self> {
        let jar = Arc::new(Jar::default());
        let http = Client::builder()
            .cookie_provider(jar.clone())
            .redirect(Policy::none())
            .timeout(Duration::from_secs(HTTP_REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            http,
            jar,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api: config.api.clone(),
            cookie_file: config.cookie_file(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn cookie_file(&self) -> &Path {
        &self.cookie_file
    }

    /// Absolute URL for a path; absolute URLs pass through
    pub fn url(&self, path: &str, api: bool) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        format!(
            "{}{}{}",
            self.base_url,
            if api { self.api.as_str() } else { "" },
            path
        )
    }

    /// Headers proving who we are, in order of preference
    async fn auth_headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();

        if let Some(token) = workspace_token() {
            tracing::debug!("Authenticating with the workspace token");
            headers.insert(AUTHORIZATION, HeaderValue::from_str(&format!("Bearer {}", token))?);
            return Ok(headers);
        }

        if !self.cookie_file.is_file() {
            return Err(DojoError::Unauthorized.into());
        }

        let session = load_cookie(&self.cookie_file)?;
        headers.insert(COOKIE, HeaderValue::from_str(&format!("session={}", session))?);

        let settings = self
            .http
            .get(self.url("/settings", false))
            .headers(headers.clone())
            .send()
            .await?;
        if settings.status().is_redirection() {
            return Err(DojoError::SessionExpired.into());
        }

        Ok(headers)
    }

    async fn nonce(&self, headers: &HeaderMap) -> Result<String> {
        let page = self
            .http
            .get(&self.base_url)
            .headers(headers.clone())
            .send()
            .await?
            .text()
            .await?;
        scrape::extract_nonce(&page).ok_or_else(|| DojoError::Csrf.into())
    }

    /// Send a request; GET without a body, POST with one
    pub async fn request(&self, path: &str, options: RequestOptions, body: Body) -> Result<Response> {
        let url = self.url(path, options.api);
        let mut headers = if options.auth {
            self.auth_headers().await?
        } else {
            HeaderMap::new()
        };

        let mut body = body;
        if options.csrf {
            let nonce = self.nonce(&headers).await?;
            headers.insert(HeaderName::from_static("csrf-token"), HeaderValue::from_str(&nonce)?);
            if let Body::Form(fields) = &mut body {
                fields.push(("nonce".to_string(), nonce));
            }
        }

        let builder = match body {
            Body::Empty => self.http.get(&url),
            Body::Json(value) => self.http.post(&url).json(&value),
            Body::Form(fields) => self.http.post(&url).form(&fields),
        };

        tracing::debug!("Requesting {}", url);
        builder
            .headers(headers)
            .send()
            .await
            .with_context(|| format!("Request to {} failed", url))
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str, options: RequestOptions) -> Result<T> {
        let response = self.request(path, options, Body::Empty).await?;
        parse_json(response).await
    }

    /// A cookie the site has set during this run, as sent to `path`
    pub fn jar_cookie(&self, name: &str, path: &str) -> Option<String> {
        let url = Url::parse(&self.url(path, false)).ok()?;
        let header = self.jar.cookies(&url)?;
        let header = header.to_str().ok()?;
        header.split(';').find_map(|pair| {
            let (key, value) = pair.trim().split_once('=')?;
            (key == name).then(|| value.to_string())
        })
    }

    /// Log in with a password; the new session cookie, or `None` on bad credentials
    pub async fn login(&self, name: &str, password: &str) -> Result<Option<String>> {
        let form = vec![
            ("name".to_string(), name.to_string()),
            ("password".to_string(), password.to_string()),
        ];
        let options = RequestOptions::page().without_auth().with_csrf();
        let response = self.request("/login", options, Body::Form(form)).await?;
        let status = response.status().as_u16();
        let page = response.text().await?;

        if page.contains(LOGIN_FAILED_MARKER) {
            return Ok(None);
        }

        let session = self.jar_cookie("session", "/").ok_or_else(|| DojoError::Api {
            status,
            message: "Login did not return a session cookie".to_string(),
        })?;
        Ok(Some(session))
    }

    /// Authenticated GET of a website page; cookies it sets land in the jar
    pub async fn get_page(&self, path: &str) -> Result<Response> {
        self.request(path, RequestOptions::page(), Body::Empty).await
    }
}

/// Decode the error body of a failed API call into a [`DojoError::Api`]
async fn parse_json<T: DeserializeOwned>(response: Response) -> Result<T> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json::<T>().await?);
    }

    let text = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<Value>(&text)
        .ok()
        .and_then(|body| {
            body.get("error")
                .or_else(|| body.get("message"))
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("Unknown error")
                .to_string()
        });

    Err(DojoError::Api {
        status: status.as_u16(),
        message,
    }
    .into())
}

#[async_trait]
impl DojoApi for DojoClient {
    async fn docker_status(&self) -> Result<DockerStatus> {
        self.get_json("/docker", RequestOptions::default()).await
    }

    async fn start_challenge(&self, request: &StartRequest) -> Result<ActionResult> {
        let body = Body::Json(serde_json::to_value(request)?);
        let response = self
            .request("/docker", RequestOptions::default().with_csrf(), body)
            .await?;
        Ok(response.json().await?)
    }

    async fn me(&self) -> Result<Account> {
        self.get_json("/users/me", RequestOptions::default()).await
    }

    async fn score(&self, username: &str) -> Result<Score> {
        let mut url = Url::parse(&self.url("/score", true))?;
        url.query_pairs_mut().append_pair("username", username);
        let raw: String = self.get_json(url.as_str(), RequestOptions::public()).await?;
        Score::parse(&raw).ok_or_else(|| {
            DojoError::Api {
                status: 200,
                message: format!("Unexpected score format: {}", raw),
            }
            .into()
        })
    }

    async fn belts(&self) -> Result<Belts> {
        self.get_json("/belts", RequestOptions::public()).await
    }

    async fn scoreboard(
        &self,
        dojo: &str,
        module: Option<String>,
        days: u32,
        page: u32,
    ) -> Result<Vec<Standing>> {
        #[derive(Deserialize)]
        struct Scoreboard {
            #[serde(default)]
            standings: Vec<Standing>,
        }

        let path = format!(
            "/scoreboard/{}/{}/{}/{}",
            dojo,
            module.as_deref().unwrap_or("_"),
            days,
            page
        );
        let board: Scoreboard = self.get_json(&path, RequestOptions::public()).await?;
        Ok(board.standings)
    }

    async fn wechall_rankings(&self, page: u32) -> Result<Vec<WeChallRow>> {
        let url = format!("{}{}{}", WECHALL_URL, WECHALL_RANKING_PATH, page);
        let html = self
            .request(&url, RequestOptions::public(), Body::Empty)
            .await?
            .text()
            .await?;
        Ok(scrape::wechall_rankings(&html))
    }

    async fn dojos(&self, auth: bool) -> Result<Vec<Dojo>> {
        #[derive(Deserialize)]
        struct Dojos {
            #[serde(default)]
            dojos: Vec<Dojo>,
        }

        let options = RequestOptions { auth, ..RequestOptions::default() };
        let list: Dojos = self.get_json("/dojos", options).await?;
        Ok(list.dojos)
    }

    async fn modules(&self, dojo: &str, auth: bool) -> Result<Vec<Module>> {
        #[derive(Deserialize)]
        struct Modules {
            #[serde(default)]
            modules: Vec<Module>,
        }

        let options = RequestOptions { auth, ..RequestOptions::default() };
        let list: Modules = self
            .get_json(&format!("/dojos/{}/modules", dojo), options)
            .await?;
        Ok(list.modules)
    }

    async fn active_module(&self) -> Result<Option<ActiveModule>> {
        let response = self
            .request("/active-module", RequestOptions::page(), Body::Empty)
            .await?;
        if response.status().is_redirection() {
            return Ok(None);
        }
        Ok(Some(parse_json(response).await?))
    }

    async fn challenge_numeric_id(
        &self,
        dojo: &str,
        module: &str,
        challenge: &str,
    ) -> Result<Option<i64>> {
        let options = RequestOptions::page().without_auth();
        let html = self
            .request(&format!("/{}/{}", dojo, module), options, Body::Empty)
            .await?
            .text()
            .await?;
        Ok(scrape::challenge_numeric_id(&html, challenge))
    }

    async fn solve(
        &self,
        dojo: &str,
        module: &str,
        challenge: &str,
        flag: &str,
    ) -> Result<SolveResponse> {
        // The workspace token is exempt from CSRF checks
        let options = RequestOptions {
            csrf: !in_dojo(),
            ..RequestOptions::default()
        };
        let path = format!("/dojos/{}/{}/{}/solve", dojo, module, challenge);
        let response = self
            .request(&path, options, Body::Json(json!({ "submission": flag })))
            .await?;

        let status = response.status().as_u16();
        let text = response.text().await?;
        let body = serde_json::from_str(&text).unwrap_or(Value::String(text));
        Ok(SolveResponse { status, body })
    }

    async fn add_ssh_key(&self, public_key: &str) -> Result<ActionResult> {
        let response = self
            .request(
                "/ssh_key",
                RequestOptions::default().with_csrf(),
                Body::Json(json!({ "ssh_key": public_key })),
            )
            .await?;
        Ok(response.json().await?)
    }
}

/// Whether we are running inside a challenge container
pub fn in_dojo() -> bool {
    std::env::var_os(AUTH_TOKEN_ENV_VAR).is_some()
}

/// The workspace token from the environment, if it is well formed
pub fn workspace_token() -> Option<String> {
    let token = std::env::var(AUTH_TOKEN_ENV_VAR).ok()?;
    decode_auth_token(&token).map(|_| token)
}

/// `(account_id, secret)` carried by a workspace token
pub fn decode_auth_token(token: &str) -> Option<(i64, String)> {
    let signed = token.strip_prefix(AUTH_TOKEN_PREFIX)?;
    let (account_id, secret, purpose): (i64, String, String) = loads_timed_unsafe(signed)?;
    (purpose == AUTH_TOKEN_PURPOSE).then_some((account_id, secret))
}

/// Read the session cookie saved by `dojo login`
pub fn load_cookie(path: &Path) -> Result<String> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read cookie file {}", path.display()))?;
    let jar: Value = serde_json::from_str(&raw)
        .map_err(|_| DojoError::Config("Could not decode cookie JSON".to_string()))?;
    let jar = jar
        .as_object()
        .ok_or_else(|| DojoError::Config("Cookie JSON is not a dictionary.".to_string()))?;

    match jar.get("session").and_then(Value::as_str) {
        Some(session) if !session.is_empty() => Ok(session.to_string()),
        _ => Err(DojoError::Config("Cookie JSON does not have a valid session cookie.".to_string()).into()),
    }
}

/// Persist the session cookie, creating parent directories as needed
pub fn save_cookie(path: &Path, session: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, serde_json::to_string(&json!({ "session": session }))?)?;
    Ok(())
}

pub fn delete_cookie(path: &Path) -> Result<()> {
    if !path.is_file() {
        return Err(DojoError::NotLoggedIn.into());
    }
    std::fs::remove_file(path)?;
    Ok(())
}
