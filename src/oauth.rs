// ABOUTME: OAuth client descriptor, token endpoint calls, and loopback login
// ABOUTME: Exchanges authorization codes and refresh tokens for access tokens

use crate::api::truncate_str;
use crate::{Error, Result};
use rand::Rng;
use reqwest::blocking::Client;
use reqwest::Url;
use serde::Deserialize;
use std::fs;
use std::io::{BufRead, BufReader, Write};
use std::net::TcpListener;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const SCOPES: &[&str] = &[
    "https://www.googleapis.com/auth/documents",
    "https://www.googleapis.com/auth/drive",
];

const DEFAULT_AUTH_URI: &str = "https://accounts.google.com/o/oauth2/auth";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// OAuth client registration, as downloaded from the provider console.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ClientSecrets {
    pub client_id: String,
    #[serde(default)]
    pub client_secret: String,
    #[serde(default = "default_auth_uri")]
    pub auth_uri: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_auth_uri() -> String {
    DEFAULT_AUTH_URI.into()
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.into()
}

impl ClientSecrets {
    /// Read the descriptor. Accepts the `installed` and `web` wrappers as
    /// well as a bare object.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::Auth(format!(
                "credentials.json not found at {}\n\
                 Download OAuth client credentials (Desktop app) from the Google Cloud Console,\n\
                 with the Docs and Drive APIs enabled, and save them at that path.",
                path.display()
            )));
        }

        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self> {
        #[derive(Deserialize)]
        struct Wrapper {
            installed: Option<ClientSecrets>,
            web: Option<ClientSecrets>,
        }

        let value: serde_json::Value = serde_json::from_str(content)?;
        let wrapper: Wrapper = serde_json::from_value(value.clone())?;
        if let Some(secrets) = wrapper.installed.or(wrapper.web) {
            return Ok(secrets);
        }
        serde_json::from_value(value)
            .map_err(|e| Error::Auth(format!("Unrecognized client credentials file: {}", e)))
    }
}

/// Response of the token endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenGrant {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default = "default_expires_in")]
    pub expires_in: i64,
    #[serde(default)]
    pub scope: Option<String>,
}

fn default_expires_in() -> i64 {
    3600
}

/// The authorization server, as seen by the credential lifecycle.
pub trait OAuthFlow {
    /// Trade a refresh token for a fresh access token.
    fn refresh(&self, refresh_token: &str) -> Result<TokenGrant>;

    /// Run the interactive consent flow for `scopes`.
    fn authorize(&self, scopes: &[&str]) -> Result<TokenGrant>;
}

pub struct GoogleOAuth {
    secrets: ClientSecrets,
    http: Client,
    open_browser: bool,
}

impl GoogleOAuth {
    pub fn new(secrets: ClientSecrets) -> Result<Self> {
        let http = Client::builder().timeout(Duration::from_secs(30)).build()?;
        Ok(GoogleOAuth {
            secrets,
            http,
            open_browser: true,
        })
    }

    pub fn without_browser(mut self) -> Self {
        self.open_browser = false;
        self
    }

    fn token_request(&self, operation: &str, params: &[(&str, &str)]) -> Result<TokenGrant> {
        tracing::debug!(operation, token_uri = %self.secrets.token_uri, "token endpoint request");

        let response = self
            .http
            .post(&self.secrets.token_uri)
            .header("Accept", "application/json")
            .form(params)
            .send()?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().unwrap_or_default();
            return Err(Error::remote(operation, status.as_u16(), truncate_str(&message, 200)));
        }

        Ok(response.json()?)
    }

    fn exchange_code(&self, code: &str, redirect_uri: &str) -> Result<TokenGrant> {
        self.token_request(
            "authorization code exchange",
            &[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("redirect_uri", redirect_uri),
                ("client_id", self.secrets.client_id.as_str()),
                ("client_secret", self.secrets.client_secret.as_str()),
            ],
        )
    }

    pub fn authorization_url(&self, scopes: &[&str], redirect_uri: &str, state: &str) -> Result<Url> {
        let scope = scopes.join(" ");
        Url::parse_with_params(
            &self.secrets.auth_uri,
            &[
                ("client_id", self.secrets.client_id.as_str()),
                ("redirect_uri", redirect_uri),
                ("response_type", "code"),
                ("scope", scope.as_str()),
                ("state", state),
                ("access_type", "offline"),
                ("prompt", "consent"),
            ],
        )
        .map_err(|e| Error::Auth(format!("Invalid auth_uri {}: {}", self.secrets.auth_uri, e)))
    }
}

impl OAuthFlow for GoogleOAuth {
    fn refresh(&self, refresh_token: &str) -> Result<TokenGrant> {
        self.token_request(
            "token refresh",
            &[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
                ("client_id", self.secrets.client_id.as_str()),
                ("client_secret", self.secrets.client_secret.as_str()),
            ],
        )
    }

    fn authorize(&self, scopes: &[&str]) -> Result<TokenGrant> {
        let listener = TcpListener::bind("127.0.0.1:0")?;
        let port = listener.local_addr()?.port();
        let redirect_uri = format!("http://127.0.0.1:{}", port);
        let state = format!("{:016x}", rand::thread_rng().gen::<u64>());
        let url = self.authorization_url(scopes, &redirect_uri, &state)?;

        eprintln!("Opening browser for Google authentication...");
        eprintln!("If it does not open, visit:\n  {}", url);
        if self.open_browser {
            if let Err(e) = open::that(url.as_str()) {
                tracing::warn!("could not open browser: {}", e);
            }
        }

        let code = loop {
            let (mut stream, _) = listener.accept()?;
            let mut request_line = String::new();
            BufReader::new(&stream).read_line(&mut request_line)?;

            match parse_callback(&request_line, &state) {
                Ok(Some(code)) => {
                    respond(&mut stream, "Authentication complete. You can close this window.");
                    break code;
                }
                Ok(None) => respond(&mut stream, "Waiting for authorization..."),
                Err(e) => {
                    respond(&mut stream, "Authentication failed. Return to the terminal.");
                    return Err(e);
                }
            }
        };

        tracing::info!("authorization code received, exchanging for tokens");
        self.exchange_code(&code, &redirect_uri)
    }
}

/// [`GoogleOAuth`] built on demand, so commands running on a fresh token
/// never need the client descriptor on disk.
pub struct ClientSecretsFlow {
    secrets_file: PathBuf,
}

impl ClientSecretsFlow {
    pub fn new(secrets_file: PathBuf) -> Self {
        ClientSecretsFlow { secrets_file }
    }

    fn connect(&self) -> Result<GoogleOAuth> {
        GoogleOAuth::new(ClientSecrets::load(&self.secrets_file)?)
    }
}

impl OAuthFlow for ClientSecretsFlow {
    fn refresh(&self, refresh_token: &str) -> Result<TokenGrant> {
        self.connect()?.refresh(refresh_token)
    }

    fn authorize(&self, scopes: &[&str]) -> Result<TokenGrant> {
        self.connect()?.authorize(scopes)
    }
}

fn respond(stream: &mut impl Write, message: &str) {
    let body = format!("<html><body><p>{}</p></body></html>", message);
    let response = format!(
        "HTTP/1.1 200 OK\r\nContent-Type: text/html; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        body.len(),
        body
    );
    let _ = stream.write_all(response.as_bytes());
}

/// Extract the authorization code from the redirect's request line.
/// Returns `Ok(None)` for unrelated requests such as `/favicon.ico`.
pub(crate) fn parse_callback(request_line: &str, expected_state: &str) -> Result<Option<String>> {
    let target = request_line
        .split_whitespace()
        .nth(1)
        .ok_or_else(|| Error::Auth("Malformed redirect request".into()))?;
    let url = Url::parse(&format!("http://127.0.0.1{}", target))
        .map_err(|e| Error::Auth(format!("Malformed redirect target: {}", e)))?;

    let param = |key: &str| {
        url.query_pairs()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.into_owned())
    };

    if let Some(error) = param("error") {
        return Err(Error::Auth(format!("Authorization denied: {}", error)));
    }
    let Some(code) = param("code") else {
        return Ok(None);
    };
    if param("state").as_deref() != Some(expected_state) {
        return Err(Error::Auth("State mismatch in authorization redirect".into()));
    }

    Ok(Some(code))
}
