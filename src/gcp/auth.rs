//! # GCP Authentication
//!
//! This module handles authentication with Google Cloud Platform using the
//! OAuth 2.0 "installed application" flow. The operator opens an authorization
//! URL, approves access out-of-band, and pastes the resulting code back into
//! the terminal. The code is exchanged for an access token which is cached on
//! disk per project so later runs skip the prompt.

use std::fs::{self, OpenOptions};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::Utc;
use reqwest::Url;

use crate::client::REQUEST_TIMEOUT;
use crate::error::{ProvisionError, Result};
use crate::gcp::types::{ClientCredentials, Token, TokenResponse};

/// The Google OAuth2 authorization endpoint.
const AUTH_URL: &str = "https://accounts.google.com/o/oauth2/auth";
/// The Google OAuth2 token endpoint.
const TOKEN_URL: &str = "https://accounts.google.com/o/oauth2/token";
/// Out-of-band redirect: the consent page displays the code instead of redirecting.
const REDIRECT_URL: &str = "urn:ietf:wg:oauth:2.0:oob";

/// Scopes requested for the operator and granted to the instance's service account.
pub const SCOPES: [&str; 4] = [
    "https://www.googleapis.com/auth/devstorage.full_control",
    "https://www.googleapis.com/auth/compute",
    "https://www.googleapis.com/auth/sqlservice",
    "https://www.googleapis.com/auth/sqlservice.admin",
];

/// Reads a local file and trims surrounding whitespace.
fn read_credential_file(path: &Path) -> Result<String> {
    match fs::read_to_string(path) {
        Ok(s) => Ok(s.trim().to_string()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Err(ProvisionError::MissingCredentialFile {
            path: path.to_path_buf(),
        }),
        Err(source) => Err(ProvisionError::UnreadableCredentialFile {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Loads the installed-application client id and secret from two files.
pub fn load_client_credentials(id_path: &Path, secret_path: &Path) -> Result<ClientCredentials> {
    Ok(ClientCredentials {
        client_id: read_credential_file(id_path)?,
        client_secret: read_credential_file(secret_path)?,
    })
}

/// On-disk JSON cache holding the token for one project.
#[derive(Debug, Clone)]
pub struct TokenCache {
    path: PathBuf,
}

impl TokenCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The conventional cache location, `{project}-token.dat` in the working directory.
    pub fn for_project(project: &str) -> Self {
        Self::new(format!("{project}-token.dat"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Any failure to read or parse the cache counts as a miss.
    pub fn load(&self) -> Option<Token> {
        let data = match fs::read_to_string(&self.path) {
            Ok(data) => data,
            Err(e) => {
                tracing::info!(path = %self.path.display(), error = %e, "no cached token");
                return None;
            }
        };
        match serde_json::from_str(&data) {
            Ok(token) => Some(token),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "ignoring malformed token cache");
                None
            }
        }
    }

    /// Writes the token, readable by the owner only on Unix.
    pub fn store(&self, token: &Token) -> io::Result<()> {
        let json = serde_json::to_string_pretty(token)?;
        let mut file = open_private(&self.path)?;
        file.write_all(json.as_bytes())?;
        file.sync_all()
    }
}

#[cfg(unix)]
fn open_private(path: &Path) -> io::Result<fs::File> {
    use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};

    let file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)?;
    // `mode` only applies on creation; an older cache may be wider.
    file.set_permissions(fs::Permissions::from_mode(0o600))?;
    Ok(file)
}

#[cfg(not(unix))]
fn open_private(path: &Path) -> io::Result<fs::File> {
    OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)
}

/// Obtains an access token for the operator, prompting at most once.
#[derive(Debug)]
pub struct CredentialBroker {
    credentials: ClientCredentials,
    cache: TokenCache,
    http: reqwest::Client,
    token_url: String,
}

impl CredentialBroker {
    pub fn new(credentials: ClientCredentials, cache: TokenCache) -> Result<Self> {
        Self::with_timeout(credentials, cache, REQUEST_TIMEOUT)
    }

    /// Like [`CredentialBroker::new`], with a custom limit on the token exchange request.
    pub fn with_timeout(
        credentials: ClientCredentials,
        cache: TokenCache,
        timeout: Duration,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(ProvisionError::HttpClient)?;
        Ok(Self {
            credentials,
            cache,
            http,
            token_url: TOKEN_URL.to_string(),
        })
    }

    #[cfg(test)]
    fn with_token_url(mut self, url: impl Into<String>) -> Self {
        self.token_url = url.into();
        self
    }

    /// Builds the consent page URL the operator must visit.
    pub fn authorization_url(&self, state: &str) -> Result<Url> {
        let scope = SCOPES.join(" ");
        Url::parse_with_params(
            AUTH_URL,
            &[
                ("response_type", "code"),
                ("client_id", self.credentials.client_id.as_str()),
                ("redirect_uri", REDIRECT_URL),
                ("scope", scope.as_str()),
                ("state", state),
            ],
        )
        .map_err(|e| ProvisionError::Authentication(format!("invalid authorization URL: {e}")))
    }

    /// Returns the cached token if it is present and not yet expired.
    pub fn cached_token(&self) -> Option<Token> {
        let token = self.cache.load()?;
        if token.is_expired(Utc::now()) {
            tracing::info!(path = %self.cache.path().display(), "cached token has expired");
            return None;
        }
        Some(token)
    }

    /// Returns a usable token, running the interactive flow on a cache miss.
    ///
    /// `input` supplies the operator's pasted authorization code. It is only
    /// read when the cache has no usable token.
    pub async fn authenticate<R: BufRead>(&self, input: &mut R) -> Result<Token> {
        if let Some(token) = self.cached_token() {
            tracing::debug!(path = %self.cache.path().display(), "using cached token");
            return Ok(token);
        }

        let url = self.authorization_url("camlistore-gce")?;
        prompt(&mut io::stdout().lock(), &url)?;

        let code = read_auth_code(input)?;
        let token = self.exchange(&code).await?;

        if let Err(e) = self.cache.store(&token) {
            tracing::warn!(path = %self.cache.path().display(), error = %e, "failed to write token cache");
        }
        Ok(token)
    }

    /// Exchanges an authorization code for a token. Not retried on failure.
    pub async fn exchange(&self, code: &str) -> Result<Token> {
        let params = [
            ("code", code),
            ("client_id", self.credentials.client_id.as_str()),
            ("client_secret", self.credentials.client_secret.as_str()),
            ("redirect_uri", REDIRECT_URL),
            ("grant_type", "authorization_code"),
        ];

        let response = self
            .http
            .post(&self.token_url)
            .form(&params)
            .send()
            .await
            .map_err(|e| ProvisionError::Authentication(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(ProvisionError::Authentication(format!(
                "{status}: {error_text}"
            )));
        }

        let token_response: TokenResponse = response
            .json()
            .await
            .map_err(|e| ProvisionError::Authentication(e.to_string()))?;
        Ok(token_response.into_token(Utc::now()))
    }
}

fn prompt<W: Write>(out: &mut W, url: &Url) -> Result<()> {
    write!(out, "Get auth code from {url}\n\nEnter auth code: ")
        .and_then(|()| out.flush())
        .map_err(|e| ProvisionError::Authentication(format!("failed to prompt for auth code: {e}")))
}

fn read_auth_code<R: BufRead>(input: &mut R) -> Result<String> {
    let mut line = String::new();
    input
        .read_line(&mut line)
        .map_err(|e| ProvisionError::Authentication(format!("failed to read auth code: {e}")))?;
    let code = line.trim();
    if code.is_empty() {
        return Err(ProvisionError::Authentication(
            "no auth code entered".to_string(),
        ));
    }
    Ok(code.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use chrono::Duration;
    use std::io::Cursor;

    fn credentials() -> ClientCredentials {
        ClientCredentials {
            client_id: "1234.apps.googleusercontent.com".to_string(),
            client_secret: "s3cret".to_string(),
        }
    }

    fn token(expiry: Option<chrono::DateTime<Utc>>) -> Token {
        Token {
            access_token: "ya29.cached".to_string(),
            token_type: "Bearer".to_string(),
            refresh_token: Some("1/refresh".to_string()),
            expiry,
        }
    }

    #[test]
    fn loads_and_trims_credentials() {
        let dir = tempfile::tempdir().unwrap();
        let id = dir.path().join("client-id.dat");
        let secret = dir.path().join("client-secret.dat");
        fs::write(&id, "  my-id\n").unwrap();
        fs::write(&secret, "my-secret\n\n").unwrap();

        let creds = load_client_credentials(&id, &secret).unwrap();
        assert_eq!(creds.client_id, "my-id");
        assert_eq!(creds.client_secret, "my-secret");
    }

    #[test]
    fn missing_credential_file() {
        let dir = tempfile::tempdir().unwrap();
        let id = dir.path().join("client-id.dat");
        fs::write(&id, "my-id").unwrap();
        let secret = dir.path().join("client-secret.dat");

        let err = load_client_credentials(&id, &secret).unwrap_err();
        assert!(
            matches!(&err, ProvisionError::MissingCredentialFile { path } if *path == secret)
        );
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn unreadable_credential_file() {
        let dir = tempfile::tempdir().unwrap();
        // A directory exists but cannot be read as a file.
        let err = load_client_credentials(dir.path(), dir.path()).unwrap_err();
        assert!(matches!(err, ProvisionError::UnreadableCredentialFile { .. }));
    }

    #[test]
    fn token_cache_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let cache = TokenCache::new(dir.path().join("acme-token.dat"));
        assert!(cache.load().is_none());

        let t = token(Some(Utc::now() + Duration::hours(1)));
        cache.store(&t).unwrap();
        assert_eq!(cache.load(), Some(t));
    }

    #[test]
    fn malformed_cache_is_a_miss() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("acme-token.dat");
        fs::write(&path, "not json").unwrap();
        assert!(TokenCache::new(path).load().is_none());
    }

    #[test]
    fn cache_file_is_named_after_project() {
        assert_eq!(
            TokenCache::for_project("acme").path(),
            Path::new("acme-token.dat")
        );
    }

    #[test]
    fn authorization_url_carries_client_and_scopes() {
        let dir = tempfile::tempdir().unwrap();
        let broker = CredentialBroker::new(credentials(), TokenCache::new(dir.path().join("t"))).unwrap();
        let url = broker.authorization_url("state-1").unwrap();

        assert_eq!(url.host_str(), Some("accounts.google.com"));
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        let get = |k: &str| {
            pairs
                .iter()
                .find(|(key, _)| key == k)
                .map(|(_, v)| v.clone())
        };
        assert_eq!(get("client_id").as_deref(), Some("1234.apps.googleusercontent.com"));
        assert_eq!(get("redirect_uri").as_deref(), Some(REDIRECT_URL));
        assert_eq!(get("response_type").as_deref(), Some("code"));
        assert_eq!(get("state").as_deref(), Some("state-1"));
        assert_eq!(get("scope").unwrap().split(' ').count(), 4);
    }

    #[tokio::test]
    async fn cached_token_skips_prompt() {
        let dir = tempfile::tempdir().unwrap();
        let cache = TokenCache::new(dir.path().join("acme-token.dat"));
        let t = token(Some(Utc::now() + Duration::hours(1)));
        cache.store(&t).unwrap();

        let broker = CredentialBroker::new(credentials(), cache).unwrap();
        // Empty input would fail if the broker tried to prompt.
        let got = broker.authenticate(&mut Cursor::new("")).await.unwrap();
        assert_eq!(got, t);
    }

    #[tokio::test]
    async fn expired_cache_prompts_again() {
        let dir = tempfile::tempdir().unwrap();
        let cache = TokenCache::new(dir.path().join("acme-token.dat"));
        cache
            .store(&token(Some(Utc::now() - Duration::minutes(5))))
            .unwrap();

        let broker = CredentialBroker::new(credentials(), cache).unwrap();
        let err = broker.authenticate(&mut Cursor::new("\n")).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Authentication);
        assert!(err.to_string().contains("no auth code entered"));
    }

    #[test]
    fn auth_code_is_trimmed() {
        let code = read_auth_code(&mut Cursor::new("  4/abc-def \n")).unwrap();
        assert_eq!(code, "4/abc-def");
    }

    #[cfg(unix)]
    #[test]
    fn token_cache_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("acme-token.dat");
        let cache = TokenCache::new(&path);
        cache.store(&token(None)).unwrap();
        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o077, 0, "mode {mode:o}");

        // An existing world-readable cache is tightened on rewrite.
        fs::set_permissions(&path, fs::Permissions::from_mode(0o644)).unwrap();
        cache.store(&token(None)).unwrap();
        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600, "mode {mode:o}");
        assert_eq!(cache.load(), Some(token(None)));
    }

    #[tokio::test]
    async fn stalled_token_exchange_times_out() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        // Accept the connection and never answer.
        let server = tokio::spawn(async move {
            let (_socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(std::time::Duration::from_secs(60)).await;
        });

        let dir = tempfile::tempdir().unwrap();
        let broker = CredentialBroker::with_timeout(
            credentials(),
            TokenCache::new(dir.path().join("t")),
            std::time::Duration::from_millis(200),
        )
        .unwrap()
        .with_token_url(format!("http://{addr}/token"));

        let result = tokio::time::timeout(std::time::Duration::from_secs(10), broker.exchange("4/abc"))
            .await
            .expect("exchange should give up on its own");
        let err = result.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Authentication);
        server.abort();
    }

    struct BrokenStdout;

    impl Write for BrokenStdout {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
        }
    }

    #[test]
    fn prompt_flush_failure_is_reported() {
        let url = Url::parse(AUTH_URL).unwrap();
        let err = prompt(&mut BrokenStdout, &url).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Authentication);
        assert!(err.to_string().contains("failed to prompt for auth code"));

        let mut out = Vec::new();
        prompt(&mut out, &url).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("Get auth code from https://accounts.google.com/"));
        assert!(text.ends_with("\n\nEnter auth code: "));
    }
}
