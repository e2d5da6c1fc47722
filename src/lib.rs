use std::borrow::Cow;
use std::time::Duration;

use chrono::NaiveDateTime;
use derivative::Derivative;
use derive_builder::Builder;
use derive_more::{Display, From};
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::redirect::Policy;
use reqwest::{Client, ClientBuilder, Method, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

pub const API_URL: &str = "https://medium2.p.rapidapi.com";

const API_KEY_HEADER: &str = "x-rapidapi-key";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Derivative, Builder)]
#[derivative(Debug)]
#[builder(setter(into))]
/// Medium Api Config
pub struct MediumConfig<'a> {
  /// RapidAPI key
  ///
  /// **Required**, must be non-empty. Redacted from `Debug` output.
  #[derivative(Debug = "ignore")]
  api_key: Cow<'a, str>,
  #[builder(default = "Cow::Borrowed(API_URL)")]
  /// Base URL of the remote service
  ///
  /// **Optional**, defaults to [`API_URL`]
  base_url: Cow<'a, str>,
  #[builder(default = "DEFAULT_TIMEOUT")]
  /// Request timeout
  ///
  /// **Optional**, defaults to 30 seconds
  timeout: Duration,
  #[builder(default)]
  /// Custom headers
  ///
  /// **Optional**
  custom_headers: HeaderMap,
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct MediumApiErrorBody {
  #[serde(alias = "message")]
  error: String,
}

#[derive(Debug, Error)]
pub enum Error {
  /// The API key is missing, empty, or unusable. Raised before any request
  /// is issued.
  #[error("configuration: {0}")]
  Configuration(String),
  #[error("username must not be empty")]
  EmptyUsername,
  /// The remote service rejected the API key (401/403).
  #[error("authentication rejected by the Medium API ({status})")]
  Authentication { status: StatusCode },
  /// No user matches the requested username or user id.
  #[error("no Medium user matches {user:?}")]
  UserNotFound { user: String },
  /// Any other error status reported by the remote service.
  #[error("Medium API error ({status}): {message}")]
  Api { status: StatusCode, message: String },
  #[error(transparent)]
  Transport(#[from] TransportError),
  #[error(transparent)]
  UrlParseError(#[from] url::ParseError),
}

#[derive(Debug, Error)]
pub enum TransportError {
  /// Connection failure, timeout, or any other network-level error.
  #[error(transparent)]
  Http(#[from] reqwest::Error),
  /// The response body does not match the expected schema.
  #[error("malformed response body: {0}")]
  Schema(#[from] serde_json::Error),
}

impl From<reqwest::Error> for Error {
  fn from(err: reqwest::Error) -> Self {
    Error::Transport(TransportError::Http(err))
  }
}

#[derive(Debug)]
pub struct MediumApi {
  client: Client,
  base_url: Url,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Display, From, Serialize, Deserialize)]
pub struct UserId(String);

impl UserId {
  pub fn as_str(&self) -> &str {
    &self.0
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Display, From, Serialize, Deserialize)]
pub struct ArticleId(String);

impl ArticleId {
  pub fn as_str(&self) -> &str {
    &self.0
  }
}

/// Result of a username lookup. The id is the only field the id-for
/// endpoint returns; the rest of the profile comes from
/// [`MediumApi::get_user_info`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
  pub id: UserId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserInfo {
  pub id: UserId,
  pub username: String,
  pub fullname: String,
  #[serde(default)]
  pub bio: String,
  #[serde(default)]
  pub top_writer_in: Vec<String>,
  pub followers_count: u64,
  pub following_count: u64,
  #[serde(default)]
  pub is_writer_program_enrolled: bool,
  #[serde(default)]
  pub is_book_author: bool,
  #[serde(default)]
  pub is_suspended: bool,
  /// Membership start, `%Y-%m-%d %H:%M:%S` on the wire, empty for
  /// non-members.
  #[serde(default, with = "medium_datetime")]
  pub medium_member_at: Option<NaiveDateTime>,
  #[serde(default)]
  pub twitter_username: Option<String>,
  #[serde(default)]
  pub image_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct UserArticles {
  associated_articles: Vec<ArticleId>,
}

impl MediumApi {
  pub fn new(
    MediumConfig {
      api_key,
      base_url,
      timeout,
      custom_headers,
      ..
    }: MediumConfig<'_>,
  ) -> Result<Self> {
    if api_key.trim().is_empty() {
      return Err(Error::Configuration("API key is missing or empty".into()));
    }

    let mut headers = custom_headers;
    let mut api_key = HeaderValue::from_str(&api_key)
      .map_err(|_| Error::Configuration("API key is not a valid header value".into()))?;

    api_key.set_sensitive(true);

    headers.insert(API_KEY_HEADER, api_key);

    let base_url = base_url.parse::<Url>()?;

    let client = ClientBuilder::new()
      .user_agent(concat!("medium_api/", env!("CARGO_PKG_VERSION")))
      .default_headers(headers)
      .timeout(timeout)
      .redirect(Policy::none())
      .build()?;

    Ok(Self { client, base_url })
  }

  fn request(&self, method: Method, endpoint: &str) -> Result<RequestBuilder> {
    let url = self.base_url.join(endpoint)?;

    Ok(self.client.request(method, url))
  }

  fn get(&self, endpoint: &str) -> Result<RequestBuilder> {
    self.request(Method::GET, endpoint)
  }

  async fn fetch<T: DeserializeOwned>(&self, endpoint: &str, user: &str) -> Result<T> {
    let response: Response = self.get(endpoint)?.send().await?;

    let status = response.status();

    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
      return Err(Error::Authentication { status });
    }

    if status == StatusCode::NOT_FOUND {
      return Err(Error::UserNotFound {
        user: user.to_owned(),
      });
    }

    if status.is_client_error() || status.is_server_error() {
      let message = match response.json::<MediumApiErrorBody>().await {
        Ok(body) => body.error,
        Err(_) => status.canonical_reason().unwrap_or("unknown error").to_owned(),
      };

      return Err(Error::Api { status, message });
    }

    let body = response.text().await?;

    serde_json::from_str(&body).map_err(|err| Error::Transport(TransportError::Schema(err)))
  }

  /// Resolves `username` to a [`UserProfile`] via the id-for endpoint.
  ///
  /// Issues exactly one request; an empty username is rejected before any
  /// I/O happens.
  pub async fn get_user_by_username(&self, username: &str) -> Result<UserProfile> {
    if username.trim().is_empty() {
      return Err(Error::EmptyUsername);
    }

    debug!(username, "resolving user id");

    self.fetch(&format!("/user/id_for/{username}"), username).await
  }

  /// Fetches the full profile for a previously resolved user id.
  pub async fn get_user_info(&self, id: &UserId) -> Result<UserInfo> {
    debug!(user_id = %id, "fetching user info");

    self.fetch(&format!("/user/{id}"), id.as_str()).await
  }

  /// Lists the ids of the articles the user has written.
  pub async fn get_user_articles(&self, id: &UserId) -> Result<Vec<ArticleId>> {
    debug!(user_id = %id, "listing user articles");

    let articles: UserArticles = self.fetch(&format!("/user/{id}/articles"), id.as_str()).await?;

    Ok(articles.associated_articles)
  }
}

mod medium_datetime {
  use chrono::NaiveDateTime;
  use serde::{Deserialize, Deserializer, Serializer};

  const FORMAT: &str = "%Y-%m-%d %H:%M:%S";

  pub fn serialize<S>(value: &Option<NaiveDateTime>, serializer: S) -> Result<S::Ok, S::Error>
  where
    S: Serializer,
  {
    match value {
      Some(at) => serializer.serialize_str(&at.format(FORMAT).to_string()),
      None => serializer.serialize_str(""),
    }
  }

  pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<NaiveDateTime>, D::Error>
  where
    D: Deserializer<'de>,
  {
    let raw = Option::<String>::deserialize(deserializer)?;

    match raw.as_deref() {
      None | Some("") => Ok(None),
      Some(value) => NaiveDateTime::parse_from_str(value, FORMAT)
        .map(Some)
        .map_err(serde::de::Error::custom),
    }
  }
}
