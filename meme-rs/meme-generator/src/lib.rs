use std::fmt;
use std::time::Duration;

use meme_registry::TemplateRecord;
use reqwest::blocking::Client;
use reqwest::header::LOCATION;
use reqwest::redirect::Policy;
use reqwest::Url;
use scraper::{ElementRef, Html, Selector};
use serde::Serialize;
use thiserror::Error;

pub const DEFAULT_SERVICE_URL: &str = "http://memegenerator.net";
pub const CREATE_OR_EDIT_PATH: &str = "/Instance/CreateOrEdit";
pub const TEMPLATE_TYPE: &str = "AdviceDogSpinoff";
pub const DEFAULT_USER_AGENT: &str = concat!("meme/", env!("CARGO_PKG_VERSION"), " Rust");

#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("two lines are required for {generator_name}")]
    MissingCaption { generator_name: String },
    #[error(transparent)]
    Transaction(#[from] TransactionError),
}

/// A failed stage of the create/redirect/extract exchange.
#[derive(Debug, Error)]
pub enum TransactionError {
    #[error("could not build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("invalid service URL {url:?}: {message}")]
    Endpoint { url: String, message: String },
    #[error("create request failed: {0}")]
    Post(#[source] reqwest::Error),
    #[error("create response had no Location header (status {status})")]
    MissingLocation { status: u16 },
    #[error("could not resolve redirect {location:?}: {message}")]
    InvalidLocation { location: String, message: String },
    #[error("redirect request failed: {0}")]
    Redirect(#[source] reqwest::Error),
    #[error("could not read redirect response body: {0}")]
    Body(#[source] reqwest::Error),
    #[error("could not parse selector {selector:?}: {message}")]
    Selector { selector: String, message: String },
    #[error("no link to {href:?} in redirect page")]
    AnchorNotFound { href: String },
    #[error("link to {href:?} has no image")]
    ImageNotFound { href: String },
    #[error("image in link to {href:?} has no src")]
    MissingSrc { href: String },
}

/// The two caption lines sent to the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptionPair {
    pub line1: String,
    pub line2: String,
}

impl CaptionPair {
    /// Applies the one-line shorthand: a lone line becomes the second line and
    /// the template's default fills the first.
    ///
    /// # Errors
    ///
    /// Returns [`GenerateError::MissingCaption`] when a line is still missing
    /// or empty afterwards.
    pub fn normalize(
        record: &TemplateRecord,
        line1: &str,
        line2: Option<&str>,
    ) -> Result<Self, GenerateError> {
        let (line1, line2) = match line2 {
            Some(line2) => (Some(line1), line2),
            None => (record.default_line, line1),
        };

        match line1 {
            Some(line1) if !line1.is_empty() && !line2.is_empty() => Ok(Self {
                line1: line1.to_string(),
                line2: line2.to_string(),
            }),
            _ => Err(GenerateError::MissingCaption {
                generator_name: record.generator_name.to_string(),
            }),
        }
    }
}

/// Link to a rendered meme image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteImageLink(String);

impl RemoteImageLink {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for RemoteImageLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Serialize)]
struct CreateOrEditForm<'a> {
    #[serde(rename = "templateType")]
    template_type: &'a str,
    text0: &'a str,
    text1: &'a str,
    #[serde(rename = "templateID")]
    template_id: u32,
    #[serde(rename = "generatorName")]
    generator_name: &'a str,
}

impl<'a> CreateOrEditForm<'a> {
    fn new(record: &'a TemplateRecord, captions: &'a CaptionPair) -> Self {
        Self {
            template_type: TEMPLATE_TYPE,
            text0: &captions.line1,
            text1: &captions.line2,
            template_id: record.template_id,
            generator_name: record.generator_name,
        }
    }
}

/// Client settings for memegenerator.net style services.
#[derive(Debug, Clone)]
pub struct MemeClient {
    service_url: String,
    user_agent: String,
    timeout: Option<Duration>,
}

impl Default for MemeClient {
    fn default() -> Self {
        Self::new(DEFAULT_SERVICE_URL)
    }
}

impl MemeClient {
    pub fn new(service_url: impl Into<String>) -> Self {
        Self {
            service_url: service_url.into(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: None,
        }
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    /// Absolute URL of the create/edit endpoint.
    pub fn endpoint_url(&self) -> Result<Url, TransactionError> {
        Url::parse(&self.service_url)
            .and_then(|base| base.join(CREATE_OR_EDIT_PATH))
            .map_err(|error| TransactionError::Endpoint {
                url: self.service_url.clone(),
                message: error.to_string(),
            })
    }

    /// Captions `record` and returns the link to the rendered image.
    ///
    /// Posts the captions to the create/edit endpoint, follows the returned
    /// `Location` by hand, and reads the image inside the page's link back to
    /// that same location. Nothing is retried.
    ///
    /// # Errors
    ///
    /// [`GenerateError::MissingCaption`] when only one line is given and the
    /// template has no default first line; [`GenerateError::Transaction`] for
    /// any failed stage of the exchange.
    pub fn generate(
        &self,
        record: &TemplateRecord,
        line1: &str,
        line2: Option<&str>,
    ) -> Result<RemoteImageLink, GenerateError> {
        let captions = CaptionPair::normalize(record, line1, line2)?;
        let endpoint = self.endpoint_url()?;
        let client = self.build_client()?;

        tracing::debug!(
            %endpoint,
            generator = record.generator_name,
            template_id = record.template_id,
            "posting captions"
        );
        let response = client
            .post(endpoint.clone())
            .form(&CreateOrEditForm::new(record, &captions))
            .send()
            .map_err(TransactionError::Post)?;

        let status = response.status();
        let location = response
            .headers()
            .get(LOCATION)
            .and_then(|value| value.to_str().ok())
            .filter(|value| !value.is_empty())
            .map(str::to_string)
            .ok_or(TransactionError::MissingLocation {
                status: status.as_u16(),
            })?;
        drop(response);

        let redirect = endpoint
            .join(&location)
            .map_err(|error| TransactionError::InvalidLocation {
                location: location.clone(),
                message: error.to_string(),
            })?;

        tracing::debug!(%status, %location, %redirect, "following redirect");
        let body = client
            .get(redirect)
            .send()
            .map_err(TransactionError::Redirect)?
            .text()
            .map_err(TransactionError::Body)?;

        let link = extract_image_link(&body, &location)?;
        tracing::info!(link = link.as_str(), "generated meme");
        Ok(link)
    }

    fn build_client(&self) -> Result<Client, TransactionError> {
        let mut builder = Client::builder()
            .redirect(Policy::none())
            .user_agent(self.user_agent.as_str());
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }
        builder.build().map_err(TransactionError::Client)
    }
}

/// Finds the first `<a>` whose `href` is exactly `href` and returns the `src`
/// of the first image inside it.
pub fn extract_image_link(html: &str, href: &str) -> Result<RemoteImageLink, TransactionError> {
    let document = Html::parse_document(html);
    let anchors = selector("a[href]")?;
    let images = selector("img")?;

    let anchor: ElementRef<'_> = document
        .select(&anchors)
        .find(|anchor| anchor.value().attr("href") == Some(href))
        .ok_or_else(|| TransactionError::AnchorNotFound {
            href: href.to_string(),
        })?;

    let image = anchor
        .select(&images)
        .next()
        .ok_or_else(|| TransactionError::ImageNotFound {
            href: href.to_string(),
        })?;

    image
        .value()
        .attr("src")
        .map(|src| RemoteImageLink(src.to_string()))
        .ok_or_else(|| TransactionError::MissingSrc {
            href: href.to_string(),
        })
}

fn selector(css: &str) -> Result<Selector, TransactionError> {
    Selector::parse(css).map_err(|error| TransactionError::Selector {
        selector: css.to_string(),
        message: error.to_string(),
    })
}
