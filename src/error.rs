use std::borrow::Cow;
use std::error::Error as StdError;
use std::fmt;

use reqwest::{Method, StatusCode};

/// Classification of every failure surfaced by this crate.
#[non_exhaustive]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Kind {
    /// Missing or ambiguous client configuration. Fatal to the client instance.
    Configuration,
    /// Malformed caller input, detected before any network call.
    Validation,
    /// The exchange could not be reached.
    Transport,
    /// The exchange received the request and refused it.
    Rejection,
    /// The exchange answered with something this crate cannot parse.
    MalformedResponse,
    /// Signing or other local failures that are none of the above.
    Internal,
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Kind::Configuration => "configuration error",
            Kind::Validation => "validation error",
            Kind::Transport => "transport error",
            Kind::Rejection => "exchange rejection",
            Kind::MalformedResponse => "malformed response",
            Kind::Internal => "internal error",
        };
        f.write_str(name)
    }
}

#[derive(Debug)]
pub struct Error {
    kind: Kind,
    context: Option<Cow<'static, str>>,
    source: Option<Box<dyn StdError + Send + Sync + 'static>>,
}

impl Error {
    pub fn with_source<S: StdError + Send + Sync + 'static>(kind: Kind, source: S) -> Self {
        Self {
            kind,
            context: None,
            source: Some(Box::new(source)),
        }
    }

    #[must_use]
    pub fn kind(&self) -> Kind {
        self.kind
    }

    /// Operation context attached by [`Error::context`], if any.
    #[must_use]
    pub fn operation(&self) -> Option<&str> {
        self.context.as_deref()
    }

    #[must_use]
    pub fn inner(&self) -> Option<&(dyn StdError + Send + Sync + 'static)> {
        self.source.as_deref()
    }

    pub fn downcast_ref<E: StdError + 'static>(&self) -> Option<&E> {
        let e = self.source.as_deref()?;
        e.downcast_ref::<E>()
    }

    /// Wraps this error with the operation that produced it. The kind is preserved, so
    /// callers can still branch on it after wrapping.
    #[must_use]
    pub fn context<C: Into<Cow<'static, str>>>(mut self, context: C) -> Self {
        let context = context.into();
        self.context = Some(match self.context.take() {
            Some(inner) => Cow::Owned(format!("{context}: {inner}")),
            None => context,
        });
        self
    }

    pub fn validation<S: Into<String>>(reason: S) -> Self {
        Validation {
            reason: reason.into(),
        }
        .into()
    }

    pub fn configuration<S: Into<String>>(reason: S) -> Self {
        Configuration {
            reason: reason.into(),
        }
        .into()
    }

    pub fn malformed<S: Into<String>>(reason: S) -> Self {
        MalformedResponse {
            reason: reason.into(),
        }
        .into()
    }

    pub fn rejection<S: Into<String>>(
        status_code: StatusCode,
        method: Method,
        path: String,
        message: S,
    ) -> Self {
        Rejection {
            status_code,
            method,
            path,
            message: message.into(),
        }
        .into()
    }

    pub fn missing_contract_config(chain_id: u64, neg_risk: bool) -> Self {
        Self::configuration(format!(
            "missing exchange contract config for chain id {chain_id} with neg_risk = {neg_risk}"
        ))
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(context) = &self.context {
            write!(f, "{context}: ")?;
        }
        match &self.source {
            Some(src) => write!(f, "{}: {src}", self.kind),
            None => write!(f, "{}", self.kind),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_deref()
            .map(|e| e as &(dyn StdError + 'static))
    }
}

#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Validation {
    pub reason: String,
}

impl fmt::Display for Validation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.reason)
    }
}

impl StdError for Validation {}

impl From<Validation> for Error {
    fn from(e: Validation) -> Self {
        Error::with_source(Kind::Validation, e)
    }
}

#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Configuration {
    pub reason: String,
}

impl fmt::Display for Configuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.reason)
    }
}

impl StdError for Configuration {}

impl From<Configuration> for Error {
    fn from(e: Configuration) -> Self {
        Error::with_source(Kind::Configuration, e)
    }
}

#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MalformedResponse {
    pub reason: String,
}

impl fmt::Display for MalformedResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.reason)
    }
}

impl StdError for MalformedResponse {}

impl From<MalformedResponse> for Error {
    fn from(e: MalformedResponse) -> Self {
        Error::with_source(Kind::MalformedResponse, e)
    }
}

/// Non-success HTTP answer from the exchange.
#[non_exhaustive]
#[derive(Debug, Clone)]
pub struct Rejection {
    pub status_code: StatusCode,
    pub method: Method,
    pub path: String,
    pub message: String,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} returned {}: {}",
            self.method, self.path, self.status_code, self.message
        )
    }
}

impl StdError for Rejection {}

impl From<Rejection> for Error {
    fn from(e: Rejection) -> Self {
        Error::with_source(Kind::Rejection, e)
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        let kind = if e.is_decode() {
            Kind::MalformedResponse
        } else {
            Kind::Transport
        };
        Error::with_source(kind, e)
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::with_source(Kind::MalformedResponse, e)
    }
}

#[cfg(feature = "tracing")]
impl From<serde_path_to_error::Error<serde_json::Error>> for Error {
    fn from(e: serde_path_to_error::Error<serde_json::Error>) -> Self {
        Error::with_source(Kind::MalformedResponse, e)
    }
}

impl From<url::ParseError> for Error {
    fn from(e: url::ParseError) -> Self {
        Error::with_source(Kind::Configuration, e)
    }
}

impl From<alloy::signers::Error> for Error {
    fn from(e: alloy::signers::Error) -> Self {
        Error::with_source(Kind::Internal, e)
    }
}

impl From<reqwest::header::InvalidHeaderValue> for Error {
    fn from(e: reqwest::header::InvalidHeaderValue) -> Self {
        Error::with_source(Kind::Internal, e)
    }
}
