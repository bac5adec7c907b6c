use std::io::Read;
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use serde::de::DeserializeOwned;

use crate::error::SpotError;

pub struct PortalResponse {
    pub status: u16,
    pub body: Box<dyn Read>,
}

impl PortalResponse {
    pub fn new(status: u16, body: impl Read + 'static) -> Self {
        Self {
            status,
            body: Box::new(body),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn check_status(mut self, url: &str) -> Result<Self, SpotError> {
        if self.is_success() {
            return Ok(self);
        }
        let mut message = String::new();
        if self.body.read_to_string(&mut message).is_err() || message.trim().is_empty() {
            message = "SPOT request failed".to_string();
        }
        Err(SpotError::RemoteStatus {
            url: url.to_string(),
            status: self.status,
            message: message.trim().to_string(),
        })
    }

    pub fn json<T: DeserializeOwned>(self, url: &str) -> Result<T, SpotError> {
        let mut response = self.check_status(url)?;
        let mut text = String::new();
        response
            .body
            .read_to_string(&mut text)
            .map_err(|err| SpotError::Network {
                url: url.to_string(),
                message: err.to_string(),
            })?;
        serde_json::from_str(&text).map_err(|err| SpotError::RemoteDecode {
            url: url.to_string(),
            message: err.to_string(),
        })
    }
}

// Cookies set by a response must be replayed on later requests.
pub trait PortalTransport {
    fn get(&self, url: &str, query: &[(&str, &str)]) -> Result<PortalResponse, SpotError>;
    fn post_form(&self, url: &str, form: &[(&str, &str)]) -> Result<PortalResponse, SpotError>;
}

#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(timeout: Option<Duration>) -> Result<Self, SpotError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("als-spot/{}", env!("CARGO_PKG_VERSION")))
                .unwrap_or(HeaderValue::from_static("als-spot")),
        );

        let client = Client::builder()
            .default_headers(headers)
            .cookie_store(true)
            .timeout(timeout)
            .build()
            .map_err(|err| SpotError::Network {
                url: String::new(),
                message: err.to_string(),
            })?;

        Ok(Self { client })
    }
}

impl PortalTransport for HttpTransport {
    fn get(&self, url: &str, query: &[(&str, &str)]) -> Result<PortalResponse, SpotError> {
        let response = self
            .client
            .get(url)
            .query(query)
            .send()
            .map_err(|err| network_error(url, &err))?;
        Ok(PortalResponse::new(response.status().as_u16(), response))
    }

    fn post_form(&self, url: &str, form: &[(&str, &str)]) -> Result<PortalResponse, SpotError> {
        let response = self
            .client
            .post(url)
            .form(form)
            .send()
            .map_err(|err| network_error(url, &err))?;
        Ok(PortalResponse::new(response.status().as_u16(), response))
    }
}

fn network_error(url: &str, err: &reqwest::Error) -> SpotError {
    SpotError::Network {
        url: url.to_string(),
        message: err.to_string(),
    }
}
