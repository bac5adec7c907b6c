#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::io::Cursor;
use std::sync::{Arc, Mutex};

use als_spot_toolbox::credentials::Credentials;
use als_spot_toolbox::endpoints::Endpoints;
use als_spot_toolbox::error::SpotError;
use als_spot_toolbox::session::Session;
use als_spot_toolbox::transport::{PortalResponse, PortalTransport};

pub const BASE: &str = "http://spot.test/als";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub method: &'static str,
    pub url: String,
    pub params: Vec<(String, String)>,
}

impl Call {
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Clone)]
enum Reply {
    Respond(u16, Vec<u8>),
    Fail,
}

/// In-memory portal. Replies are keyed by method and full URL; a route with
/// several replies hands them out in order and then repeats the last one.
#[derive(Clone, Default)]
pub struct MockPortal {
    routes: Arc<Mutex<HashMap<(&'static str, String), VecDeque<Reply>>>>,
    calls: Arc<Mutex<Vec<Call>>>,
}

impl MockPortal {
    pub fn new() -> Self {
        let portal = Self::default();
        portal.on_get("/auth", 200, r#"{"auth": true}"#);
        portal.on_post("/auth", 200, r#"{"auth": true}"#);
        portal
    }

    pub fn on_get(&self, path: &str, status: u16, body: impl Into<Vec<u8>>) {
        self.set("GET", path, vec![Reply::Respond(status, body.into())]);
    }

    pub fn on_get_seq(&self, path: &str, replies: &[(u16, &str)]) {
        let replies = replies
            .iter()
            .map(|(status, body)| Reply::Respond(*status, body.as_bytes().to_vec()))
            .collect();
        self.set("GET", path, replies);
    }

    pub fn on_post(&self, path: &str, status: u16, body: impl Into<Vec<u8>>) {
        self.set("POST", path, vec![Reply::Respond(status, body.into())]);
    }

    pub fn fail_get(&self, path: &str) {
        self.set("GET", path, vec![Reply::Fail]);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_to(&self, path: &str) -> Vec<Call> {
        let url = format!("{BASE}{path}");
        self.calls()
            .into_iter()
            .filter(|call| call.url == url)
            .collect()
    }

    fn set(&self, method: &'static str, path: &str, replies: Vec<Reply>) {
        let mut routes = self.routes.lock().unwrap();
        routes.insert((method, format!("{BASE}{path}")), replies.into());
    }

    fn reply(
        &self,
        method: &'static str,
        url: &str,
        params: &[(&str, &str)],
    ) -> Result<PortalResponse, SpotError> {
        self.calls.lock().unwrap().push(Call {
            method,
            url: url.to_string(),
            params: params
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        });

        let mut routes = self.routes.lock().unwrap();
        let reply = match routes.get_mut(&(method, url.to_string())) {
            Some(queue) if queue.len() > 1 => queue.pop_front(),
            Some(queue) => queue.front().cloned(),
            None => None,
        };
        match reply {
            Some(Reply::Respond(status, body)) => {
                Ok(PortalResponse::new(status, Cursor::new(body)))
            }
            Some(Reply::Fail) => Err(SpotError::Network {
                url: url.to_string(),
                message: "connection refused".to_string(),
            }),
            None => Ok(PortalResponse::new(404, Cursor::new(b"no route".to_vec()))),
        }
    }
}

impl PortalTransport for MockPortal {
    fn get(&self, url: &str, query: &[(&str, &str)]) -> Result<PortalResponse, SpotError> {
        self.reply("GET", url, query)
    }

    fn post_form(&self, url: &str, form: &[(&str, &str)]) -> Result<PortalResponse, SpotError> {
        self.reply("POST", url, form)
    }
}

pub fn endpoints() -> Endpoints {
    Endpoints::new(BASE, "als/bl832")
}

/// A session logged in as `me` over a fresh portal.
pub fn logged_in() -> (Session<MockPortal>, MockPortal) {
    let portal = MockPortal::new();
    let session = Session::login(portal.clone(), endpoints(), &Credentials::new("me", "pw"))
        .expect("login against mock portal");
    (session, portal)
}
