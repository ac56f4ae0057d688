//! Scripted transport shared by the integration tests.

#![allow(dead_code)]

use std::sync::Mutex;
use std::time::Duration;

use ewiz::prelude::*;
use ewiz::urlbuilder::unescape;

enum Reply {
    Respond(HttpResponse),
    Refuse,
}

struct Route {
    matches: Box<dyn Fn(&str) -> bool + Send + Sync>,
    reply: Reply,
    delay: Duration,
}

/// Answers requests from a list of routes matched against the unescaped URL.
#[derive(Default)]
pub struct ScriptedTransport {
    routes: Vec<Route>,
    requests: Mutex<Vec<HttpRequest>>,
    completed: Mutex<Vec<String>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn route(
        mut self,
        matches: impl Fn(&str) -> bool + Send + Sync + 'static,
        reply: Reply,
        delay_ms: u64,
    ) -> Self {
        self.routes.push(Route {
            matches: Box::new(matches),
            reply,
            delay: Duration::from_millis(delay_ms),
        });
        self
    }

    pub fn on_select(self, body: &str) -> Self {
        let response = HttpResponse::ok(body);
        self.route(|url| url.contains("/EWSelect?"), Reply::Respond(response), 0)
    }

    pub fn on_read(self, id: &str, body: &str, delay_ms: u64) -> Self {
        self.on_read_status(id, 200, body, delay_ms)
    }

    pub fn on_read_status(self, id: &str, status: u16, body: &str, delay_ms: u64) -> Self {
        let suffix = format!("&id={}", id);
        self.route(
            move |url| url.contains("/EWRead?") && url.ends_with(&suffix),
            Reply::Respond(HttpResponse::new(status, body)),
            delay_ms,
        )
    }

    pub fn on_endpoint(self, endpoint: &'static str, status: u16, body: &str) -> Self {
        let marker = format!("/{}?", endpoint);
        self.route(
            move |url| url.contains(&marker),
            Reply::Respond(HttpResponse::new(status, body)),
            0,
        )
    }

    pub fn refuse_all(self) -> Self {
        self.route(|_| true, Reply::Refuse, 0)
    }

    /// Every request received, in arrival order.
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Unescaped URLs of every request.
    pub fn urls(&self) -> Vec<String> {
        self.requests().iter().map(|r| unescape(&r.url)).collect()
    }

    pub fn count_endpoint(&self, endpoint: &str) -> usize {
        let marker = format!("/{}?", endpoint);
        self.urls().iter().filter(|u| u.contains(&marker)).count()
    }

    /// Unescaped URLs in the order their responses were produced.
    pub fn completion_order(&self) -> Vec<String> {
        self.completed.lock().unwrap().clone()
    }
}

impl Transport for ScriptedTransport {
    async fn execute(&self, request: HttpRequest) -> EwizResult<HttpResponse> {
        let url = unescape(&request.url);
        self.requests.lock().unwrap().push(request);

        let Some(route) = self.routes.iter().find(|r| (r.matches)(&url)) else {
            return Ok(HttpResponse::new(404, format!("no route for {}", url)));
        };

        if !route.delay.is_zero() {
            tokio::time::sleep(route.delay).await;
        }
        self.completed.lock().unwrap().push(url);

        match &route.reply {
            Reply::Respond(response) => Ok(response.clone()),
            Reply::Refuse => Err(EwizError::Connectivity("connection refused".into())),
        }
    }
}

pub fn settings() -> Settings {
    Settings::new("helpdesk.example.edu/ewws/", "helpdesk", "svc", "pw")
}

pub fn db(transport: ScriptedTransport) -> EwizDB<ScriptedTransport> {
    EwizDB::with_transport(settings(), transport).unwrap()
}

pub fn db_with_pool(transport: ScriptedTransport, width: usize) -> EwizDB<ScriptedTransport> {
    EwizDB::with_transport(settings().num_connections(width), transport).unwrap()
}

pub fn ticket_body(id: &str, status: &str) -> String {
    format!("EWREST_id='{}';\nEWREST_status='{}';\n", id, status)
}
