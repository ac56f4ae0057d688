//! Response decompiler.
//!
//! A Select answers with a count and ticket identifiers only, so fetching
//! records is two-phase: one Select, then one Read per identifier. The reads
//! fan out over at most `num_connections` in-flight requests and results are
//! returned in identifier order.

use futures::stream::{self, StreamExt};

use crate::ast::{SelectResponse, Ticket};
use crate::error::{EwizError, EwizResult};
use crate::parser;
use crate::settings::Settings;
use crate::transport::{HttpRequest, HttpResponse, Transport};
use crate::urlbuilder::{self, UrlBuilder};

/// Marker the server puts in error pages for rejected `where` clauses.
const QUERY_SYNTAX_FAULT: &str = "Error executing query, please consult logs";

/// Send a request and map non-2xx statuses to `EwizError::Query`.
pub async fn attempt_request<T: Transport>(
    transport: &T,
    request: HttpRequest,
) -> EwizResult<HttpResponse> {
    let url = request.url.clone();
    let response = transport.execute(request).await?;
    if response.is_success() {
        return Ok(response);
    }

    tracing::warn!(status = response.status, url = %urlbuilder::redact(&url), "request rejected");

    let mut message = format!("HTTP {}: {}", response.status, response.body.trim());
    if message.contains(QUERY_SYNTAX_FAULT) {
        message.push_str(&format!(
            ".\n\tThe query submitted most likely contains invalid or illegal syntax:\n\t {}",
            urlbuilder::query_fragment(&url)
        ));
    }
    Err(EwizError::Query(message))
}

/// Parses responses for one table.
pub struct Decompiler<'a, T: Transport> {
    transport: &'a T,
    settings: &'a Settings,
    table: &'a str,
}

impl<'a, T: Transport> Decompiler<'a, T> {
    pub fn new(transport: &'a T, settings: &'a Settings, table: &'a str) -> Self {
        Self {
            transport,
            settings,
            table,
        }
    }

    /// Fetch every ticket a Select URL matches. Any failed read fails the whole call.
    pub async fn decompile(&self, url: &str) -> EwizResult<Vec<Ticket>> {
        let selection = self.request_multiple(url, false).await?;
        self.read_all(&selection.ids).await
    }

    /// Total count of a Select URL, without reading any ticket.
    pub async fn count(&self, url: &str) -> EwizResult<u64> {
        Ok(self.request_multiple(url, true).await?.count)
    }

    /// Issue the Select. With `count_only` the identifiers are not parsed.
    pub async fn request_multiple(&self, url: &str, count_only: bool) -> EwizResult<SelectResponse> {
        let response = attempt_request(self.transport, HttpRequest::get(url)).await?;
        if count_only {
            let count = parser::parse_count(&response.body)?;
            return Ok(SelectResponse {
                count,
                ids: Vec::new(),
            });
        }
        parser::parse_select(&response.body)
    }

    /// Read one ticket.
    pub async fn read(&self, id: &str) -> EwizResult<Ticket> {
        let url = UrlBuilder::new(self.settings)?.read(self.table, id);
        self.decompile_single(&url).await
    }

    async fn decompile_single(&self, url: &str) -> EwizResult<Ticket> {
        let response = attempt_request(self.transport, HttpRequest::get(url)).await?;
        parser::parse_record(&response.body)
    }

    /// Read tickets in identifier order.
    pub async fn read_all(&self, ids: &[String]) -> EwizResult<Vec<Ticket>> {
        let builder = UrlBuilder::new(self.settings)?;
        let urls: Vec<String> = ids.iter().map(|id| builder.read(self.table, id)).collect();

        match self.settings.fan_out() {
            Some(width) => {
                tracing::debug!(table = self.table, reads = urls.len(), width, "fanning out reads");
                // Every read runs to completion; the first failure in identifier order wins.
                let results: Vec<EwizResult<Ticket>> = stream::iter(urls.iter())
                    .map(|url| self.decompile_single(url))
                    .buffered(width)
                    .collect()
                    .await;
                results.into_iter().collect()
            }
            None => {
                tracing::debug!(table = self.table, reads = urls.len(), "reading sequentially");
                let mut tickets = Vec::with_capacity(urls.len());
                for url in &urls {
                    tickets.push(self.decompile_single(url).await?);
                }
                Ok(tickets)
            }
        }
    }
}
