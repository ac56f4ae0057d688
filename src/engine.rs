//! Query executor for ewiz.
//!
//! [`EwizDB`] owns the connection settings and a transport; [`EwizQuery`]
//! accumulates filters for one table and runs fetch, count and update.
//! Every operation builds a URL, sends exactly one request (plus the Read
//! fan-out for fetch) and maps failures to typed errors. Nothing is retried.

use crate::ast::*;
use crate::decompiler::{Decompiler, attempt_request};
use crate::error::{EwizError, EwizResult};
use crate::parser;
use crate::schema::{Field, Model};
use crate::settings::Settings;
use crate::transport::{HttpRequest, HttpTransport, Transport};
use crate::transpiler::{ToWhere, compile_filter};
use crate::urlbuilder::{self, UrlBuilder};

const ORDER_BY_UNSUPPORTED: &str =
    "The 'ORDER BY' statement is not currently supported by the EnterpriseWizard REST interface";

const DELETE_UNSUPPORTED: &str = "Deleting EnterpriseWizard records is generally ill-advised. \
     Please contact your EnterpriseWizard administrator for more information";

/// A connection to one knowledge base.
#[derive(Debug, Clone)]
pub struct EwizDB<T: Transport = HttpTransport> {
    settings: Settings,
    transport: T,
}

impl EwizDB<HttpTransport> {
    /// Connect over HTTP(S) using `reqwest`.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// let settings = Settings::new("helpdesk.example.edu/ewws/", "helpdesk", "svc", "pw").port(443);
    /// let db = EwizDB::connect(settings)?;
    /// ```
    pub fn connect(settings: Settings) -> EwizResult<Self> {
        Self::with_transport(settings, HttpTransport::new()?)
    }
}

impl<T: Transport> EwizDB<T> {
    /// Use a custom transport. Settings are validated up front.
    pub fn with_transport(settings: Settings, transport: T) -> EwizResult<Self> {
        settings.validate()?;
        Ok(Self {
            settings,
            transport,
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Start a query against `model`'s table.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// let mut q = db.query(&ticket);
    /// q.add_filter("status", "in", false, ["Open", "On Hold"])?;
    /// for ticket in q.fetch(0, Some(20)).await? {
    ///     println!("{}", ticket["subject"]);
    /// }
    /// ```
    pub fn query<'m>(&self, model: &'m Model) -> EwizQuery<'_, 'm, T> {
        EwizQuery::new(self, model)
    }

    fn urls(&self) -> EwizResult<UrlBuilder<'_>> {
        UrlBuilder::new(&self.settings)
    }

    fn decompiler<'a>(&'a self, model: &'a Model) -> Decompiler<'a, T> {
        Decompiler::new(&self.transport, &self.settings, &model.table)
    }

    /// Read one ticket by identifier.
    pub async fn read(&self, model: &Model, id: &str) -> EwizResult<Ticket> {
        self.decompiler(model).read(id).await
    }

    /// Create one ticket. Returns the generated identifier when `return_id` is set.
    pub async fn insert(
        &self,
        model: &Model,
        record: &Record,
        return_id: bool,
    ) -> EwizResult<Option<String>> {
        let values = resolve_record(model, record)?;
        for (field, value) in &values {
            let empty = value.as_deref().is_none_or(str::is_empty);
            if empty && !field.nullable && !field.primary_key {
                return Err(EwizError::Integrity(field.name.clone()));
            }
        }

        let url = self.urls()?.insert(&model.table, &values);
        let response = self.transport.execute(HttpRequest::get(url)).await?;
        if !response.is_success() {
            return Err(EwizError::Insert {
                table: model.name.clone(),
                message: format!("HTTP {}: {}", response.status, response.body.trim()),
            });
        }

        if !return_id {
            return Ok(None);
        }
        parser::parse_created_id(&response.body)
            .map(Some)
            .ok_or_else(|| EwizError::protocol("create response carries no EWREST_id line"))
    }

    /// Upload `bytes` into the model's file field of ticket `id`.
    pub async fn attach(
        &self,
        model: &Model,
        id: &str,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> EwizResult<String> {
        let field = model
            .file_field()
            .ok_or_else(|| EwizError::unknown_field(&model.name, "<file field>"))?;
        let url = self.urls()?.attach(&model.table, id, &field.column, file_name);
        let response = attempt_request(&self.transport, HttpRequest::put(url, bytes)).await?;
        Ok(response.body)
    }
}

/// Resolve caller field names to model fields, keeping caller order.
fn resolve_record(model: &Model, record: &Record) -> EwizResult<Vec<(Field, Option<String>)>> {
    record
        .iter()
        .map(|(name, value)| Ok((model.resolve(name)?.into_owned(), value.clone())))
        .collect()
}

/// Filters, ordering and limits for one table.
pub struct EwizQuery<'db, 'm, T: Transport> {
    db: &'db EwizDB<T>,
    model: &'m Model,
    spec: QuerySpec,
}

impl<'db, 'm, T: Transport> EwizQuery<'db, 'm, T> {
    fn new(db: &'db EwizDB<T>, model: &'m Model) -> Self {
        Self {
            db,
            model,
            spec: QuerySpec::new(&model.table, model.pk_column()),
        }
    }

    /// The accumulated query.
    pub fn spec(&self) -> &QuerySpec {
        &self.spec
    }

    /// Add one conjunctive constraint.
    pub fn add_filter(
        &mut self,
        field: &str,
        lookup: &str,
        negated: bool,
        value: impl Into<FilterValue>,
    ) -> EwizResult<&mut Self> {
        let lookup = Lookup::resolve(lookup, negated)?;
        let resolved = self.model.resolve(field)?;
        let value = value.into();
        let filter = compile_filter(&resolved.column, lookup, negated, &value)?;

        if self.model.is_pk(field) {
            let target = match (&self.spec.target, lookup, negated, &value) {
                (Target::Unresolved, Lookup::Exact, false, FilterValue::Single(id)) => {
                    Target::Id(id.clone())
                }
                (Target::Id(current), Lookup::Exact, false, FilterValue::Single(id))
                    if current == id =>
                {
                    Target::Id(id.clone())
                }
                _ => Target::Ambiguous,
            };
            self.spec.target = target;
        }

        self.spec.filters.push(filter);
        Ok(self)
    }

    /// Builder-style [`add_filter`](Self::add_filter).
    pub fn filter(
        mut self,
        field: &str,
        lookup: &str,
        value: impl Into<FilterValue>,
    ) -> EwizResult<Self> {
        self.add_filter(field, lookup, false, value)?;
        Ok(self)
    }

    /// Builder-style negated filter.
    pub fn exclude(
        mut self,
        field: &str,
        lookup: &str,
        value: impl Into<FilterValue>,
    ) -> EwizResult<Self> {
        self.add_filter(field, lookup, true, value)?;
        Ok(self)
    }

    /// Only the default ascending order by primary key is accepted.
    ///
    /// The server's frontend re-sorts Select results by identifier, which
    /// makes any other ordering wrong as soon as a limit applies.
    pub fn order_by(&mut self, ordering: Ordering) -> EwizResult<&mut Self> {
        match ordering {
            Ordering::Default(true) => {
                let term = OrderTerm {
                    column: self.model.pk_column().to_string(),
                    order: SortOrder::Asc,
                };
                if !self.spec.ordering.contains(&term) {
                    self.spec.ordering.push(term);
                }
                Ok(self)
            }
            Ordering::Default(false) | Ordering::Fields(_) => Err(
                EwizError::UnsupportedOperation(ORDER_BY_UNSUPPORTED.to_string()),
            ),
        }
    }

    fn select_url(&self, limits: Limits) -> EwizResult<String> {
        let mut spec = self.spec.clone();
        spec.limits = limits;
        Ok(self.db.urls()?.select(&spec))
    }

    /// Compiled query and its Select URL, password redacted. Sends nothing.
    pub fn explain(&self, low: u64, high: Option<u64>) -> EwizResult<String> {
        let mut spec = self.spec.clone();
        spec.limits = Limits::window(low, high);
        let url = self.db.urls()?.select(&spec);
        Ok(format!(
            "table: {}\nwhere: {}\nurl: {}",
            spec.table,
            spec.to_where(),
            urlbuilder::redact(&url)
        ))
    }

    /// Tickets in the slice `[low, high)`; `high = None` means everything from `low`.
    /// An empty or inverted range requests `LIMIT 0 OFFSET 0`.
    ///
    /// Each call issues fresh requests.
    pub async fn fetch(&self, low: u64, high: Option<u64>) -> EwizResult<std::vec::IntoIter<Ticket>> {
        let url = self.select_url(Limits::window(low, high))?;
        let tickets = self.db.decompiler(self.model).decompile(&url).await?;
        Ok(tickets.into_iter())
    }

    /// Number of matching tickets, optionally capped by `limit`. A zero limit is ignored.
    pub async fn count(&self, limit: Option<u64>) -> EwizResult<u64> {
        let mut limits = self.spec.limits;
        if let Some(limit) = limit.filter(|l| *l > 0) {
            limits.limit = limit;
        }
        let url = self.select_url(limits)?;
        self.db.decompiler(self.model).count(&url).await
    }

    /// Update the single ticket selected by a primary-key equality filter.
    pub async fn update(&self, record: &Record) -> EwizResult<u64> {
        let id = match &self.spec.target {
            Target::Id(id) => id,
            Target::Unresolved => {
                return Err(EwizError::CompilerAssumption(
                    "update needs an equality filter on the primary key".to_string(),
                ));
            }
            Target::Ambiguous => {
                return Err(EwizError::CompilerAssumption(
                    "update target is ambiguous: primary key filters do not select one ticket"
                        .to_string(),
                ));
            }
        };

        let values = resolve_record(self.model, record)?;
        let url = self.db.urls()?.update(&self.model.table, id, &values);
        let response = self.db.transport.execute(HttpRequest::get(url)).await?;
        if !response.is_success() {
            return Err(EwizError::Update {
                table: self.model.name.clone(),
                message: format!("HTTP {}: {}", response.status, response.body.trim()),
            });
        }
        Ok(1)
    }

    /// Always fails: remote tickets are never deleted through this interface.
    pub fn delete(&self) -> EwizResult<u64> {
        Err(EwizError::UnsupportedOperation(DELETE_UNSUPPORTED.to_string()))
    }
}
