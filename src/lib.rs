//! # ewiz: EnterpriseWizard REST query compiler
//!
//! ewiz compiles record queries into the EnterpriseWizard REST dialect,
//! sends them over HTTP and decompiles the `EWREST_key='value';` line
//! protocol back into tickets.
//!
//! ## Quick Example
//!
//! ```rust,ignore
//! use ewiz::prelude::*;
//!
//! let db = EwizDB::connect(Settings::new("helpdesk.example.edu/ewws/", "helpdesk", "svc", "pw"))?;
//! let tickets = Model::adhoc("tickets");
//!
//! let open = db
//!     .query(&tickets)
//!     .filter("status", "exact", "Open")?
//!     .exclude("priority", "gt", "3")?;
//!
//! println!("{} open tickets", open.count(None).await?);
//! for ticket in open.fetch(0, Some(10)).await? {
//!     println!("{:?}", ticket);
//! }
//! ```
//!
//! ## Endpoints
//!
//! | Endpoint   | Method | Returns                         |
//! |------------|--------|---------------------------------|
//! | `EWSelect` | GET    | count + ticket identifiers      |
//! | `EWRead`   | GET    | every field of one ticket       |
//! | `EWCreate` | GET    | the generated identifier        |
//! | `EWUpdate` | GET    | nothing                         |
//! | `EWAttach` | PUT    | upload acknowledgement          |

pub mod ast;
pub mod decompiler;
pub mod engine;
pub mod error;
pub mod parser;
pub mod schema;
pub mod settings;
pub mod transport;
pub mod transpiler;
pub mod urlbuilder;

pub mod prelude {
    pub use crate::ast::*;
    pub use crate::engine::{EwizDB, EwizQuery};
    pub use crate::error::*;
    pub use crate::schema::{Field, Model};
    pub use crate::settings::{Config, Settings};
    pub use crate::transport::{HttpRequest, HttpResponse, HttpTransport, Method, Transport};
    pub use crate::transpiler::ToWhere;
    pub use crate::urlbuilder::UrlBuilder;
}

/// Parse one `EWRead` response body into a ticket.
///
/// # Example
///
/// ```
/// let ticket = ewiz::parse_record("EWREST_status='Open';\nEWREST_id='42';").unwrap();
/// assert_eq!(ticket["status"], "Open");
/// ```
pub fn parse_record(body: &str) -> Result<ast::Ticket, error::EwizError> {
    parser::parse_record(body)
}
