//! ewiz: EnterpriseWizard REST client
//!
//! # Usage
//!
//! ```bash
//! # Tickets 0..20 that are open and not assigned to "ak"
//! ewiz select tickets -w status=Open -w '!assignee=ak' --limit 20
//!
//! # Show the Select URL only
//! ewiz select tickets -w status__in=Open,Pending --dry-run
//!
//! # Create, update, attach
//! ewiz create tickets subject='VPN down' status=Open
//! ewiz update tickets 311 status=Closed
//! ewiz attach tickets 311 ./screenshot.png
//! ```

use std::collections::BTreeSet;
use std::path::PathBuf;

use anyhow::{Context, anyhow};
use clap::{Parser, Subcommand, ValueEnum};
use colored::*;
use ewiz::parser::{parse_assignment, parse_filter};
use ewiz::prelude::*;
use ewiz::schema::DEFAULT_PK;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "ewiz")]
#[command(version)]
#[command(about = "EnterpriseWizard REST client", long_about = None)]
#[command(after_help = "EXAMPLES:
    ewiz select tickets -w status=Open -w '!priority__gt=3' --limit 20
    ewiz select tickets -w subject__icontains=vpn --count
    ewiz read tickets 311
    ewiz update tickets 311 status=Closed")]
struct Cli {
    /// Config file (default: ./ewiz.toml, then the user config dir)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Host and path prefix, e.g. helpdesk.example.edu/ewws/
    #[arg(long, env = "EWIZ_HOST", global = true)]
    host: Option<String>,

    /// Port; 443 selects https
    #[arg(long, env = "EWIZ_PORT", global = true)]
    port: Option<u16>,

    /// Knowledge base name
    #[arg(long, env = "EWIZ_KB", global = true)]
    knowledge_base: Option<String>,

    #[arg(long, env = "EWIZ_LOGIN", global = true)]
    login: Option<String>,

    #[arg(long, env = "EWIZ_PASSWORD", hide_env_values = true, global = true)]
    password: Option<String>,

    /// Concurrent reads when fetching tickets
    #[arg(long, env = "EWIZ_CONNECTIONS", global = true)]
    connections: Option<usize>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table", global = true)]
    format: OutputFormat,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch or count tickets matching filters
    Select {
        table: String,

        /// Filter as [!]field[__lookup]=value; lists are comma separated
        #[arg(short = 'w', long = "where")]
        filters: Vec<String>,

        #[arg(long, default_value_t = 0)]
        offset: u64,

        #[arg(long)]
        limit: Option<u64>,

        /// Only print the number of matches
        #[arg(long)]
        count: bool,

        /// Don't send anything, show the compiled query
        #[arg(short, long)]
        dry_run: bool,
    },
    /// Read one ticket
    Read { table: String, id: String },
    /// Create a ticket from field=value pairs
    Create {
        table: String,
        assignments: Vec<String>,
    },
    /// Update a ticket from field=value pairs
    Update {
        table: String,
        id: String,
        assignments: Vec<String>,
    },
    /// Upload a file into a ticket's file field
    Attach {
        table: String,
        id: String,
        path: PathBuf,

        /// File name sent to the server (default: the path's file name)
        #[arg(long)]
        name: Option<String>,
    },
    /// Show the supported filter lookups
    Lookups,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "ewiz=debug" } else { "ewiz=warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(&cli).await {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

async fn run(cli: &Cli) -> anyhow::Result<()> {
    if let Commands::Lookups = cli.command {
        show_lookups();
        return Ok(());
    }

    let config = load_config(cli)?;
    let db = EwizDB::connect(config.settings.clone())?;

    match &cli.command {
        Commands::Select {
            table,
            filters,
            offset,
            limit,
            count,
            dry_run,
        } => {
            let model = config.model(table);
            let mut query = db.query(&model);
            for raw in filters {
                let expr = parse_filter(raw)?;
                let lookup = Lookup::resolve(&expr.lookup, expr.negated)?;
                let value = filter_value(lookup, &expr.value);
                query.add_filter(&expr.field, &expr.lookup, expr.negated, value)?;
            }
            let high = slice_end(*offset, *limit);

            if *dry_run {
                println!("{}", "Compiled query:".green().bold());
                println!("{}", query.explain(*offset, high)?.white());
                return Ok(());
            }

            if *count {
                let n = query.count(*limit).await?;
                println!("{}", n.to_string().cyan());
                return Ok(());
            }

            let tickets: Vec<Ticket> = query.fetch(*offset, high).await?.collect();
            format_output(&tickets, &cli.format);
        }
        Commands::Read { table, id } => {
            let model = config.model(table);
            let ticket = db.read(&model, id).await?;
            format_output(&[ticket], &cli.format);
        }
        Commands::Create { table, assignments } => {
            let model = config.model(table);
            let record = parse_record(assignments)?;
            match db.insert(&model, &record, true).await? {
                Some(id) => println!("{} created ticket {}", "✓".green(), id.cyan()),
                None => println!("{} created", "✓".green()),
            }
        }
        Commands::Update {
            table,
            id,
            assignments,
        } => {
            let model = config.model(table);
            let record = parse_record(assignments)?;
            let pk = model.pk().map(|f| f.name.clone()).unwrap_or_else(|| DEFAULT_PK.to_string());
            let updated = db.query(&model).filter(&pk, "exact", id.as_str())?.update(&record).await?;
            println!("{} {} ticket(s) updated", "✓".green(), updated);
        }
        Commands::Attach {
            table,
            id,
            path,
            name,
        } => {
            let model = config.model(table);
            let bytes = tokio::fs::read(path)
                .await
                .with_context(|| format!("failed to read {}", path.display()))?;
            let file_name = match name {
                Some(name) => name.clone(),
                None => path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .ok_or_else(|| anyhow!("{} has no file name", path.display()))?,
            };
            let reply = db.attach(&model, id, &file_name, bytes).await?;
            println!("{} attached {} {}", "✓".green(), file_name.cyan(), reply.trim().dimmed());
        }
        Commands::Lookups => unreachable!(), // Handled above
    }

    Ok(())
}

/// Config file values overridden by flags and environment variables.
fn load_config(cli: &Cli) -> anyhow::Result<Config> {
    let mut config = match Config::locate(cli.config.as_deref()) {
        Some(path) => {
            if cli.verbose {
                eprintln!("{} {}", "Config:".dimmed(), path.display());
            }
            Config::load(&path).with_context(|| format!("failed to load {}", path.display()))?
        }
        None => {
            let host = cli.host.clone().ok_or_else(|| {
                anyhow!("no ewiz.toml found; pass --host/--knowledge-base/--login or set EWIZ_HOST")
            })?;
            Config {
                settings: Settings::new(
                    host,
                    cli.knowledge_base.clone().unwrap_or_default(),
                    cli.login.clone().unwrap_or_default(),
                    cli.password.clone().unwrap_or_default(),
                ),
                models: Default::default(),
            }
        }
    };

    let s = &mut config.settings;
    if let Some(host) = &cli.host {
        s.host = host.clone();
    }
    if let Some(port) = cli.port {
        s.port = port;
    }
    if let Some(kb) = &cli.knowledge_base {
        s.knowledge_base = kb.clone();
    }
    if let Some(login) = &cli.login {
        s.login = login.clone();
    }
    if let Some(password) = &cli.password {
        s.password = password.clone();
    }
    if let Some(n) = cli.connections {
        s.num_connections = Some(n);
    }
    Ok(config)
}

/// Exclusive end of `--offset`/`--limit`, clamped instead of overflowing.
fn slice_end(offset: u64, limit: Option<u64>) -> Option<u64> {
    limit.map(|l| offset.saturating_add(l))
}

fn filter_value(lookup: Lookup, raw: &str) -> FilterValue {
    if lookup == Lookup::IsNull {
        FilterValue::Empty
    } else if lookup.is_multi() {
        FilterValue::List(raw.split(',').map(|v| v.trim().to_string()).collect())
    } else {
        FilterValue::Single(raw.to_string())
    }
}

fn parse_record(assignments: &[String]) -> anyhow::Result<Record> {
    assignments
        .iter()
        .map(|a| parse_assignment(a).map_err(Into::into))
        .collect()
}

fn format_output(tickets: &[Ticket], format: &OutputFormat) {
    if tickets.is_empty() {
        println!("{}", "(no results)".dimmed());
        return;
    }

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(tickets).unwrap_or_default());
        }
        OutputFormat::Table => {
            let columns: Vec<&String> = tickets
                .iter()
                .flat_map(|t| t.keys())
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect();

            let widths: Vec<usize> = columns
                .iter()
                .map(|c| {
                    tickets
                        .iter()
                        .filter_map(|t| t.get(*c))
                        .map(|v| v.chars().count())
                        .max()
                        .unwrap_or(0)
                        .max(c.len())
                })
                .collect();

            let header: Vec<String> = columns
                .iter()
                .zip(&widths)
                .map(|(c, w)| format!("{:width$}", c, width = *w))
                .collect();
            println!("{}", header.join(" │ ").white().bold());

            let sep: Vec<String> = widths.iter().map(|w| "─".repeat(*w)).collect();
            println!("{}", sep.join("─┼─").dimmed());

            for ticket in tickets {
                let cells: Vec<String> = columns
                    .iter()
                    .zip(&widths)
                    .map(|(c, w)| {
                        let val = ticket.get(*c).map(String::as_str).unwrap_or("");
                        format!("{:width$}", val, width = *w)
                    })
                    .collect();
                println!("{}", cells.join(" │ "));
            }

            println!();
            println!("{} ticket(s) returned", tickets.len().to_string().cyan());
        }
    }
}

fn show_lookups() {
    println!("{}", "ewiz filter lookups".cyan().bold());
    println!();

    let lookups = [
        ("exact / iexact", "= 'v'", "!= 'v'"),
        ("contains / icontains", "LIKE '%v%'", "NOT LIKE '%v%'"),
        ("gt", "> 'v'", "<= 'v'"),
        ("gte", ">= 'v'", "< 'v'"),
        ("lt", "< 'v'", ">= 'v'"),
        ("lte", "<= 'v'", "> 'v'"),
        ("startswith / istartswith", "LIKE 'v%'", "NOT LIKE 'v%'"),
        ("endswith / iendswith", "LIKE '%v'", "NOT LIKE '%v'"),
        ("in", "IN ('a', 'b')", "NOT IN ('a', 'b')"),
        ("range / year", "BETWEEN 'a' AND 'b'", "NOT BETWEEN 'a' AND 'b'"),
        ("isnull", "IS NULL", "IS NOT NULL"),
    ];

    println!(
        "{:26} {:22} {}",
        "Lookup".white().bold(),
        "Renders".white().bold(),
        "Negated (!)".white().bold()
    );
    println!("{}", "─".repeat(72).dimmed());

    for (lookup, plain, negated) in lookups {
        println!("{:26} {:22} {}", lookup.cyan().bold(), plain.yellow(), negated.dimmed());
    }
}
