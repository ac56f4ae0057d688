mod common;

use common::*;
use ewiz::prelude::*;
use ewiz::schema::FILE_PREFIX;
use pretty_assertions::assert_eq;

fn ticket_model() -> Model {
    Model::new(
        "ticket",
        "tickets",
        vec![
            Field::new("ticket_id").column("id").primary_key(true).editable(false),
            Field::new("subject").nullable(false),
            Field::new("status").nullable(false),
            Field::new("assigned_to").column("assignee").prefix("user:"),
            Field::new("opened").editable(false),
            Field::new("upload").column("attachments").prefix(FILE_PREFIX),
        ],
    )
}

fn record(pairs: &[(&str, Option<&str>)]) -> Record {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.map(str::to_string)))
        .collect()
}

#[tokio::test]
async fn test_insert_returns_generated_id() {
    let transport = ScriptedTransport::new().on_endpoint("EWCreate", 200, "EWREST_id='311';\n");
    let db = db(transport);
    let model = ticket_model();

    let rec = record(&[
        ("subject", Some("VPN down")),
        ("status", Some("Open")),
        ("assigned_to", Some("ak")),
    ]);
    let id = db.insert(&model, &rec, true).await.unwrap();
    assert_eq!(id.as_deref(), Some("311"));

    let urls = db.transport().urls();
    assert_eq!(urls.len(), 1);
    assert!(
        urls[0].ends_with("&$lang=en&subject=VPN down&status=Open&assignee=user:ak&time_spent=0:0:1:0"),
        "{}",
        urls[0]
    );
}

#[tokio::test]
async fn test_insert_without_return_id_ignores_body() {
    let transport = ScriptedTransport::new().on_endpoint("EWCreate", 200, "");
    let db = db(transport);
    let model = ticket_model();

    let rec = record(&[("subject", Some("a")), ("status", Some("Open"))]);
    assert_eq!(db.insert(&model, &rec, false).await.unwrap(), None);
}

#[tokio::test]
async fn test_insert_rejects_empty_required_field() {
    let db = db(ScriptedTransport::new());
    let model = ticket_model();

    let rec = record(&[("subject", Some("")), ("status", Some("Open"))]);
    let err = db.insert(&model, &rec, true).await.unwrap_err();
    assert!(matches!(err, EwizError::Integrity(ref f) if f == "subject"));
    assert!(db.transport().requests().is_empty());
}

#[tokio::test]
async fn test_insert_unknown_field() {
    let db = db(ScriptedTransport::new());
    let model = ticket_model();

    let rec = record(&[("colour", Some("red"))]);
    let err = db.insert(&model, &rec, false).await.unwrap_err();
    assert!(matches!(err, EwizError::UnknownField { ref field, .. } if field == "colour"));
}

#[tokio::test]
async fn test_insert_http_failure_carries_remote_message() {
    let transport = ScriptedTransport::new().on_endpoint("EWCreate", 400, "field status is locked");
    let db = db(transport);
    let model = ticket_model();

    let rec = record(&[("subject", Some("a")), ("status", Some("Open"))]);
    match db.insert(&model, &rec, true).await.unwrap_err() {
        EwizError::Insert { table, message } => {
            assert_eq!(table, "ticket");
            assert!(message.contains("field status is locked"));
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn test_insert_round_trips_through_read() {
    let transport = ScriptedTransport::new().on_endpoint("EWCreate", 200, "EWREST_id='42';");
    let db = db(transport);
    let model = Model::adhoc("tickets");

    let rec = record(&[("status", Some("Open")), ("id", Some("42"))]);
    db.insert(&model, &rec, false).await.unwrap();

    let url = &db.transport().urls()[0];
    let params = url.split("&$lang=en").nth(1).unwrap();
    let sent: Ticket = params
        .split('&')
        .filter(|p| !p.is_empty() && !p.starts_with("time_spent="))
        .filter_map(|p| p.split_once('='))
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

    let read_back = ewiz::parse_record("EWREST_status='Open';\nEWREST_id='42';").unwrap();
    assert_eq!(sent, read_back);
}

#[tokio::test]
async fn test_update_targets_primary_key() {
    let transport = ScriptedTransport::new().on_endpoint("EWUpdate", 200, "");
    let db = db(transport);
    let model = ticket_model();

    let rec = record(&[
        ("opened", Some("2013-01-01")),
        ("status", Some("Closed")),
        ("assigned_to", None),
    ]);
    let updated = db
        .query(&model)
        .filter("ticket_id", "exact", "311")
        .unwrap()
        .update(&rec)
        .await
        .unwrap();
    assert_eq!(updated, 1);

    let urls = db.transport().urls();
    assert!(
        urls[0].ends_with("&$lang=en&id=311&status=Closed&assignee=user:&time_spent=0:0:1:0"),
        "{}",
        urls[0]
    );
}

#[tokio::test]
async fn test_update_without_target_is_fatal() {
    let db = db(ScriptedTransport::new());
    let model = ticket_model();
    let rec = record(&[("status", Some("Closed"))]);

    let err = db
        .query(&model)
        .filter("status", "exact", "Open")
        .unwrap()
        .update(&rec)
        .await
        .unwrap_err();
    assert!(matches!(err, EwizError::CompilerAssumption(_)));

    let err = db
        .query(&model)
        .filter("ticket_id", "in", ["1", "2"])
        .unwrap()
        .update(&rec)
        .await
        .unwrap_err();
    assert!(matches!(err, EwizError::CompilerAssumption(_)));
    assert!(db.transport().requests().is_empty());
}

#[tokio::test]
async fn test_update_http_failure() {
    let transport = ScriptedTransport::new().on_endpoint("EWUpdate", 500, "ticket locked");
    let db = db(transport);
    let model = ticket_model();

    let err = db
        .query(&model)
        .filter("ticket_id", "exact", "7")
        .unwrap()
        .update(&record(&[("status", Some("Closed"))]))
        .await
        .unwrap_err();
    assert!(matches!(err, EwizError::Update { ref message, .. } if message.contains("ticket locked")));
}

#[tokio::test]
async fn test_attach_puts_raw_bytes() {
    let transport = ScriptedTransport::new().on_endpoint("EWAttach", 200, "1");
    let db = db(transport);
    let model = ticket_model();

    let reply = db
        .attach(&model, "311", "log file.txt", b"hello".to_vec())
        .await
        .unwrap();
    assert_eq!(reply, "1");

    let requests = db.transport().requests();
    assert_eq!(requests[0].method, Method::Put);
    assert_eq!(requests[0].body.as_deref(), Some(&b"hello"[..]));
    assert!(db.transport().urls()[0].ends_with("&id=311&field=attachments&fileName=log file.txt"));
}

#[tokio::test]
async fn test_attach_needs_file_field() {
    let db = db(ScriptedTransport::new());
    let model = Model::adhoc("tickets");

    let err = db.attach(&model, "1", "a.txt", Vec::new()).await.unwrap_err();
    assert!(matches!(err, EwizError::UnknownField { .. }));
}

#[test]
fn test_delete_is_unsupported() {
    let db = db(ScriptedTransport::new());
    let model = ticket_model();
    assert!(matches!(
        db.query(&model).delete(),
        Err(EwizError::UnsupportedOperation(_))
    ));
}
