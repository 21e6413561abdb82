// tests/store_supabase.rs
//
// Request shapes sent to the hosted store, checked against a wiremock stand-in.

use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use hoa_portal::config::BackendConfig;
use hoa_portal::notify::Channel;
use hoa_portal::store::{CallNote, NotificationRecord, PortalStore, SupabaseStore};

async fn store_for(server: &MockServer) -> SupabaseStore {
    SupabaseStore::new(
        reqwest::Client::new(),
        BackendConfig {
            url: server.uri(),
            anon_key: "anon".into(),
            service_role_key: "service".into(),
        },
    )
}

#[tokio::test]
async fn authenticate_uses_anon_key_and_user_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/auth/v1/user"))
        .and(header("apikey", "anon"))
        .and(header("authorization", "Bearer user-jwt"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "id": "u-1", "email": "board@example.com", "role": "authenticated" })),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/auth/v1/user"))
        .respond_with(ResponseTemplate::new(401))
        .with_priority(10)
        .mount(&server)
        .await;

    let store = store_for(&server).await;
    let user = store.authenticate("user-jwt").await.unwrap().expect("user");
    assert_eq!(user.id, "u-1");
    assert_eq!(user.email.as_deref(), Some("board@example.com"));

    assert!(store.authenticate("expired").await.unwrap().is_none());
    assert!(store.authenticate("").await.unwrap().is_none());
}

#[tokio::test]
async fn identity_outage_is_an_error_not_a_rejection() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    let store = store_for(&server).await;
    assert!(store.authenticate("user-jwt").await.is_err());
}

#[tokio::test]
async fn active_residents_filters_on_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/residents"))
        .and(query_param("select", "id,first_name,last_name,email,phone"))
        .and(query_param("status", "eq.active"))
        .and(header("apikey", "service"))
        .and(header("authorization", "Bearer service"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": "r-1", "first_name": "Ada", "last_name": "Lovelace", "email": "ada@example.com", "phone": null },
            { "id": 2, "first_name": "Alan", "last_name": "Turing", "email": null, "phone": "+15550001111" }
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let store = store_for(&server).await;
    let residents = store.active_residents().await.unwrap();
    assert_eq!(residents.len(), 2);
    assert_eq!(residents[0].display_name(), "Ada Lovelace");
    assert_eq!(residents[1].phone.as_deref(), Some("+15550001111"));
}

#[tokio::test]
async fn inserts_post_rows_and_surface_store_messages() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/notifications"))
        .and(header("prefer", "return=minimal"))
        .and(body_json(json!({
            "subject": "Pool closed",
            "body": "Friday",
            "channel": "sms",
            "recipient_count": 3,
            "sent_by": "u-1"
        })))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/call_notes"))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({
            "code": "23505",
            "message": "duplicate key value violates unique constraint"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let store = store_for(&server).await;
    store
        .record_notification(&NotificationRecord {
            subject: "Pool closed".into(),
            body: "Friday".into(),
            channel: Channel::from("sms"),
            recipient_count: 3,
            sent_by: "u-1".into(),
        })
        .await
        .expect("notification insert");

    let err = store
        .record_call_note(&CallNote {
            vapi_call_id: "c1".into(),
            status: "new".into(),
            ..Default::default()
        })
        .await
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "duplicate key value violates unique constraint"
    );
}
