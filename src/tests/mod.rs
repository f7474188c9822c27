use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::account::{AccountError, AccountService, CheckoutOutcome};
use crate::auth::{AuthContext, MemoryTokenStore, Session};
use crate::client::{ApiClient, ApiError, ApiRequest, ApiResponse, Transport, TransportError};
use crate::editor::{DialogError, EditorDialog, Mutation, Notifier, RecordEditor};
use crate::records::{Product, ProductDraft, RecordId, Sale, SaleDraft};
use crate::store::{FetchOutcome, RemoteCollectionStore};
use crate::view::{PageSize, PageWindow, SortKey, TableView};

enum Scripted {
    Reply(ApiResponse),
    Delayed(Duration, ApiResponse),
    Unreachable,
}

/// Hands out canned responses in order and records every request.
#[derive(Default)]
struct ScriptedTransport {
    script: Mutex<VecDeque<Scripted>>,
    requests: Mutex<Vec<ApiRequest>>,
}

impl ScriptedTransport {
    fn new(script: Vec<Scripted>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            requests: Mutex::new(Vec::new()),
        })
    }

    fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn execute(&self, request: ApiRequest) -> Result<ApiResponse, TransportError> {
        let url = request.url.to_string();
        self.requests.lock().unwrap().push(request);
        let next = self.script.lock().unwrap().pop_front();
        match next {
            Some(Scripted::Reply(r)) => Ok(r),
            Some(Scripted::Delayed(d, r)) => {
                tokio::time::sleep(d).await;
                Ok(r)
            }
            Some(Scripted::Unreachable) | None => Err(TransportError::Unreachable {
                url,
                reason: "connection refused".to_string(),
            }),
        }
    }
}

#[derive(Default)]
struct RecordingNotifier {
    successes: Mutex<Vec<String>>,
    errors: Mutex<Vec<String>>,
}

impl Notifier for RecordingNotifier {
    fn success(&self, message: &str) {
        self.successes.lock().unwrap().push(message.to_string());
    }

    fn error(&self, message: &str) {
        self.errors.lock().unwrap().push(message.to_string());
    }
}

fn ok(body: &str) -> Scripted {
    Scripted::Reply(ApiResponse::new(200, body))
}

fn delayed(millis: u64, body: &str) -> Scripted {
    Scripted::Delayed(Duration::from_millis(millis), ApiResponse::new(200, body))
}

fn status(code: u16, body: &str) -> Scripted {
    Scripted::Reply(ApiResponse::new(code, body))
}

fn delayed_status(millis: u64, code: u16, body: &str) -> Scripted {
    Scripted::Delayed(Duration::from_millis(millis), ApiResponse::new(code, body))
}

fn logged_in() -> AuthContext {
    AuthContext::new(Arc::new(MemoryTokenStore::with_session(Session {
        access_token: "old".to_string(),
        refresh_token: "r1".to_string(),
        user_id: Some(7),
    })))
}

fn client(transport: Arc<ScriptedTransport>, auth: AuthContext) -> ApiClient {
    ApiClient::new("http://backend.test/api", transport, auth).unwrap()
}

fn products_json(items: &[(u64, &str, f64)]) -> String {
    let rows: Vec<serde_json::Value> = items
        .iter()
        .map(|(id, name, price)| {
            serde_json::json!({
                "id": id,
                "name": name,
                "price": format!("{price:.2}"),
                "initial_quantity": 10,
                "total_quantity_sold": 1
            })
        })
        .collect();
    serde_json::to_string(&rows).unwrap()
}

fn body_json(request: &ApiRequest) -> serde_json::Value {
    serde_json::from_slice(request.body.as_deref().unwrap_or(b"null")).unwrap()
}

#[tokio::test]
async fn fetch_replaces_collection_and_uses_bearer() {
    let transport = ScriptedTransport::new(vec![ok(&products_json(&[
        (1, "Rice", 12.0),
        (2, "Oil", 30.5),
    ]))]);
    let store = RemoteCollectionStore::<Product>::new(client(transport.clone(), logged_in()));

    assert_eq!(
        store.fetch().await.unwrap(),
        FetchOutcome::Applied { records: 2 }
    );
    assert_eq!(store.records()[1].price, 30.5);

    let requests = transport.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].url.as_str(), "http://backend.test/api/products/list/");
    assert_eq!(requests[0].bearer.as_deref(), Some("old"));
}

#[tokio::test]
async fn superseded_fetch_is_dropped() {
    let transport = ScriptedTransport::new(vec![
        delayed(200, &products_json(&[(1, "Stale", 1.0)])),
        ok(&products_json(&[(2, "Fresh", 2.0), (3, "Newer", 3.0)])),
    ]);
    let store = RemoteCollectionStore::<Product>::new(client(transport.clone(), logged_in()));

    let first = {
        let store = store.clone();
        tokio::spawn(async move { store.fetch().await })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;
    let second = store.fetch().await.unwrap();

    assert_eq!(second, FetchOutcome::Applied { records: 2 });
    assert_eq!(first.await.unwrap().unwrap(), FetchOutcome::Stale);
    let names: Vec<String> = store.records().into_iter().map(|p| p.name).collect();
    assert_eq!(names, vec!["Fresh", "Newer"]);
}

#[tokio::test]
async fn closing_discards_in_flight_fetch() {
    let transport = ScriptedTransport::new(vec![delayed(200, &products_json(&[(1, "Late", 1.0)]))]);
    let store = RemoteCollectionStore::<Product>::new(client(transport, logged_in()));

    let pending = {
        let store = store.clone();
        tokio::spawn(async move { store.fetch().await })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;
    store.close();

    assert_eq!(pending.await.unwrap().unwrap(), FetchOutcome::Closed);
    assert!(store.is_empty());
    assert_eq!(store.fetch().await.unwrap(), FetchOutcome::Closed);
}

#[tokio::test]
async fn failed_fetch_keeps_last_good_rows() {
    let transport = ScriptedTransport::new(vec![
        ok(&products_json(&[(1, "Rice", 12.0), (2, "Oil", 30.0)])),
        status(500, r#"{"detail": "database unavailable"}"#),
        Scripted::Unreachable,
    ]);
    let store = RemoteCollectionStore::<Product>::new(client(transport, logged_in()));
    store.fetch().await.unwrap();

    let err = store.fetch().await.unwrap_err();
    assert_eq!(err.status(), Some(500));
    assert!(err.to_string().contains("database unavailable"));
    assert_eq!(store.len(), 2);
    assert!(store.last_error().is_some());

    assert!(matches!(
        store.fetch().await.unwrap_err(),
        ApiError::Transport(_)
    ));
    assert_eq!(store.len(), 2);
}

#[tokio::test]
async fn failed_stale_response_leaves_rows_and_error_untouched() {
    let transport = ScriptedTransport::new(vec![
        delayed_status(200, 500, r#"{"detail": "database unavailable"}"#),
        ok(&products_json(&[(2, "Fresh", 2.0)])),
    ]);
    let store = RemoteCollectionStore::<Product>::new(client(transport, logged_in()));

    let first = {
        let store = store.clone();
        tokio::spawn(async move { store.fetch().await })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(
        store.fetch().await.unwrap(),
        FetchOutcome::Applied { records: 1 }
    );

    assert_eq!(first.await.unwrap().unwrap(), FetchOutcome::Stale);
    assert_eq!(store.last_error(), None);
    let names: Vec<String> = store.records().into_iter().map(|p| p.name).collect();
    assert_eq!(names, vec!["Fresh"]);
}

#[tokio::test]
async fn malformed_payloads_are_rejected() {
    let transport = ScriptedTransport::new(vec![
        ok(r#"{"results": []}"#),
        ok(r#"[{"id": 1, "name": "  ", "price": 3}]"#),
    ]);
    let store = RemoteCollectionStore::<Product>::new(client(transport, logged_in()));

    assert!(matches!(
        store.fetch().await.unwrap_err(),
        ApiError::Decode { .. }
    ));
    assert!(matches!(
        store.fetch().await.unwrap_err(),
        ApiError::Schema(_)
    ));
    assert!(store.is_empty());
}

#[tokio::test]
async fn expired_token_is_refreshed_and_request_replayed() {
    let auth = logged_in();
    let transport = ScriptedTransport::new(vec![
        status(401, r#"{"detail": "token expired"}"#),
        ok(r#"{"access": "new"}"#),
        ok(&products_json(&[(1, "Rice", 12.0)])),
    ]);
    let store = RemoteCollectionStore::<Product>::new(client(transport.clone(), auth.clone()));

    assert_eq!(
        store.fetch().await.unwrap(),
        FetchOutcome::Applied { records: 1 }
    );

    let requests = transport.requests();
    assert_eq!(requests.len(), 3);
    assert!(requests[1].url.path().ends_with("/token/refresh/"));
    assert_eq!(requests[1].bearer, None);
    assert_eq!(body_json(&requests[1])["refresh"], "r1");
    assert_eq!(requests[2].bearer.as_deref(), Some("new"));

    let session = auth.session().unwrap().unwrap();
    assert_eq!(session.access_token, "new");
    assert_eq!(session.refresh_token, "r1");
}

#[tokio::test]
async fn second_rejection_ends_the_session() {
    let auth = logged_in();
    let transport = ScriptedTransport::new(vec![
        status(401, ""),
        ok(r#"{"access": "new"}"#),
        status(401, ""),
    ]);
    let api = client(transport.clone(), auth.clone());

    let err = api.get::<Vec<Product>>("products/list/").await.unwrap_err();
    assert!(matches!(err, ApiError::SessionExpired));
    assert!(err.needs_login());
    assert_eq!(transport.requests().len(), 3);
    assert_eq!(auth.session().unwrap(), None);
}

#[tokio::test]
async fn rejected_refresh_ends_the_session() {
    let auth = logged_in();
    let transport = ScriptedTransport::new(vec![
        status(401, ""),
        status(401, r#"{"detail": "Token is blacklisted"}"#),
    ]);
    let api = client(transport.clone(), auth.clone());

    let err = api.get::<Vec<Product>>("products/list/").await.unwrap_err();
    assert!(matches!(err, ApiError::SessionExpired));
    assert_eq!(transport.requests().len(), 2);
    assert_eq!(auth.session().unwrap(), None);
}

#[tokio::test]
async fn concurrent_rejections_share_one_refresh() {
    let auth = logged_in();
    let transport = ScriptedTransport::new(vec![
        delayed_status(20, 401, ""),
        delayed_status(20, 401, ""),
        ok(r#"{"access": "new"}"#),
        ok(&products_json(&[(1, "Rice", 12.0)])),
        ok(&products_json(&[(1, "Rice", 12.0)])),
    ]);
    let api = client(transport.clone(), auth.clone());

    let (first, second) = tokio::join!(
        api.get::<Vec<Product>>("products/list/"),
        api.get::<Vec<Product>>("products/list/")
    );
    assert_eq!(first.unwrap().len(), 1);
    assert_eq!(second.unwrap().len(), 1);

    let requests = transport.requests();
    assert_eq!(requests.len(), 5);
    let refreshes = requests
        .iter()
        .filter(|r| r.url.path().ends_with("/token/refresh/"))
        .count();
    assert_eq!(refreshes, 1);
    let replays: Vec<Option<&str>> = requests[3..].iter().map(|r| r.bearer.as_deref()).collect();
    assert_eq!(replays, vec![Some("new"), Some("new")]);
    assert_eq!(auth.access_token().unwrap().as_deref(), Some("new"));
}

#[tokio::test]
async fn field_errors_are_reported_in_body_order() {
    let transport = ScriptedTransport::new(vec![status(
        400,
        r#"{"quantity": ["Ensure this value is greater than 0."], "name": ["This field is required."]}"#,
    )]);
    let api = client(transport, logged_in());

    let err = api
        .post::<_, serde_json::Value>("products/list/", &serde_json::json!({}))
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(400));
    assert!(err
        .to_string()
        .ends_with("quantity: Ensure this value is greater than 0."));
}

#[tokio::test]
async fn unreachable_refresh_keeps_the_session() {
    let auth = logged_in();
    let transport = ScriptedTransport::new(vec![status(401, ""), Scripted::Unreachable]);
    let api = client(transport, auth.clone());

    let err = api.get::<Vec<Product>>("products/list/").await.unwrap_err();
    assert!(matches!(err, ApiError::Transport(_)));
    assert!(auth.session().unwrap().is_some());
}

#[tokio::test]
async fn requests_without_session_are_not_sent() {
    let transport = ScriptedTransport::new(vec![]);
    let api = client(transport.clone(), AuthContext::in_memory());

    let err = api.get::<Vec<Product>>("products/list/").await.unwrap_err();
    assert!(matches!(err, ApiError::NotAuthenticated));
    assert!(transport.requests().is_empty());
}

#[tokio::test]
async fn failed_create_keeps_dialog_open_and_collection_untouched() {
    let transport = ScriptedTransport::new(vec![
        ok(&products_json(&[(1, "Rice", 12.0)])),
        status(400, r#"{"name": ["product with this name already exists."]}"#),
    ]);
    let api = client(transport.clone(), logged_in());
    let store = RemoteCollectionStore::<Product>::new(api.clone());
    store.fetch().await.unwrap();

    let notifier = Arc::new(RecordingNotifier::default());
    let editor = RecordEditor::<Product>::new(api, notifier.clone(), store.refresh_hook());
    let mut dialog = EditorDialog::new();
    dialog
        .open(ProductDraft {
            name: "Rice".to_string(),
            price: 12.0,
            quantity: 5,
            user: None,
        })
        .unwrap();

    let err = dialog.submit(&editor, Mutation::Create).await.unwrap_err();
    assert!(matches!(err, DialogError::Request(ApiError::Status { status: 400, .. })));
    assert!(dialog.is_open());
    assert!(dialog
        .error()
        .unwrap()
        .contains("name: product with this name already exists."));

    let errors = notifier.errors.lock().unwrap().clone();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].starts_with("Error adding product:"));
    assert!(errors[0].ends_with("Please try again."));
    assert!(notifier.successes.lock().unwrap().is_empty());

    assert!(!store.take_refresh_request());
    assert_eq!(store.len(), 1);
    assert_eq!(transport.requests().len(), 2);
}

#[tokio::test]
async fn create_posts_draft_with_session_user() {
    let transport = ScriptedTransport::new(vec![status(201, r#"{"id": 9}"#)]);
    let api = client(transport.clone(), logged_in());
    let store = RemoteCollectionStore::<Sale>::new(api.clone());
    let notifier = Arc::new(RecordingNotifier::default());
    let editor = RecordEditor::<Sale>::new(api, notifier.clone(), store.refresh_hook());

    editor
        .create(SaleDraft {
            product: RecordId(3),
            quantity_sold: 2,
            sale_date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            user: None,
        })
        .await
        .unwrap();

    let requests = transport.requests();
    assert_eq!(requests[0].method, reqwest::Method::POST);
    assert_eq!(requests[0].url.path(), "/api/sale/all/");
    let body = body_json(&requests[0]);
    assert_eq!(body["user"], 7);
    assert_eq!(body["product"], 3);
    assert_eq!(body["sale_date"], "2024-05-01");
    assert_eq!(
        notifier.successes.lock().unwrap().as_slice(),
        ["Sale added successfully"]
    );
    tokio::time::timeout(Duration::from_secs(1), store.wait_for_refresh())
        .await
        .unwrap();
}

#[tokio::test]
async fn invalid_draft_never_reaches_the_backend() {
    let transport = ScriptedTransport::new(vec![]);
    let api = client(transport.clone(), logged_in());
    let store = RemoteCollectionStore::<Sale>::new(api.clone());
    let notifier = Arc::new(RecordingNotifier::default());
    let editor = RecordEditor::<Sale>::new(api, notifier.clone(), store.refresh_hook());

    let err = editor
        .create(SaleDraft {
            product: RecordId(3),
            quantity_sold: 0,
            sale_date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            user: None,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Schema(_)));
    assert!(transport.requests().is_empty());
    assert_eq!(notifier.errors.lock().unwrap().len(), 1);
    assert!(!store.take_refresh_request());
}

#[tokio::test]
async fn successful_delete_closes_dialog_and_refreshes_once() {
    let transport = ScriptedTransport::new(vec![
        status(204, ""),
        ok(&products_json(&[(2, "Oil", 30.0)])),
    ]);
    let api = client(transport.clone(), logged_in());
    let store = RemoteCollectionStore::<Product>::new(api.clone());
    let notifier = Arc::new(RecordingNotifier::default());
    let editor = RecordEditor::<Product>::new(api, notifier.clone(), store.refresh_hook());

    let mut dialog = EditorDialog::new();
    dialog.open(RecordId(1)).unwrap();
    dialog.submit(&editor, Mutation::Delete).await.unwrap();

    assert!(dialog.is_closed());
    assert_eq!(
        notifier.successes.lock().unwrap().as_slice(),
        ["Product deleted successfully"]
    );
    assert!(store.take_refresh_request());
    assert!(!store.take_refresh_request());
    assert_eq!(
        store.fetch().await.unwrap(),
        FetchOutcome::Applied { records: 1 }
    );

    let requests = transport.requests();
    assert_eq!(requests[0].method, reqwest::Method::DELETE);
    assert_eq!(requests[0].url.path(), "/api/products/list/1/");
}

#[tokio::test]
async fn update_puts_to_the_item_path() {
    let transport = ScriptedTransport::new(vec![ok(r#"{"id": 4}"#)]);
    let api = client(transport.clone(), logged_in());
    let store = RemoteCollectionStore::<Product>::new(api.clone());
    let notifier = Arc::new(RecordingNotifier::default());
    let editor = RecordEditor::<Product>::new(api, notifier.clone(), store.refresh_hook());

    editor
        .update(
            RecordId(4),
            ProductDraft {
                name: "Oil".to_string(),
                price: 31.0,
                quantity: 12,
                user: None,
            },
        )
        .await
        .unwrap();

    let requests = transport.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].method, reqwest::Method::PUT);
    assert_eq!(requests[0].url.path(), "/api/products/list/4/");
    let body = body_json(&requests[0]);
    assert_eq!(body["price"], 31.0);
    assert_eq!(body["user"], 7);
    assert_eq!(
        notifier.successes.lock().unwrap().as_slice(),
        ["Product updated successfully"]
    );
    assert!(store.take_refresh_request());
}

#[tokio::test]
async fn load_reads_and_validates_one_record() {
    let transport = ScriptedTransport::new(vec![
        ok(r#"{"id": 4, "name": "Oil", "price": "30.00", "initial_quantity": 12}"#),
        ok(r#"{"id": 5, "name": " ", "price": 1}"#),
    ]);
    let api = client(transport.clone(), logged_in());
    let notifier = Arc::new(RecordingNotifier::default());
    let editor =
        RecordEditor::<Product>::new(api, notifier.clone(), crate::store::RefreshHook::noop());

    let product = editor.load(RecordId(4)).await.unwrap();
    assert_eq!(product.name, "Oil");
    assert_eq!(product.price, 30.0);
    assert_eq!(transport.requests()[0].method, reqwest::Method::GET);
    assert_eq!(transport.requests()[0].url.path(), "/api/products/list/4/");

    assert!(matches!(
        editor.load(RecordId(5)).await.unwrap_err(),
        ApiError::Schema(_)
    ));
    assert!(notifier.errors.lock().unwrap().is_empty());
}

#[tokio::test]
async fn partial_update_keeps_fields_left_out() {
    let transport = ScriptedTransport::new(vec![
        ok(r#"{"id": 4, "name": "Oil", "price": "30.00", "initial_quantity": 12,
               "total_quantity_sold": 3}"#),
        ok(r#"{"id": 4}"#),
    ]);
    let api = client(transport.clone(), logged_in());
    let notifier = Arc::new(RecordingNotifier::default());
    let editor =
        RecordEditor::<Product>::new(api, notifier, crate::store::RefreshHook::noop());

    let changes = serde_json::json!({"price": 32.5});
    let draft = editor
        .prefill(RecordId(4), changes.as_object().unwrap().clone())
        .await
        .unwrap();
    assert_eq!(draft.name, "Oil");
    assert_eq!(draft.price, 32.5);
    assert_eq!(draft.quantity, 12);

    editor.update(RecordId(4), draft).await.unwrap();
    let requests = transport.requests();
    assert_eq!(requests[1].method, reqwest::Method::PUT);
    let body = body_json(&requests[1]);
    assert_eq!(body["name"], "Oil");
    assert_eq!(body["price"], 32.5);
    assert_eq!(body["quantity"], 12);
    assert!(body.get("total_quantity_sold").is_none());
}

#[tokio::test]
async fn dropped_submit_reopens_the_dialog() {
    let transport = ScriptedTransport::new(vec![delayed_status(500, 204, "")]);
    let api = client(transport.clone(), logged_in());
    let store = RemoteCollectionStore::<Product>::new(api.clone());
    let notifier = Arc::new(RecordingNotifier::default());
    let editor = RecordEditor::<Product>::new(api, notifier.clone(), store.refresh_hook());

    let mut dialog = EditorDialog::new();
    dialog.open(RecordId(1)).unwrap();
    let timed_out = tokio::time::timeout(
        Duration::from_millis(20),
        dialog.submit(&editor, Mutation::Delete),
    )
    .await;

    assert!(timed_out.is_err());
    assert!(dialog.is_open());
    assert_eq!(dialog.error(), None);
    assert!(notifier.successes.lock().unwrap().is_empty());
    assert!(!store.take_refresh_request());
    assert_eq!(transport.requests().len(), 1);
}

#[tokio::test]
async fn submitting_a_closed_dialog_is_an_error() {
    let transport = ScriptedTransport::new(vec![]);
    let api = client(transport.clone(), logged_in());
    let notifier = Arc::new(RecordingNotifier::default());
    let editor =
        RecordEditor::<Product>::new(api, notifier, crate::store::RefreshHook::noop());

    let mut dialog: EditorDialog<RecordId> = EditorDialog::new();
    assert!(matches!(
        dialog.submit(&editor, Mutation::Delete).await,
        Err(DialogError::NotOpen)
    ));
    dialog.open(RecordId(1)).unwrap();
    assert!(matches!(
        dialog.open(RecordId(2)),
        Err(DialogError::AlreadyOpen)
    ));
    dialog.cancel();
    assert!(dialog.is_closed());
    assert!(transport.requests().is_empty());
}

#[tokio::test]
async fn fetched_rows_render_through_the_view() {
    let transport = ScriptedTransport::new(vec![ok(&products_json(&[
        (1, "Rice", 12.0),
        (2, "Oil", 30.0),
        (3, "Rice flour", 8.0),
        (4, "Brown rice", 20.0),
    ]))]);
    let store = RemoteCollectionStore::<Product>::new(client(transport, logged_in()));
    store.fetch().await.unwrap();

    let mut view = TableView::for_kind(crate::records::RecordKind::Product);
    view.set_search("RICE");
    view.sort = Some(SortKey::descending("price"));
    view.window = PageWindow::new(0, PageSize::Five);
    let page = store.render(&mut view);

    let ids: Vec<u64> = page.rows.iter().map(|p| p.id.0).collect();
    assert_eq!(ids, vec![4, 1, 3]);
    assert_eq!(page.matched, 3);
    assert_eq!(page.padding, 0);
    assert_eq!(store.len(), 4);
}

#[tokio::test]
async fn login_stores_session_without_bearer() {
    let auth = AuthContext::in_memory();
    let transport = ScriptedTransport::new(vec![ok(
        r#"{"access": "a1", "refresh": "r1", "user_id": 3}"#,
    )]);
    let account = AccountService::new(client(transport.clone(), auth.clone()));

    let session = account.login("owner@shop.gh", "hunter22!").await.unwrap();
    assert_eq!(session.user_id, Some(3));
    assert_eq!(auth.access_token().unwrap().as_deref(), Some("a1"));

    let requests = transport.requests();
    assert_eq!(requests[0].url.path(), "/api/user/api/token/");
    assert_eq!(requests[0].bearer, None);
    assert_eq!(body_json(&requests[0])["email"], "owner@shop.gh");
}

#[tokio::test]
async fn login_validates_before_sending() {
    let transport = ScriptedTransport::new(vec![]);
    let account = AccountService::new(client(transport.clone(), AuthContext::in_memory()));

    assert!(matches!(
        account.login("not-an-email", "hunter22!").await,
        Err(AccountError::Invalid(_))
    ));
    assert!(matches!(
        account.login("owner@shop.gh", "short").await,
        Err(AccountError::Invalid(_))
    ));
    assert!(transport.requests().is_empty());
}

#[tokio::test]
async fn logout_clears_session_even_when_server_fails() {
    let auth = logged_in();
    let transport = ScriptedTransport::new(vec![status(500, "")]);
    let account = AccountService::new(client(transport.clone(), auth.clone()));

    assert!(account.logout().await.is_err());
    assert_eq!(auth.session().unwrap(), None);
    assert_eq!(body_json(&transport.requests()[0])["refresh_token"], "r1");
}

#[tokio::test]
async fn only_completed_checkout_upgrades() {
    let transport = ScriptedTransport::new(vec![ok(r#"{"message": "upgraded"}"#)]);
    let account = AccountService::new(client(transport.clone(), logged_in()));

    let failed = account
        .complete_checkout(
            CheckoutOutcome::Failed {
                reason: "card declined".to_string(),
            },
            "pro",
        )
        .await;
    assert!(matches!(failed, Err(AccountError::CheckoutFailed { .. })));
    assert!(transport.requests().is_empty());

    let reference = account
        .complete_checkout(
            CheckoutOutcome::Completed {
                reference: "T-881".to_string(),
            },
            "pro",
        )
        .await
        .unwrap();
    assert_eq!(reference, "T-881");
    let requests = transport.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].url.path(), "/api/subscription/upgrade/");
    assert_eq!(body_json(&requests[0])["new_plan"], "pro");
}

#[tokio::test]
async fn cashflow_passes_the_year() {
    let transport = ScriptedTransport::new(vec![ok(
        r#"[{"month": 1, "income": 500, "expense": 120.5}]"#,
    )]);
    let account = AccountService::new(client(transport.clone(), logged_in()));

    let months = account.cashflow(2024).await.unwrap();
    assert_eq!(months.len(), 1);
    assert_eq!(months[0].net(), 379.5);
    assert_eq!(
        transport.requests()[0].url.as_str(),
        "http://backend.test/api/dashboard/income-expenses/?year=2024"
    );
}

#[tokio::test]
async fn dashboard_feeds_decode_breakdown_and_top_products() {
    let transport = ScriptedTransport::new(vec![
        ok(r#"{"this_month": [{"category__name": "Rent", "total_amount": "450.00"}],
               "this_year": [{"category__name": "Rent", "total_amount": 5400},
                             {"category__name": "Fuel", "total_amount": 800}]}"#),
        ok(r#"{"top_selling_products": [{"product__name": "Rice 5kg", "quantity_sold": 40,
               "product__remaining_percentage": 80, "total": "800.00"}]}"#),
    ]);
    let account = AccountService::new(client(transport.clone(), logged_in()));

    let breakdown = account.expense_breakdown().await.unwrap();
    assert_eq!(breakdown.period("this_month")[0].amount(), 450.0);
    assert_eq!(breakdown.period("this_year").len(), 2);
    assert!(breakdown.period("last_month").is_empty());

    let top = account.top_products().await.unwrap();
    assert_eq!(top.len(), 1);
    assert_eq!(top[0].name, "Rice 5kg");
    assert_eq!(top[0].total, Some(800.0));

    let requests = transport.requests();
    assert_eq!(requests[0].url.path(), "/api/dashboard/expense/");
    assert_eq!(requests[1].url.path(), "/api/dashboard/details/products/");
    assert!(requests.iter().all(|r| r.bearer.as_deref() == Some("old")));
}
