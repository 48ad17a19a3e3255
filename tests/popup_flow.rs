mod support;

use serde_json::{json, Value};
use std::sync::Arc;

use jobboard_admin::config::PopupMode;
use jobboard_admin::console::Console;
use jobboard_admin::error::MutationError;
use jobboard_admin::form::FormMode;
use jobboard_admin::model::{PopupConfig, Resource, ResourceId, ResourceKind};
use jobboard_admin::session::{MemoryTokenStore, SessionGuard, View};
use jobboard_admin::store::{Cardinality, ResourceStore};
use support::{harness, Call, RecordingGateway};

fn popup(id: i64, heading: &str) -> Value {
    json!({
        "id": id,
        "popup_heading": heading,
        "popup_text": "Applications close Friday",
        "popup_link": "https://cdn.example/banner.png",
        "popup_routing_link": "https://jobs.example/drive",
        "popup_belowtext": "Hurry up"
    })
}

fn fill_popup(console: &mut Console, heading: &str) {
    for (field, value) in [
        ("popup_heading", heading),
        ("popup_text", "Walk-in drive"),
        ("popup_link", "https://cdn.example/drive.png"),
        ("popup_routing_link", "https://jobs.example/drive"),
        ("popup_belowtext", "Register today"),
    ] {
        console.set_field::<PopupConfig>(field, value).unwrap();
    }
}

#[tokio::test]
async fn single_mode_loads_the_popup_into_the_form() {
    let mut h = harness(Some("t"), PopupMode::Single);
    h.gateway
        .seed(ResourceKind::Popups, vec![popup(1, "Hiring now"), popup(2, "Ignored")])
        .await;

    assert_eq!(h.console.navigate(View::Popups).await, View::Popups);

    let ws = h.console.workspace::<PopupConfig>();
    assert_eq!(ws.store().items().len(), 1);
    assert_eq!(ws.form().mode(), FormMode::Edit(ResourceId::Num(1)));
    assert_eq!(ws.form().draft().field("popup_heading"), Some("Hiring now"));
}

#[tokio::test]
async fn single_mode_save_updates_the_existing_popup() {
    let mut h = harness(Some("t"), PopupMode::Single);
    h.gateway
        .seed(ResourceKind::Popups, vec![popup(1, "Hiring now")])
        .await;
    h.console.navigate(View::Popups).await;

    h.console
        .set_field::<PopupConfig>("popup_heading", "Last call")
        .unwrap();
    h.console.submit::<PopupConfig>().await.unwrap();

    let calls = h.gateway.calls().await;
    assert!(!calls.iter().any(|c| matches!(c, Call::Create(..))));
    match &calls[1] {
        Call::Update(ResourceKind::Popups, id, body) => {
            assert_eq!(id, &ResourceId::Num(1));
            assert_eq!(body["popup_heading"], "Last call");
        }
        other => panic!("expected update, got {:?}", other),
    }
    let ws = h.console.workspace::<PopupConfig>();
    assert_eq!(ws.form().mode(), FormMode::Edit(ResourceId::Num(1)));
    assert_eq!(ws.form().draft().field("popup_heading"), Some("Last call"));
    assert_eq!(
        h.console.notifier().current().unwrap().text,
        "Popup updated successfully!"
    );
}

#[tokio::test]
async fn single_mode_cancel_reloads_the_stored_popup() {
    let mut h = harness(Some("t"), PopupMode::Single);
    h.gateway
        .seed(ResourceKind::Popups, vec![popup(1, "Hiring now")])
        .await;
    h.console.navigate(View::Popups).await;
    h.console
        .set_field::<PopupConfig>("popup_heading", "Unsaved")
        .unwrap();

    h.console.cancel::<PopupConfig>();

    let ws = h.console.workspace::<PopupConfig>();
    assert_eq!(ws.form().mode(), FormMode::Edit(ResourceId::Num(1)));
    assert_eq!(ws.form().draft().field("popup_heading"), Some("Hiring now"));
}

#[tokio::test]
async fn single_mode_refuses_a_second_popup_without_network() {
    let gateway = RecordingGateway::default();
    gateway
        .seed(ResourceKind::Popups, vec![popup(1, "Hiring now")])
        .await;
    let session = SessionGuard::new(Arc::new(MemoryTokenStore::with_token("t"))).context();
    let mut store = ResourceStore::<PopupConfig>::new(Cardinality::Single);
    store.refresh(&gateway, &session).await.unwrap();

    let err = store
        .create(&PopupConfig::default(), &gateway, &session)
        .await
        .unwrap_err();

    assert!(matches!(err, MutationError::SingleRecordExists));
    assert_eq!(gateway.calls().await.len(), 1);
}

#[tokio::test]
async fn single_mode_delete_then_create() {
    let mut h = harness(Some("t"), PopupMode::Single);
    h.gateway
        .seed(ResourceKind::Popups, vec![popup(1, "Hiring now")])
        .await;
    h.console.navigate(View::Popups).await;

    h.console
        .delete::<PopupConfig>(&ResourceId::from(1))
        .await
        .unwrap();
    let ws = h.console.workspace::<PopupConfig>();
    assert!(ws.store().items().is_empty());
    assert_eq!(ws.form().mode(), FormMode::Create);

    fill_popup(&mut h.console, "Walk-in");
    h.console.submit::<PopupConfig>().await.unwrap();

    let calls = h.gateway.calls().await;
    match &calls[3] {
        Call::Create(ResourceKind::Popups, body) => {
            assert_eq!(body["popup_heading"], "Walk-in");
            assert_eq!(body["popup_belowtext"], "Register today");
        }
        other => panic!("expected create, got {:?}", other),
    }
    let ws = h.console.workspace::<PopupConfig>();
    assert_eq!(ws.store().items().len(), 1);
    assert_eq!(ws.form().draft().field("popup_heading"), Some("Walk-in"));
}

#[tokio::test]
async fn list_mode_shows_every_popup() {
    let mut h = harness(Some("t"), PopupMode::List);
    h.gateway
        .seed(ResourceKind::Popups, vec![popup(1, "One"), popup(2, "Two")])
        .await;

    h.console.navigate(View::Popups).await;

    let ws = h.console.workspace::<PopupConfig>();
    assert_eq!(ws.store().items().len(), 2);
    assert_eq!(ws.form().mode(), FormMode::Create);
    assert_eq!(h.console.page::<PopupConfig>().filtered_count, 2);
}
