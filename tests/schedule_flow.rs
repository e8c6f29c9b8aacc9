use serde_json::json;
use sitesched::prelude::*;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// End-to-end drag commit through the public client surface: the engine
/// loads from the record store, applies a move optimistically, and either
/// persists it or reloads ground truth on failure.

fn seed_rows() -> serde_json::Value {
    json!([
        {
            "id": 1,
            "element_guid": "2O2Fr$t4X7Zf8NOew3FLKQ",
            "scheduled_date": "2024-05-06",
            "sort_position": 0,
            "resources": "crew A",
            "notes": null
        },
        {
            "id": 2,
            "element_guid": "1bFg8qsj95M98$ykEubJd_",
            "scheduled_date": "2024-05-06",
            "sort_position": 1,
            "resources": null,
            "notes": null
        },
        {
            "id": 3,
            "element_guid": "0EdO2uEPv65OBRiGnlPwab",
            "scheduled_date": "2024-05-07",
            "sort_position": 0,
            "resources": null,
            "notes": null
        }
    ])
}

async fn mount_fetch(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/rest/v1/schedule_items"))
        .and(query_param("project_id", "eq.p-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(seed_rows()))
        .mount(server)
        .await;
}

#[tokio::test]
async fn drag_commit_persists_position_updates() {
    let mock_server = MockServer::start().await;
    mount_fetch(&mock_server).await;

    // [1,2] -> drag 1 to the end: both items change position.
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/schedule_items"))
        .respond_with(ResponseTemplate::new(204))
        .expect(2)
        .mount(&mock_server)
        .await;

    let panel = SchedulePanel::new(&mock_server.uri(), "fake-key", "p-1");
    let mut engine = panel.engine().await.expect("load schedule");

    let outcome = engine
        .commit_drop(DropTarget {
            items: vec![1],
            date: "2024-05-06".parse().expect("date"),
            index: 2,
        })
        .await
        .expect("commit");

    assert_eq!(outcome, CommitOutcome::Persisted);
    let order: Vec<i64> = engine
        .board()
        .bucket("2024-05-06".parse().expect("date"))
        .iter()
        .map(|item| item.id)
        .collect();
    assert_eq!(order, vec![2, 1]);
}

#[tokio::test]
async fn failed_persist_snaps_back_to_store_truth() {
    let mock_server = MockServer::start().await;
    mount_fetch(&mock_server).await;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/schedule_items"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({
            "code": "XX000",
            "message": "simulated outage",
            "details": null,
            "hint": null
        })))
        .mount(&mock_server)
        .await;

    let panel = SchedulePanel::new(&mock_server.uri(), "fake-key", "p-1");
    let mut engine = panel.engine().await.expect("load schedule");

    let outcome = engine
        .commit_drop(DropTarget {
            items: vec![1],
            date: "2024-05-06".parse().expect("date"),
            index: 2,
        })
        .await
        .expect("commit reports an outcome, not an error");

    assert_eq!(outcome, CommitOutcome::Reverted);
    // The board matches a fresh fetch: no optimistic leftovers.
    let order: Vec<i64> = engine
        .board()
        .bucket("2024-05-06".parse().expect("date"))
        .iter()
        .map(|item| item.id)
        .collect();
    assert_eq!(order, vec![1, 2]);
}

#[tokio::test]
async fn cross_bucket_move_patches_date_and_positions() {
    let mock_server = MockServer::start().await;
    mount_fetch(&mock_server).await;

    // Moving 1 into 2024-05-07 at slot 0: patches for 2 (source renumber),
    // 1 (new date + position), and 3 (displaced).
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/schedule_items"))
        .respond_with(ResponseTemplate::new(204))
        .expect(3)
        .mount(&mock_server)
        .await;

    let panel = SchedulePanel::new(&mock_server.uri(), "fake-key", "p-1");
    let mut engine = panel.engine().await.expect("load schedule");

    let outcome = engine
        .commit_drop(DropTarget {
            items: vec![1],
            date: "2024-05-07".parse().expect("date"),
            index: 0,
        })
        .await
        .expect("commit");

    assert_eq!(outcome, CommitOutcome::Persisted);
    let dest: Vec<i64> = engine
        .board()
        .bucket("2024-05-07".parse().expect("date"))
        .iter()
        .map(|item| item.id)
        .collect();
    assert_eq!(dest, vec![1, 3]);
}

#[tokio::test]
async fn detach_deletes_items_and_annotations() {
    let mock_server = MockServer::start().await;
    mount_fetch(&mock_server).await;

    Mock::given(method("DELETE"))
        .and(path("/rest/v1/item_annotations"))
        .and(query_param("item_id", "in.(1)"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/rest/v1/schedule_items"))
        .and(query_param("id", "in.(1)"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&mock_server)
        .await;
    // Item 2 shifts from position 1 to 0.
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/schedule_items"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&mock_server)
        .await;

    let panel = SchedulePanel::new(&mock_server.uri(), "fake-key", "p-1");
    let mut engine = panel.engine().await.expect("load schedule");

    let outcome = engine.detach(&[1]).await.expect("detach");

    assert_eq!(outcome, CommitOutcome::Persisted);
    let order: Vec<i64> = engine
        .board()
        .bucket("2024-05-06".parse().expect("date"))
        .iter()
        .map(|item| item.id)
        .collect();
    assert_eq!(order, vec![2]);
}
