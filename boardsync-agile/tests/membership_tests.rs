//! Board-membership probing and issue-board resolution.

mod support;

use std::collections::HashSet;
use std::time::Duration;

use boardsync_agile::SearchScope;
use boardsync_core::checkpoint::BOARD_LIST_KEY;
use boardsync_core::CheckpointStore;

use support::*;

fn seed_board_list(h: &Harness, key: &str, boards: &[&str]) {
    let boards: Vec<String> = boards.iter().map(|b| b.to_string()).collect();
    h.store.append_unique(key, &boards).expect("seed");
}

#[tokio::test]
async fn probes_every_candidate_concurrently_and_returns_hits() {
    let t = FixtureTransport::new();
    t.ok("/board/1/issue", issues_page(0, vec![]));
    t.ok("/board/2/issue", issues_page(1, vec![issue("7", "100", "1")]));
    t.status("/board/3/issue", 404);
    t.set_delay(Duration::from_millis(50));

    let h = harness(t, false);
    seed_board_list(&h, BOARD_LIST_KEY, &["1", "2", "3"]);

    let found = h
        .exporter
        .find_boards_for_issue("APP-7", &SearchScope::All { ignore: HashSet::new() })
        .await
        .expect("probe");
    assert_eq!(found, vec!["2"]);
    assert_eq!(h.transport.requests().len(), 3);
    for board in ["1", "2", "3"] {
        assert_eq!(h.transport.count(&format!("/board/{board}/issue")), 1);
    }
    assert_eq!(h.transport.peak_in_flight(), 3, "probes should overlap");
}

#[tokio::test]
async fn results_keep_candidate_order() {
    let t = FixtureTransport::new();
    for board in ["5", "6", "7"] {
        t.ok(&format!("/board/{board}/issue"), issues_page(1, vec![issue("7", "100", "1")]));
    }
    let h = harness(t, false);
    seed_board_list(&h, BOARD_LIST_KEY, &["7", "5", "6"]);

    let found = h
        .exporter
        .find_boards_for_issue("APP-7", &SearchScope::All { ignore: HashSet::new() })
        .await
        .expect("probe");
    assert_eq!(found, vec!["7", "5", "6"]);
}

#[tokio::test]
async fn empty_scope_makes_no_requests() {
    let h = harness(FixtureTransport::new(), false);
    let found = h
        .exporter
        .find_boards_for_issue("APP-7", &SearchScope::Project("100".into()))
        .await
        .expect("probe");
    assert!(found.is_empty());
    assert!(h.transport.requests().is_empty());
}

#[tokio::test]
async fn ignored_boards_are_not_probed() {
    let t = FixtureTransport::new();
    t.ok("/board/2/issue", issues_page(1, vec![issue("7", "100", "1")]));
    let h = harness(t, false);
    seed_board_list(&h, BOARD_LIST_KEY, &["1", "2"]);

    let ignore: HashSet<String> = ["1".to_string()].into_iter().collect();
    let found = h
        .exporter
        .find_boards_for_issue("APP-7", &SearchScope::All { ignore })
        .await
        .expect("probe");
    assert_eq!(found, vec!["2"]);
    assert_eq!(h.transport.count("/board/1/issue"), 0);
}

#[tokio::test]
async fn probe_failure_is_reported() {
    let t = FixtureTransport::new();
    t.status("/board/1/issue", 500);
    let h = harness(t, false);
    seed_board_list(&h, BOARD_LIST_KEY, &["1"]);

    let err = h
        .exporter
        .find_boards_for_issue("APP-7", &SearchScope::All { ignore: HashSet::new() })
        .await
        .unwrap_err();
    assert!(err.to_string().contains("/board/1/issue"), "got: {err}");
}

#[tokio::test]
async fn issue_boards_fall_back_to_all_known_boards() {
    let t = FixtureTransport::new();
    t.ok("/board/1/issue", issues_page(0, vec![]));
    t.ok("/board/2/issue", issues_page(1, vec![issue("7", "100", "1")]));
    t.ok("/board/3/issue", issues_page(0, vec![]));
    let h = harness(t, false);
    seed_board_list(&h, BOARD_LIST_KEY, &["1", "2", "3"]);
    seed_board_list(&h, "projectboardlist:100", &["1"]);

    let found = h
        .exporter
        .update_issue_boards("APP-7", Some("100"), false)
        .await
        .expect("resolve");
    assert_eq!(found, vec!["2"]);
    assert_eq!(h.transport.count("/board/1/issue"), 1, "project board probed once");
    assert_eq!(h.transport.count("/board/3/issue"), 1);
}

#[tokio::test]
async fn issue_boards_stop_at_project_hits() {
    let t = FixtureTransport::new();
    t.ok("/board/1/issue", issues_page(1, vec![issue("7", "100", "1")]));
    let h = harness(t, false);
    seed_board_list(&h, BOARD_LIST_KEY, &["1", "2"]);
    seed_board_list(&h, "projectboardlist:100", &["1"]);

    let found = h
        .exporter
        .update_issue_boards("APP-7", Some("100"), false)
        .await
        .expect("resolve");
    assert_eq!(found, vec!["1"]);
    assert_eq!(h.transport.count("/board/2/issue"), 0);
}

#[tokio::test]
async fn reexport_refreshes_found_boards() {
    let t = FixtureTransport::new();
    t.ok("/board", boards_page(vec![board(2, "Beta", "kanban", "APP", 100)], true));
    t.ok("/board/2/configuration", config(&[("To Do", &["1"])]));
    // the probe and the kanban listing share a path; both see issue 7
    t.ok("/board/2/issue", issues_page(1, vec![issue("7", "100", "1")]));
    let h = harness(t, false);
    seed_board_list(&h, BOARD_LIST_KEY, &["2"]);

    let found = h
        .exporter
        .update_issue_boards("APP-7", None, true)
        .await
        .expect("resolve");
    assert_eq!(found, vec!["2"]);

    let records = h.sink.records();
    assert_eq!(kanbans(&records).len(), 1);
    assert_eq!(boards(&records).len(), 1);
    assert_eq!(
        boardsync_core::checkpoint::get_string_list(&*h.store, "issue_board:7").expect("list"),
        vec!["2"]
    );
}
