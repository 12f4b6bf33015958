// Copyright 2024 RustFS Team
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use async_trait::async_trait;
use chrono::Utc;
use rustfs_healctl::heal::HealthClass;
use rustfs_healctl::{
    AdminClient, AdminError, AggregateState, ErrorKind, FailureReason, HealOptions, HealReply, HealRequest, HealScope,
    Outcome, ScanIntensity, SequenceController, SequenceState,
};
use rustfs_madmin::heal_commands::{
    BgHealState, DRIVE_STATE_MISSING, DRIVE_STATE_OK, HEAL_FINISHED_STATUS, HEAL_ITEM_BUCKET, HEAL_ITEM_OBJECT,
    HEAL_RUNNING_STATUS, HEAL_STOPPED_STATUS, HealDriveInfo, HealResultItem, HealScanMode, HealTaskStatus, Infos,
};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;

const TOKEN: &str = "0d5e1b4c-heal-token";

/// Replays canned replies in order; blocks forever once the script runs out.
#[derive(Default)]
struct ScriptedClient {
    replies: Mutex<VecDeque<Result<HealReply, AdminError>>>,
    requests: Mutex<Vec<HealRequest>>,
    background_calls: AtomicUsize,
    background_fails: bool,
}

impl ScriptedClient {
    fn new(replies: Vec<Result<HealReply, AdminError>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            ..Default::default()
        }
    }

    fn requests(&self) -> Vec<HealRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl AdminClient for ScriptedClient {
    async fn heal(&self, request: &HealRequest) -> Result<HealReply, AdminError> {
        self.requests.lock().unwrap().push(request.clone());
        let next = self.replies.lock().unwrap().pop_front();
        match next {
            Some(reply) => reply,
            None => std::future::pending().await,
        }
    }

    async fn background_heal_status(&self) -> Result<BgHealState, AdminError> {
        self.background_calls.fetch_add(1, Ordering::SeqCst);
        if self.background_fails {
            return Err(AdminError::Transport("connection refused".to_string()));
        }
        Ok(BgHealState {
            scanned_items_count: 42,
            last_heal_activity: Utc::now(),
        })
    }
}

fn drives(ok: usize, missing: usize) -> Infos {
    let state = |s: &str| HealDriveInfo {
        state: s.to_string(),
        ..Default::default()
    };
    Infos {
        drives: std::iter::repeat_n(state(DRIVE_STATE_OK), ok)
            .chain(std::iter::repeat_n(state(DRIVE_STATE_MISSING), missing))
            .collect(),
    }
}

/// Object on a 4+2 erasure set.
fn object(name: &str, before_ok: usize, after_ok: usize) -> HealResultItem {
    HealResultItem {
        heal_item_type: HEAL_ITEM_OBJECT.to_string(),
        bucket: "bucket".to_string(),
        object: name.to_string(),
        data_blocks: 4,
        parity_blocks: 2,
        disk_count: 6,
        set_count: 1,
        before: drives(before_ok, 6 - before_ok),
        after: drives(after_ok, 6 - after_ok),
        object_size: 1024,
        ..Default::default()
    }
}

fn bucket_item() -> HealResultItem {
    HealResultItem {
        heal_item_type: HEAL_ITEM_BUCKET.to_string(),
        bucket: "bucket".to_string(),
        disk_count: 6,
        set_count: 1,
        before: drives(6, 0),
        after: drives(6, 0),
        ..Default::default()
    }
}

fn started() -> Result<HealReply, AdminError> {
    let mut reply = HealReply::default();
    reply.start.client_token = TOKEN.to_string();
    reply.start.start_time = Some(Utc::now());
    Ok(reply)
}

fn status(summary: &str, items: Vec<HealResultItem>) -> Result<HealReply, AdminError> {
    Ok(HealReply {
        status: HealTaskStatus {
            summary: summary.to_string(),
            items,
            ..Default::default()
        },
        ..Default::default()
    })
}

fn batches() -> Vec<Vec<HealResultItem>> {
    vec![
        vec![bucket_item(), object("a", 6, 6)],
        vec![],
        vec![object("b", 4, 6), object("c", 3, 4), object("d", 3, 3)],
    ]
}

/// Start reply, one running status per batch, then a finished status.
fn script(batches: Vec<Vec<HealResultItem>>) -> Vec<Result<HealReply, AdminError>> {
    let mut replies = vec![started()];
    replies.extend(batches.into_iter().map(|b| status(HEAL_RUNNING_STATUS, b)));
    replies.push(status(HEAL_FINISHED_STATUS, vec![]));
    replies
}

fn scope(locator: &str) -> HealScope {
    HealScope::parse(locator).unwrap()
}

fn recursive() -> HealOptions {
    HealOptions {
        recursive: true,
        ..Default::default()
    }
}

async fn run(ctl: &mut SequenceController<Arc<ScriptedClient>>) -> rustfs_healctl::Result<Outcome> {
    ctl.run(&mut |_: &AggregateState, _: &[HealResultItem]| {}).await
}

fn completed_aggregate(outcome: Outcome) -> AggregateState {
    match outcome {
        Outcome::Completed { aggregate, .. } => aggregate,
        other => panic!("expected a completed heal, got {other:?}"),
    }
}

#[tokio::test]
async fn test_alias_only_queries_background_status_once() {
    let client = Arc::new(ScriptedClient::default());
    let mut ctl = SequenceController::new(client.clone(), scope("myrustfs"), HealOptions::default());

    let outcome = run(&mut ctl).await.unwrap();

    match outcome {
        Outcome::Background(state) => assert_eq!(state.scanned_items_count, 42),
        other => panic!("unexpected outcome {other:?}"),
    }
    assert_eq!(client.background_calls.load(Ordering::SeqCst), 1);
    assert!(client.requests().is_empty());
}

#[tokio::test]
async fn test_background_failure_is_transport_error() {
    let client = Arc::new(ScriptedClient {
        background_fails: true,
        ..Default::default()
    });
    let mut ctl = SequenceController::new(client.clone(), scope("myrustfs"), HealOptions::default());

    let err = run(&mut ctl).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Transport);
    assert_eq!(err.message, "Failed to get the status of the background heal.");
    assert_eq!(ctl.state(), SequenceState::Failed);
}

#[tokio::test]
async fn test_force_stop_sends_exactly_one_request() {
    for force_start in [false, true] {
        let client = Arc::new(ScriptedClient::new(vec![started()]));
        let mut ctl = SequenceController::new(client.clone(), scope("myrustfs/bucket/"), recursive())
            .with_force_start(force_start)
            .with_force_stop(true);

        let outcome = run(&mut ctl).await.unwrap();

        match outcome {
            Outcome::Stopped { alias } => assert_eq!(alias, "myrustfs/bucket/"),
            other => panic!("unexpected outcome {other:?}"),
        }
        let requests = client.requests();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].force_stop);
        assert_eq!(requests[0].force_start, force_start);
        assert!(requests[0].client_token.is_empty());
        assert_eq!(client.background_calls.load(Ordering::SeqCst), 0);
    }
}

#[tokio::test]
async fn test_force_stop_on_alias_skips_background_status() {
    let client = Arc::new(ScriptedClient::new(vec![started()]));
    let mut ctl = SequenceController::new(client.clone(), scope("myrustfs"), HealOptions::default()).with_force_stop(true);

    assert!(matches!(run(&mut ctl).await.unwrap(), Outcome::Stopped { .. }));
    assert_eq!(client.requests().len(), 1);
    assert_eq!(client.background_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_deep_recursive_heal_polls_until_finished() {
    let client = Arc::new(ScriptedClient::new(script(batches())));
    let options = HealOptions {
        scan_intensity: ScanIntensity::Deep,
        recursive: true,
        ..Default::default()
    };
    let mut ctl = SequenceController::new(client.clone(), scope("myrustfs/bucket"), options);

    let aggregate = completed_aggregate(run(&mut ctl).await.unwrap());

    let requests = client.requests();
    assert_eq!(requests.len(), 5);
    assert!(requests[0].client_token.is_empty());
    assert_eq!(requests[0].opts.scan_mode, HealScanMode::Deep);
    assert!(requests[0].opts.recursive);
    assert_eq!(requests[0].bucket, "bucket");
    assert!(requests[1..].iter().all(|r| r.client_token == TOKEN && r.is_status_query()));

    assert_eq!(aggregate.items_scanned, 5);
    assert_eq!(aggregate.objects_scanned, 4);
    assert_eq!(aggregate.objects_healed, 2);
    assert_eq!(aggregate.bytes_scanned, 4 * 1024);
    assert_eq!(aggregate.health_count(HealthClass::Green), 3);
    assert_eq!(aggregate.health_count(HealthClass::Red), 1);
    assert_eq!(aggregate.health_count(HealthClass::Grey), 1);
    assert_eq!(aggregate.online_drive_count(6), 3);
    assert_eq!(ctl.state(), SequenceState::Completed);
}

#[tokio::test]
async fn test_dry_run_is_sent_and_counts_the_same() {
    let mut totals = Vec::new();
    for dry_run in [false, true] {
        let client = Arc::new(ScriptedClient::new(script(batches())));
        let options = HealOptions { dry_run, ..recursive() };
        let mut ctl = SequenceController::new(client.clone(), scope("myrustfs/bucket"), options);

        totals.push(completed_aggregate(run(&mut ctl).await.unwrap()));
        assert_eq!(client.requests()[0].opts.dry_run, dry_run);
    }
    assert_eq!(totals[0], totals[1]);
}

#[tokio::test]
async fn test_batch_order_does_not_change_totals() {
    let mut reordered = batches();
    reordered.rotate_left(1);
    reordered[1].reverse();

    let mut totals = Vec::new();
    for order in [batches(), reordered] {
        let client = Arc::new(ScriptedClient::new(script(order)));
        let mut ctl = SequenceController::new(client.clone(), scope("myrustfs/bucket"), recursive());
        totals.push(completed_aggregate(run(&mut ctl).await.unwrap()));
    }
    assert_eq!(totals[0], totals[1]);
}

#[tokio::test]
async fn test_observer_sees_growing_totals() {
    let client = Arc::new(ScriptedClient::new(script(batches())));
    let mut ctl = SequenceController::new(client.clone(), scope("myrustfs/bucket"), recursive());

    let mut seen = Vec::new();
    let mut observer = |aggregate: &AggregateState, batch: &[HealResultItem]| {
        seen.push((aggregate.items_scanned, batch.len()));
    };
    ctl.run(&mut observer).await.unwrap();

    // Start reply first, then every status reply including the final one.
    assert_eq!(seen, vec![(0, 0), (2, 2), (2, 0), (5, 3), (5, 0)]);
}

#[tokio::test]
async fn test_token_mismatch_fails_with_partial_totals() {
    let mut replies = vec![started(), status(HEAL_RUNNING_STATUS, vec![object("a", 6, 6)])];
    replies.push(Err(AdminError::TokenMismatch {
        token: TOKEN.to_string(),
        message: "Client token mismatch".to_string(),
    }));
    let client = Arc::new(ScriptedClient::new(replies));
    let mut ctl = SequenceController::new(client.clone(), scope("myrustfs/bucket"), recursive());

    match run(&mut ctl).await.unwrap() {
        Outcome::Failed {
            reason: FailureReason::TokenInvalidated { token, .. },
            aggregate,
        } => {
            assert_eq!(token, TOKEN);
            assert_eq!(aggregate.items_scanned, 1);
        }
        other => panic!("unexpected outcome {other:?}"),
    }
    assert_eq!(ctl.state(), SequenceState::Failed);
}

#[tokio::test]
async fn test_stopped_sequence_reports_server_detail() {
    let mut stopped = status(HEAL_STOPPED_STATUS, vec![object("a", 3, 3)]).unwrap();
    stopped.status.failure_detail = "drive /data/rustfs3 is offline".to_string();
    let client = Arc::new(ScriptedClient::new(vec![started(), Ok(stopped)]));
    let mut ctl = SequenceController::new(client.clone(), scope("myrustfs/bucket/dir"), recursive());

    let Outcome::Failed { reason, aggregate } = run(&mut ctl).await.unwrap() else {
        panic!("expected a failed heal");
    };
    assert_eq!(aggregate.items_scanned, 1);
    assert!(matches!(&reason, FailureReason::Sequence { detail, .. } if detail == "drive /data/rustfs3 is offline"));

    let err = reason.into_error("myrustfs/bucket/dir");
    assert_eq!(err.kind, ErrorKind::Sequence);
    assert_eq!(err.message, "Heal had an error - drive /data/rustfs3 is offline");
    assert_eq!(err.context[0], "myrustfs/bucket/dir");
}

#[tokio::test]
async fn test_transport_error_while_polling() {
    let replies = vec![started(), Err(AdminError::Transport("connection reset by peer".to_string()))];
    let client = Arc::new(ScriptedClient::new(replies));
    let mut ctl = SequenceController::new(client.clone(), scope("myrustfs/bucket"), recursive());

    let outcome = run(&mut ctl).await.unwrap();
    assert!(matches!(outcome, Outcome::Failed { reason: FailureReason::Transport(_), .. }));
    assert!(!outcome.is_success());
}

#[tokio::test]
async fn test_start_rejection_is_an_error() {
    let client = Arc::new(ScriptedClient::new(vec![Err(AdminError::Api {
        status: 409,
        code: "XRustFSHealAlreadyRunning".to_string(),
        message: "Heal is already running on the given path".to_string(),
    })]));
    let mut ctl = SequenceController::new(client.clone(), scope("myrustfs/bucket"), recursive());

    let err = run(&mut ctl).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Sequence);
    assert_eq!(err.message, "Failed to start heal sequence.");
    assert_eq!(client.requests().len(), 1);
}

#[tokio::test]
async fn test_cancellation_detaches_with_resume_hint() {
    let cancel = CancellationToken::new();
    // Script ends after the first batch, so the next status query never returns.
    let client = Arc::new(ScriptedClient::new(vec![started(), status(HEAL_RUNNING_STATUS, vec![object("a", 6, 6)])]));
    let mut ctl = SequenceController::new(client.clone(), scope("myrustfs/bucket/dir/"), recursive())
        .with_cancellation(cancel.clone())
        .with_program_name("rustfs-healctl");

    let mut observer = |aggregate: &AggregateState, _: &[HealResultItem]| {
        if aggregate.items_scanned == 1 {
            cancel.cancel();
        }
    };
    let outcome = ctl.run(&mut observer).await.unwrap();

    match outcome {
        Outcome::Detached { aggregate, resume_hint } => {
            assert_eq!(aggregate.items_scanned, 1);
            assert!(resume_hint.ends_with("`rustfs-healctl --recursive myrustfs/bucket/dir/`"));
        }
        other => panic!("unexpected outcome {other:?}"),
    }
    assert_eq!(ctl.state(), SequenceState::Detached);
}
