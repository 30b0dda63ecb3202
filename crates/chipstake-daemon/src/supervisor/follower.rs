use super::CancellationToken;
use crate::service::LedgerService;
use chipstake_ledger::{EventFilter, EventRecord};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

pub const DEFAULT_FOLLOW_CAPACITY: usize = 256;
pub const DEFAULT_FOLLOW_BATCH: usize = 64;

/// Why a follower stopped, and where it got to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FollowerExit {
    Cancelled { cursor: u64 },
    ReceiverClosed { cursor: u64 },
    LedgerClosed { cursor: u64 },
}

/// Streams event records from a cursor onwards into a bounded channel,
/// waking on each commit. A slow receiver applies backpressure instead of
/// dropping records.
pub struct EventFollower {
    service: Arc<LedgerService>,
    cursor: u64,
    batch: usize,
    filter: EventFilter,
}

impl EventFollower {
    pub fn new(service: Arc<LedgerService>, from: u64) -> Self {
        Self {
            service,
            cursor: from,
            batch: DEFAULT_FOLLOW_BATCH,
            filter: EventFilter::default(),
        }
    }

    pub fn with_filter(mut self, filter: EventFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_batch(mut self, batch: usize) -> Self {
        self.batch = batch.max(1);
        self
    }

    pub fn spawn(
        self,
        capacity: usize,
        cancel: CancellationToken,
    ) -> (mpsc::Receiver<EventRecord>, JoinHandle<FollowerExit>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let handle = tokio::spawn(self.run(tx, cancel));
        (rx, handle)
    }

    async fn next_batch(&self) -> Vec<EventRecord> {
        let ledger = self.service.read().await;
        ledger.events_since(self.cursor, self.batch).to_vec()
    }

    pub async fn run(mut self, tx: mpsc::Sender<EventRecord>, mut cancel: CancellationToken) -> FollowerExit {
        let mut head = self.service.subscribe_head();
        debug!("Event follower starting at seq {}", self.cursor);

        loop {
            head.borrow_and_update();

            loop {
                let records = self.next_batch().await;
                if records.is_empty() {
                    break;
                }
                for record in records {
                    self.cursor = record.seq + 1;
                    if !self.filter.matches(&record) {
                        continue;
                    }
                    tokio::select! {
                        sent = tx.send(record) => {
                            if sent.is_err() {
                                return FollowerExit::ReceiverClosed { cursor: self.cursor };
                            }
                        }
                        _ = cancel.cancelled() => {
                            return FollowerExit::Cancelled { cursor: self.cursor };
                        }
                    }
                }
            }

            tokio::select! {
                changed = head.changed() => {
                    if changed.is_err() {
                        return FollowerExit::LedgerClosed { cursor: self.cursor };
                    }
                }
                _ = cancel.cancelled() => {
                    return FollowerExit::Cancelled { cursor: self.cursor };
                }
                _ = tx.closed() => {
                    return FollowerExit::ReceiverClosed { cursor: self.cursor };
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::*;
    use chipstake_ledger::Command;
    use chipstake_types::ONE_TOKEN;
    use std::time::Duration;

    async fn recv(rx: &mut mpsc::Receiver<EventRecord>) -> EventRecord {
        tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("follower stalled")
            .expect("channel closed")
    }

    #[tokio::test]
    async fn test_follower_replays_then_tails() {
        let service = service();
        service.submit(tx(ADMIN, 1, create_node(OPERATOR, 500))).await.unwrap();

        let (handle, token) = CancellationToken::new();
        let (mut rx, task) = EventFollower::new(service.clone(), 0).spawn(4, token);

        let first = recv(&mut rx).await;
        assert_eq!(first.seq, 0);
        assert_eq!(first.event.name(), "NodeCreated");

        service
            .submit(tx(ALICE, 2, Command::Transfer { to: addr(BOB), amount: ONE_TOKEN }))
            .await
            .unwrap();
        let second = recv(&mut rx).await;
        assert_eq!(second.seq, 1);

        handle.cancel();
        assert_eq!(task.await.unwrap(), FollowerExit::Cancelled { cursor: 2 });
    }

    #[tokio::test]
    async fn test_follower_applies_filter() {
        let service = service();
        service.submit(tx(ADMIN, 1, create_node(OPERATOR, 500))).await.unwrap();
        service
            .submit(tx(ALICE, 2, Command::Transfer { to: addr(BOB), amount: ONE_TOKEN }))
            .await
            .unwrap();

        let (_handle, token) = CancellationToken::new();
        let follower = EventFollower::new(service.clone(), 0)
            .with_filter(EventFilter::default().kind("Transfer"));
        let (mut rx, _task) = follower.spawn(4, token);

        let record = recv(&mut rx).await;
        assert_eq!(record.seq, 1);
        assert_eq!(record.event.name(), "Transfer");
    }

    #[tokio::test]
    async fn test_follower_drains_backlog_in_small_batches() {
        let service = service();
        service.submit(tx(ADMIN, 1, create_node(OPERATOR, 500))).await.unwrap();
        for ts in 2..4 {
            service
                .submit(tx(ALICE, ts, Command::Transfer { to: addr(BOB), amount: ONE_TOKEN }))
                .await
                .unwrap();
        }

        let (_handle, token) = CancellationToken::new();
        let (mut rx, _task) = EventFollower::new(service.clone(), 0).with_batch(1).spawn(1, token);
        let seqs = vec![recv(&mut rx).await.seq, recv(&mut rx).await.seq, recv(&mut rx).await.seq];
        assert_eq!(seqs, vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn test_follower_stops_when_receiver_dropped() {
        let service = service();
        let (_handle, token) = CancellationToken::new();
        let (rx, task) = EventFollower::new(service.clone(), 0).spawn(1, token);
        drop(rx);

        let exit = tokio::time::timeout(Duration::from_secs(2), task)
            .await
            .expect("follower did not stop")
            .unwrap();
        assert_eq!(exit, FollowerExit::ReceiverClosed { cursor: 0 });
    }
}
