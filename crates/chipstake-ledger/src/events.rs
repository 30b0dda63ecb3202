use chipstake_types::{ChipId, EpochNumber, EthAddress, NodeId, RequestId, Role};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Indexed event field, the analogue of an EVM log topic.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Topic {
    Address(EthAddress),
    Chip(ChipId),
    Request(RequestId),
    Epoch(EpochNumber),
    Role(Role),
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Topic::Address(a) => write!(f, "{}", a),
            Topic::Chip(c) => write!(f, "{}", c),
            Topic::Request(r) => write!(f, "{}", r),
            Topic::Epoch(e) => write!(f, "{}", e),
            Topic::Role(r) => write!(f, "{}", r),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerEvent {
    NodeCreated {
        node_id: NodeId,
        account: EthAddress,
        name: String,
        tax_rate_basis_points: u64,
        public_good: bool,
        alpha: bool,
    },
    NodeDeleted {
        node_id: NodeId,
        account: EthAddress,
    },
    NodeTaxRateBasisPointsSet {
        account: EthAddress,
        tax_rate_basis_points: u64,
    },
    PublicPoolTaxRateBasisPointsSet {
        tax_rate_basis_points: u64,
    },
    Deposited {
        node: EthAddress,
        from: EthAddress,
        amount: u128,
    },
    Staked {
        user: EthAddress,
        node: EthAddress,
        amount: u128,
        start_token_id: ChipId,
        end_token_id: ChipId,
    },
    ChipTransferred {
        from: EthAddress,
        to: EthAddress,
        token_id: ChipId,
    },
    UnstakeRequested {
        request_id: RequestId,
        owner: EthAddress,
        node: EthAddress,
        chip_ids: Vec<ChipId>,
        amount: u128,
    },
    UnstakeClaimed {
        request_id: RequestId,
        owner: EthAddress,
        amount: u128,
    },
    WithdrawRequested {
        request_id: RequestId,
        node: EthAddress,
        amount: u128,
    },
    WithdrawalClaimed {
        request_id: RequestId,
        owner: EthAddress,
        amount: u128,
    },
    RewardDistributed {
        epoch: EpochNumber,
        start_timestamp: u64,
        end_timestamp: u64,
        nodes: Vec<EthAddress>,
        request_counts: Vec<u64>,
        operation_rewards: Vec<u128>,
        staking_rewards: Vec<u128>,
        tax_amounts: Vec<u128>,
    },
    PublicGoodRewardDistributed {
        epoch: EpochNumber,
        reward: u128,
        tax: u128,
    },
    NodeSlashed {
        node: EthAddress,
        operation_pool: u128,
        staking_pool: u128,
    },
    Paused {
        account: EthAddress,
    },
    Unpaused {
        account: EthAddress,
    },
    RoleGranted {
        role: Role,
        account: EthAddress,
        sender: EthAddress,
    },
    RoleRevoked {
        role: Role,
        account: EthAddress,
        sender: EthAddress,
    },
    Transfer {
        from: EthAddress,
        to: EthAddress,
        amount: u128,
    },
}

impl LedgerEvent {
    pub fn name(&self) -> &'static str {
        match self {
            LedgerEvent::NodeCreated { .. } => "NodeCreated",
            LedgerEvent::NodeDeleted { .. } => "NodeDeleted",
            LedgerEvent::NodeTaxRateBasisPointsSet { .. } => "NodeTaxRateBasisPointsSet",
            LedgerEvent::PublicPoolTaxRateBasisPointsSet { .. } => "PublicPoolTaxRateBasisPointsSet",
            LedgerEvent::Deposited { .. } => "Deposited",
            LedgerEvent::Staked { .. } => "Staked",
            LedgerEvent::ChipTransferred { .. } => "ChipTransferred",
            LedgerEvent::UnstakeRequested { .. } => "UnstakeRequested",
            LedgerEvent::UnstakeClaimed { .. } => "UnstakeClaimed",
            LedgerEvent::WithdrawRequested { .. } => "WithdrawRequested",
            LedgerEvent::WithdrawalClaimed { .. } => "WithdrawalClaimed",
            LedgerEvent::RewardDistributed { .. } => "RewardDistributed",
            LedgerEvent::PublicGoodRewardDistributed { .. } => "PublicGoodRewardDistributed",
            LedgerEvent::NodeSlashed { .. } => "NodeSlashed",
            LedgerEvent::Paused { .. } => "Paused",
            LedgerEvent::Unpaused { .. } => "Unpaused",
            LedgerEvent::RoleGranted { .. } => "RoleGranted",
            LedgerEvent::RoleRevoked { .. } => "RoleRevoked",
            LedgerEvent::Transfer { .. } => "Transfer",
        }
    }

    /// Indexed fields, in declaration order.
    pub fn topics(&self) -> Vec<Topic> {
        match self {
            LedgerEvent::NodeCreated { account, .. } => vec![Topic::Address(*account)],
            LedgerEvent::NodeDeleted { account, .. } => vec![Topic::Address(*account)],
            LedgerEvent::NodeTaxRateBasisPointsSet { account, .. } => vec![Topic::Address(*account)],
            LedgerEvent::PublicPoolTaxRateBasisPointsSet { .. } => vec![],
            LedgerEvent::Deposited { node, from, .. } => vec![Topic::Address(*node), Topic::Address(*from)],
            LedgerEvent::Staked { user, node, .. } => vec![Topic::Address(*user), Topic::Address(*node)],
            LedgerEvent::ChipTransferred { from, to, token_id } => {
                vec![Topic::Address(*from), Topic::Address(*to), Topic::Chip(*token_id)]
            }
            LedgerEvent::UnstakeRequested { request_id, owner, node, .. } => {
                vec![Topic::Request(*request_id), Topic::Address(*owner), Topic::Address(*node)]
            }
            LedgerEvent::UnstakeClaimed { request_id, owner, .. } => {
                vec![Topic::Request(*request_id), Topic::Address(*owner)]
            }
            LedgerEvent::WithdrawRequested { request_id, node, .. } => {
                vec![Topic::Request(*request_id), Topic::Address(*node)]
            }
            LedgerEvent::WithdrawalClaimed { request_id, owner, .. } => {
                vec![Topic::Request(*request_id), Topic::Address(*owner)]
            }
            LedgerEvent::RewardDistributed { epoch, .. } => vec![Topic::Epoch(*epoch)],
            LedgerEvent::PublicGoodRewardDistributed { epoch, .. } => vec![Topic::Epoch(*epoch)],
            LedgerEvent::NodeSlashed { node, .. } => vec![Topic::Address(*node)],
            LedgerEvent::Paused { .. } | LedgerEvent::Unpaused { .. } => vec![],
            LedgerEvent::RoleGranted { role, account, sender }
            | LedgerEvent::RoleRevoked { role, account, sender } => {
                vec![Topic::Role(*role), Topic::Address(*account), Topic::Address(*sender)]
            }
            LedgerEvent::Transfer { from, to, .. } => vec![Topic::Address(*from), Topic::Address(*to)],
        }
    }
}

/// An event as appended to the log.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    pub seq: u64,
    pub timestamp: u64,
    pub sender: EthAddress,
    pub event: LedgerEvent,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventFilter {
    pub kinds: Vec<String>,
    pub topic: Option<Topic>,
}

impl EventFilter {
    pub fn kind(mut self, name: impl Into<String>) -> Self {
        self.kinds.push(name.into());
        self
    }

    pub fn topic(mut self, topic: Topic) -> Self {
        self.topic = Some(topic);
        self
    }

    pub fn matches(&self, record: &EventRecord) -> bool {
        let kind_ok = self.kinds.is_empty() || self.kinds.iter().any(|k| k == record.event.name());
        let topic_ok = self
            .topic
            .map(|t| record.event.topics().contains(&t))
            .unwrap_or(true);
        kind_ok && topic_ok
    }
}

/// Append-only event log with a pull cursor.
#[derive(Clone, Debug, Default)]
pub struct EventLog {
    records: Vec<EventRecord>,
    next_seq: u64,
}

impl EventLog {
    /// Rebuilds a log from persisted records. Sequence numbers must be
    /// contiguous and start at the first record's value.
    pub fn from_records(records: Vec<EventRecord>) -> Option<Self> {
        let contiguous = records.windows(2).all(|w| w[1].seq == w[0].seq + 1);
        if !contiguous {
            return None;
        }
        let next_seq = records.last().map(|r| r.seq + 1).unwrap_or(0);
        Some(Self { records, next_seq })
    }

    pub fn append(&mut self, timestamp: u64, sender: EthAddress, event: LedgerEvent) -> &EventRecord {
        let record = EventRecord {
            seq: self.next_seq,
            timestamp,
            sender,
            event,
        };
        self.next_seq += 1;
        self.records.push(record);
        &self.records[self.records.len() - 1]
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn next_seq(&self) -> u64 {
        self.next_seq
    }

    fn start_index(&self, seq: u64) -> usize {
        self.records.partition_point(|r| r.seq < seq)
    }

    /// Records with `seq >= from`, at most `limit` of them.
    pub fn since(&self, from: u64, limit: usize) -> &[EventRecord] {
        let start = self.start_index(from);
        let end = start.saturating_add(limit).min(self.records.len());
        &self.records[start..end]
    }

    pub fn filter(&self, filter: &EventFilter, from: u64, limit: usize) -> Vec<&EventRecord> {
        self.records[self.start_index(from)..]
            .iter()
            .filter(|r| filter.matches(r))
            .take(limit)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn staked(user: u64, node: u64) -> LedgerEvent {
        LedgerEvent::Staked {
            user: EthAddress::from_low_u64(user),
            node: EthAddress::from_low_u64(node),
            amount: 1,
            start_token_id: ChipId(1),
            end_token_id: ChipId(1),
        }
    }

    #[test]
    fn test_cursor_pages_in_order() {
        let mut log = EventLog::default();
        for i in 0..5 {
            log.append(i, EthAddress::zero(), staked(10, 20));
        }
        let page = log.since(1, 2);
        assert_eq!(page.iter().map(|r| r.seq).collect::<Vec<_>>(), vec![1, 2]);
        assert!(log.since(9, 10).is_empty());
        assert_eq!(log.since(3, 100).len(), 2);
    }

    #[test]
    fn test_filter_by_kind_and_topic() {
        let mut log = EventLog::default();
        log.append(0, EthAddress::zero(), staked(10, 20));
        log.append(0, EthAddress::zero(), staked(11, 21));
        log.append(0, EthAddress::zero(), LedgerEvent::Paused { account: EthAddress::zero() });

        let by_kind = EventFilter::default().kind("Staked");
        assert_eq!(log.filter(&by_kind, 0, 10).len(), 2);

        let by_node = EventFilter::default().topic(Topic::Address(EthAddress::from_low_u64(21)));
        let hits = log.filter(&by_node, 0, 10);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].seq, 1);
    }

    #[test]
    fn test_from_records_rejects_gaps() {
        let mut log = EventLog::default();
        log.append(0, EthAddress::zero(), staked(1, 2));
        log.append(0, EthAddress::zero(), staked(1, 2));
        let mut records = log.since(0, 10).to_vec();
        let restored = EventLog::from_records(records.clone()).unwrap();
        assert_eq!(restored.next_seq(), 2);

        records[1].seq = 5;
        assert!(EventLog::from_records(records).is_none());
    }
}
