//! CHIPSTAKE ledger: node registry, chip shares, unbonding queues, epoch
//! rewards and slashing, applied as serial atomic transactions.

#![forbid(unsafe_code)]
#![warn(clippy::all)]

pub mod audit;
pub mod chip;
pub mod command;
pub mod events;
pub mod ledger;
pub mod math;
pub mod node;
pub mod params;
pub mod requests;
pub mod rewards;
pub mod roles;
pub mod slashing;
pub mod staking;
pub mod token;
pub mod withdrawal;


pub use audit::AuditReport;
pub use chip::{Chip, ChipInfo, StakeQuote};
pub use command::{Command, CommandOutput, Receipt, Transaction, TxContext};
pub use events::{EventFilter, EventLog, EventRecord, LedgerEvent, Topic};
pub use ledger::{Ledger, PoolInfo};
pub use node::{NewNode, Node};
pub use params::{Genesis, GenesisBalance, ProtocolParams};
pub use requests::{UnstakeRequest, WithdrawalRequest};
pub use rewards::RewardBatch;
pub use roles::Roles;
pub use slashing::SlashOutcome;
pub use token::TokenBalances;
