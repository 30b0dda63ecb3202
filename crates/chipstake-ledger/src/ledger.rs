use crate::chip::ChipLedger;
use crate::command::TxContext;
use crate::events::{EventFilter, EventLog, EventRecord, LedgerEvent};
use crate::node::{Node, NodeRegistry};
use crate::params::{Genesis, ProtocolParams};
use crate::requests::{RequestQueue, UnstakeRequest, WithdrawalRequest};
use crate::roles::Roles;
use crate::token::TokenBalances;
use chipstake_types::{EpochNumber, EthAddress, LedgerError, LedgerResult, Role};
use serde::{Deserialize, Serialize};
use tracing::info;

/// The whole protocol state. Mutated only through [`Ledger::apply`].
///
/// The event log is not part of the serialized form; persisted records are
/// re-attached with [`Ledger::attach_events`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Ledger {
    pub(crate) params: ProtocolParams,
    pub(crate) roles: Roles,
    pub(crate) paused: bool,
    pub(crate) last_timestamp: u64,
    pub(crate) current_epoch: EpochNumber,
    pub(crate) registry: NodeRegistry,
    pub(crate) public_pool: Node,
    pub(crate) chips: ChipLedger,
    pub(crate) unstake_requests: RequestQueue<UnstakeRequest>,
    pub(crate) withdrawal_requests: RequestQueue<WithdrawalRequest>,
    pub(crate) tokens: TokenBalances,
    #[serde(skip)]
    events: EventLog,
    #[serde(skip)]
    pending: Vec<LedgerEvent>,
}

/// Global summary served by the `pool` view.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolInfo {
    pub current_epoch: EpochNumber,
    pub paused: bool,
    pub node_count: usize,
    pub chip_count: usize,
    pub public_pool: Node,
    pub escrow: u128,
    pub treasury: EthAddress,
    pub treasury_balance: u128,
    pub initial_supply: u128,
    pub total_minted: u128,
    pub next_event_seq: u64,
}

impl Ledger {
    pub fn new(params: ProtocolParams, genesis: &Genesis) -> LedgerResult<Self> {
        params.validate()?;
        if genesis.admin.is_zero() {
            return Err(LedgerError::InvalidParams("genesis admin must be set".into()));
        }
        if genesis.treasury.is_zero() {
            return Err(LedgerError::InvalidParams("genesis treasury must be set".into()));
        }
        let public_rate = genesis.public_pool_tax_rate();
        if !public_rate.is_valid() || public_rate.0 < params.min_tax_rate_basis_points {
            return Err(LedgerError::InvalidParams(format!(
                "public pool tax rate {} out of range",
                public_rate
            )));
        }

        let mut roles = Roles::default();
        roles.grant(Role::DefaultAdmin, genesis.admin);
        for oracle in &genesis.oracles {
            roles.grant(Role::Oracle, *oracle);
        }
        for pauser in &genesis.pausers {
            roles.grant(Role::Pause, *pauser);
        }

        let mut tokens = TokenBalances::new(genesis.treasury);
        for entry in &genesis.balances {
            tokens.credit_genesis(entry.account, entry.amount)?;
        }

        info!(
            "Ledger initialised: admin {}, treasury {}, supply {}",
            genesis.admin,
            genesis.treasury,
            tokens.initial_supply()
        );
        Ok(Self {
            params,
            roles,
            paused: false,
            last_timestamp: 0,
            current_epoch: EpochNumber(0),
            registry: NodeRegistry::default(),
            public_pool: Node::public_pool(public_rate.0),
            chips: ChipLedger::default(),
            unstake_requests: RequestQueue::default(),
            withdrawal_requests: RequestQueue::default(),
            tokens,
            events: EventLog::default(),
            pending: Vec::new(),
        })
    }

    /// Replaces the in-memory event log with persisted records.
    pub fn attach_events(&mut self, records: Vec<EventRecord>) -> LedgerResult<()> {
        self.events = EventLog::from_records(records)
            .ok_or_else(|| LedgerError::InvalidParams("event log has sequence gaps".into()))?;
        Ok(())
    }

    pub(crate) fn emit(&mut self, event: LedgerEvent) {
        self.pending.push(event);
    }

    pub(crate) fn flush_events(&mut self, ctx: &TxContext) -> Vec<EventRecord> {
        let pending = std::mem::take(&mut self.pending);
        pending
            .into_iter()
            .map(|event| self.events.append(ctx.timestamp, ctx.sender, event).clone())
            .collect()
    }

    pub(crate) fn discard_events(&mut self) {
        self.pending.clear();
    }

    pub(crate) fn require_not_paused(&self) -> LedgerResult<()> {
        if self.paused {
            Err(LedgerError::EnforcedPause)
        } else {
            Ok(())
        }
    }

    pub(crate) fn pause(&mut self, ctx: &TxContext) -> LedgerResult<()> {
        self.roles.require(Role::Pause, &ctx.sender)?;
        self.require_not_paused()?;
        self.paused = true;
        self.emit(LedgerEvent::Paused { account: ctx.sender });
        info!("Ledger paused by {}", ctx.sender);
        Ok(())
    }

    pub(crate) fn unpause(&mut self, ctx: &TxContext) -> LedgerResult<()> {
        self.roles.require(Role::Pause, &ctx.sender)?;
        if !self.paused {
            return Err(LedgerError::ExpectedPause);
        }
        self.paused = false;
        self.emit(LedgerEvent::Unpaused { account: ctx.sender });
        info!("Ledger unpaused by {}", ctx.sender);
        Ok(())
    }

    pub(crate) fn grant_role(&mut self, ctx: &TxContext, role: Role, account: EthAddress) -> LedgerResult<()> {
        self.roles.require(Role::DefaultAdmin, &ctx.sender)?;
        if self.roles.grant(role, account) {
            self.emit(LedgerEvent::RoleGranted {
                role,
                account,
                sender: ctx.sender,
            });
            info!("{} granted {}", account, role);
        }
        Ok(())
    }

    pub(crate) fn revoke_role(&mut self, ctx: &TxContext, role: Role, account: EthAddress) -> LedgerResult<()> {
        self.roles.require(Role::DefaultAdmin, &ctx.sender)?;
        if self.roles.revoke(role, &account) {
            self.emit(LedgerEvent::RoleRevoked {
                role,
                account,
                sender: ctx.sender,
            });
            info!("{} revoked from {}", role, account);
        }
        Ok(())
    }

    pub(crate) fn transfer(&mut self, ctx: &TxContext, to: EthAddress, amount: u128) -> LedgerResult<()> {
        self.require_not_paused()?;
        self.tokens.transfer(&ctx.sender, &to, amount)?;
        self.emit(LedgerEvent::Transfer {
            from: ctx.sender,
            to,
            amount,
        });
        Ok(())
    }

    pub fn params(&self) -> &ProtocolParams {
        &self.params
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn last_timestamp(&self) -> u64 {
        self.last_timestamp
    }

    pub fn has_role(&self, role: Role, account: &EthAddress) -> bool {
        self.roles.has(role, account)
    }

    pub fn role_members(&self, role: Role) -> Vec<EthAddress> {
        self.roles.members(role)
    }

    pub fn balance_of(&self, account: &EthAddress) -> u128 {
        self.tokens.balance_of(account)
    }

    pub fn tokens(&self) -> &TokenBalances {
        &self.tokens
    }

    pub fn public_pool(&self) -> &Node {
        &self.public_pool
    }

    pub fn pool_info(&self) -> PoolInfo {
        let treasury = self.tokens.treasury();
        PoolInfo {
            current_epoch: self.current_epoch,
            paused: self.paused,
            node_count: self.registry.len(),
            chip_count: self.chips.len(),
            public_pool: self.public_pool.clone(),
            escrow: self.tokens.escrow(),
            treasury,
            treasury_balance: self.tokens.balance_of(&treasury),
            initial_supply: self.tokens.initial_supply(),
            total_minted: self.tokens.total_minted(),
            next_event_seq: self.events.next_seq(),
        }
    }

    pub fn events(&self) -> &EventLog {
        &self.events
    }

    /// Pull cursor over the event log.
    pub fn events_since(&self, seq: u64, limit: usize) -> &[EventRecord] {
        self.events.since(seq, limit)
    }

    pub fn filter_events(&self, filter: &EventFilter, from: u64, limit: usize) -> Vec<&EventRecord> {
        self.events.filter(filter, from, limit)
    }
}
