pub const ETH_ADDRESS_SIZE: usize = 20;

pub const TOKEN_DECIMALS: u8 = 18;

pub const ONE_TOKEN: u128 = 1_000_000_000_000_000_000;

pub const BASIS_POINTS_DENOMINATOR: u64 = 10_000;

/// Largest value a packed `uint40` withdrawal timestamp can hold.
pub const MAX_TIMESTAMP_40: u64 = (1 << 40) - 1;

/// Reserved account of the public-good pool pseudo-node.
pub const PUBLIC_POOL_ADDRESS: [u8; ETH_ADDRESS_SIZE] = [
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1,
];

pub const DEFAULT_SHARES_PER_CHIP: u128 = 1_000 * ONE_TOKEN;

pub const DEFAULT_STAKE_RATIO: u128 = 1;

pub const DEFAULT_MIN_TAX_RATE_BASIS_POINTS: u64 = 0;

pub const DEFAULT_STAKE_UNBONDING_PERIOD_SECS: u64 = 7 * 24 * 60 * 60;

pub const DEFAULT_DEPOSIT_UNBONDING_PERIOD_SECS: u64 = 7 * 24 * 60 * 60;

pub const DEFAULT_ALPHA_DEPOSIT_UNBONDING_PERIOD_SECS: u64 = 24 * 60 * 60;

pub const DEFAULT_NODE_SLASH_RATE_BASIS_POINTS: u64 = 1_000;

pub const DEFAULT_USER_SLASH_RATE_BASIS_POINTS: u64 = 500;

pub const DEFAULT_PUBLIC_POOL_TAX_RATE_BASIS_POINTS: u64 = 1_000;
