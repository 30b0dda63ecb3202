#![forbid(unsafe_code)]
#![warn(clippy::all)]

pub mod address;
pub mod amount;
pub mod constants;
pub mod error;
pub mod ids;
pub mod rate;
pub mod role;

pub use address::EthAddress;
pub use amount::TokenAmount;
pub use constants::*;
pub use error::{ChipstakeError, ChipstakeResult, LedgerError, LedgerResult};
pub use ids::{ChipId, EpochNumber, NodeId, RequestId};
pub use rate::BasisPoints;
pub use role::Role;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_eth_address() {
        let addr = EthAddress::from_bytes([
            0xde, 0xad, 0xbe, 0xef, 0x00, 0x11, 0x22, 0x33, 0x44, 0x55, 0x66, 0x77, 0x88, 0x99,
            0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0xff,
        ]);
        let hex = addr.to_hex();
        assert!(hex.starts_with("0x"));
        assert_eq!(hex.len(), 42);

        let parsed = EthAddress::from_hex(&hex).unwrap();
        assert_eq!(addr, parsed);

        let mixed_case = "0xDeAdBeEf00112233445566778899AaBbCcDdEeFf";
        assert_eq!(EthAddress::from_hex(mixed_case).unwrap(), addr);
        assert_eq!(addr.to_string(), hex);
    }

    #[test]
    fn test_eth_address_rejects_bad_length() {
        assert!(EthAddress::from_hex("0xdeadbeef").is_err());
        assert!(EthAddress::from_hex("not-hex").is_err());
    }

    #[test]
    fn test_eth_address_serializes_as_hex_string() {
        let addr = EthAddress::from_low_u64(0x2a);
        let json = serde_json::to_string(&addr).unwrap();
        assert_eq!(json, "\"0x000000000000000000000000000000000000002a\"");
        let back: EthAddress = serde_json::from_str(&json).unwrap();
        assert_eq!(back, addr);
    }

    #[test]
    fn test_public_pool_address() {
        let pool = EthAddress::public_pool();
        assert!(pool.is_public_pool());
        assert!(!pool.is_zero());
        assert!(EthAddress::zero().is_zero());
        assert_eq!(pool, EthAddress::from_low_u64(1));
    }

    #[test]
    fn test_token_amount() {
        let amount = TokenAmount::tokens("100.5").unwrap();
        assert_eq!(amount.to_decimal(), "100.5");
        assert_eq!(amount.raw, 100 * ONE_TOKEN + ONE_TOKEN / 2);

        assert!(TokenAmount::zero(18).is_zero());
        assert!(TokenAmount::tokens("1.2.3").is_err());
        assert!(TokenAmount::tokens("").is_err());
    }

    #[test]
    fn test_basis_points_bounds() {
        assert!(BasisPoints::MAX.is_valid());
        assert!(!BasisPoints(10_001).is_valid());
        assert_eq!(BasisPoints(500).to_string(), "500bp");
    }

    #[test]
    fn test_error_codes() {
        let err = LedgerError::InvalidEpoch { expected: 2, actual: 5 };
        assert_eq!(err.code(), "InvalidEpoch");
        assert!(err.to_string().contains("expected 2"));

        let wrapped: ChipstakeError = LedgerError::BatchSizeZero.into();
        assert!(matches!(wrapped, ChipstakeError::Ledger(LedgerError::BatchSizeZero)));
    }

    #[test]
    fn test_sequential_ids() {
        assert_eq!(ChipId(4).next(), ChipId(5));
        assert_eq!(RequestId(9).to_string(), "req#9");
        assert_eq!(EpochNumber(0).prev(), EpochNumber(0));
        assert_eq!(serde_json::to_string(&NodeId(3)).unwrap(), "3");
    }
}
