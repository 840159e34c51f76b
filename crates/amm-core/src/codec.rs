use crate::error::{AmmError, Result};
use alloy_primitives::U256;
use num_bigint::BigUint;
use num_traits::Zero;
use std::fmt;
use std::str::FromStr;

/// Token amount or liquidity share count. Never converted through a float.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Amount(BigUint);

impl Amount {
    pub fn zero() -> Self {
        Self(BigUint::zero())
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn as_biguint(&self) -> &BigUint {
        &self.0
    }

    pub fn into_biguint(self) -> BigUint {
        self.0
    }
}

/// Wire value -> internal amount. Infallible: every `U256` is representable.
pub fn to_internal(wire: U256) -> Amount {
    Amount(BigUint::from_bytes_be(&wire.to_be_bytes::<32>()))
}

/// Internal amount -> wire value. Fails when the amount exceeds `2^256 - 1`.
pub fn to_wire(amount: &Amount) -> Result<U256> {
    let bytes = amount.0.to_bytes_be();
    U256::try_from_be_slice(&bytes).ok_or_else(|| AmmError::AmountOverflow(amount.to_string()))
}

impl From<U256> for Amount {
    fn from(wire: U256) -> Self {
        to_internal(wire)
    }
}

impl TryFrom<&Amount> for U256 {
    type Error = AmmError;

    fn try_from(amount: &Amount) -> Result<Self> {
        to_wire(amount)
    }
}

impl From<BigUint> for Amount {
    fn from(value: BigUint) -> Self {
        Self(value)
    }
}

impl From<u64> for Amount {
    fn from(value: u64) -> Self {
        Self(BigUint::from(value))
    }
}

impl From<u128> for Amount {
    fn from(value: u128) -> Self {
        Self(BigUint::from(value))
    }
}

impl FromStr for Amount {
    type Err = AmmError;

    /// Parses a base-10 integer. Decimal points and signs are rejected.
    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim().replace('_', "");
        if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
            return Err(AmmError::InvalidAmount(s.to_string()));
        }
        trimmed
            .parse::<BigUint>()
            .map(Self)
            .map_err(|e| AmmError::InvalidAmount(format!("{}: {}", s, e)))
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_max_wire_value_is_exact() {
        let max = to_internal(U256::MAX);
        assert_eq!(
            max.to_string(),
            "115792089237316195423570985008687907853269984665640564039457584007913129639935"
        );
        assert_eq!(to_wire(&max).unwrap(), U256::MAX);
    }

    #[test]
    fn test_overflow_is_rejected() {
        let too_big = Amount::from(to_internal(U256::MAX).into_biguint() + 1u32);
        assert!(matches!(to_wire(&too_big), Err(AmmError::AmountOverflow(_))));
    }

    #[test]
    fn test_zero() {
        assert!(to_internal(U256::ZERO).is_zero());
        assert_eq!(to_wire(&Amount::zero()).unwrap(), U256::ZERO);
    }

    #[test]
    fn test_parse() {
        assert_eq!("1_000".parse::<Amount>().unwrap(), Amount::from(1000u64));
        assert!("1.5".parse::<Amount>().is_err());
        assert!("-3".parse::<Amount>().is_err());
        assert!("".parse::<Amount>().is_err());
    }

    proptest! {
        #[test]
        fn prop_wire_round_trip(bytes in any::<[u8; 32]>()) {
            let wire = U256::from_be_bytes(bytes);
            prop_assert_eq!(to_wire(&to_internal(wire)).unwrap(), wire);
        }

        #[test]
        fn prop_decimal_string_matches(value in any::<u128>()) {
            let amount = to_internal(U256::from(value));
            prop_assert_eq!(amount.to_string(), value.to_string());
        }
    }
}
