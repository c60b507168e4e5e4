//! Ring id arithmetic over the finite ring R(P) where P = 2^160.
use std::cmp::Ordering;
use std::ops::Add;
use std::ops::Neg;
use std::ops::Sub;
use std::str::FromStr;

use num_bigint::BigUint;
use serde::Deserialize;
use serde::Serialize;
use sha1::Digest;
use sha1::Sha1;

use crate::consts::ID_BYTES;
use crate::consts::RING_BITS;
use crate::error::Error;
use crate::error::Result;

/// A position on the ring: a 160-bit unsigned integer kept as exactly
/// 20 big-endian bytes. Because the width is fixed, byte order and
/// integer order coincide, so the derived `Ord` is the numeric one.
///
/// Canonical width is a hard invariant: every conversion back from
/// [BigUint] re-pads to [ID_BYTES] bytes, so dropped leading zeros
/// never escape an arithmetic operation.
#[derive(Copy, Clone, Eq, Ord, PartialEq, PartialOrd, Hash, Serialize, Deserialize)]
pub struct Did([u8; ID_BYTES]);

impl Did {
    /// Hash arbitrary input onto the ring. Used both for node
    /// identities and for key placement.
    pub fn hash_of(input: &[u8]) -> Self {
        let digest = Sha1::digest(input);
        let mut id = [0u8; ID_BYTES];
        id.copy_from_slice(&digest);
        Self(id)
    }

    /// The canonical big-endian byte representation.
    pub fn as_bytes(&self) -> &[u8; ID_BYTES] {
        &self.0
    }

    /// The i-th finger target: (self + 2^i) mod 2^160.
    /// Idempotent for fixed inputs and always inside the ring.
    pub fn finger_target(&self, i: usize) -> Did {
        debug_assert!(i < RING_BITS);
        *self + Did::from(BigUint::from(2u16).pow(i as u32))
    }
}

/// Test key <- (a, b), the circular open interval running clockwise
/// from a to b. Three cases over the unsigned order of a and b:
/// equal bounds mean the whole ring minus the point a itself, a > b
/// means the interval wraps through zero, a < b is the plain case.
pub fn strictly_between(key: Did, a: Did, b: Did) -> bool {
    match a.cmp(&b) {
        Ordering::Equal => key != a,
        Ordering::Greater => key > a || key < b,
        Ordering::Less => key > a && key < b,
    }
}

/// Test key <- (a, b]. The inclusive right bound is what key ownership
/// uses: a key is owned by the node whose id closes the interval.
pub fn between_right_incl(key: Did, a: Did, b: Did) -> bool {
    strictly_between(key, a, b) || key == b
}

impl From<BigUint> for Did {
    fn from(value: BigUint) -> Self {
        let reduced = value % (BigUint::from(2u16).pow(RING_BITS as u32));
        let mut bytes = reduced.to_bytes_be();
        let mut canonical = vec![0u8; ID_BYTES - bytes.len()];
        canonical.append(&mut bytes);
        let mut id = [0u8; ID_BYTES];
        id.copy_from_slice(&canonical);
        Self(id)
    }
}

impl From<Did> for BigUint {
    fn from(did: Did) -> BigUint {
        BigUint::from_bytes_be(&did.0)
    }
}

impl From<u32> for Did {
    fn from(value: u32) -> Self {
        Self::from(BigUint::from(value))
    }
}

impl Neg for Did {
    type Output = Self;
    fn neg(self) -> Self {
        let ret = BigUint::from(2u16).pow(RING_BITS as u32) - BigUint::from(self);
        ret.into()
    }
}

impl Add for Did {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        ((BigUint::from(self) + BigUint::from(rhs))
            % (BigUint::from(2u16).pow(RING_BITS as u32)))
        .into()
    }
}

impl Sub for Did {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        self + (-rhs)
    }
}

impl std::fmt::Display for Did {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl std::fmt::Debug for Did {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self)
    }
}

impl FromStr for Did {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self> {
        let bytes = hex::decode(s.trim_start_matches("0x"))?;
        if bytes.len() != ID_BYTES {
            return Err(Error::IdLength(ID_BYTES, bytes.len()));
        }
        let mut id = [0u8; ID_BYTES];
        id.copy_from_slice(&bytes);
        Ok(Self(id))
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn test_ord_follows_unsigned_value() {
        let a = Did::from_str("0x11e807fcc88dd319270493fb2e822e388fe36ab0").unwrap();
        let b = Did::from_str("0x999999cf1046e68e36e1aa2e0e07105eddd1f08e").unwrap();
        let c = Did::from_str("0xc0ffee254729296a45a3885639ac7e10f9d54979").unwrap();
        assert!(c > b && b > a);
    }

    #[test]
    fn test_finite_ring_neg() {
        let zero = Did::from(0u32);
        let a = Did::from_str("0x11e807fcc88dd319270493fb2e822e388fe36ab0").unwrap();
        assert_eq!(-a + a, zero);
        assert_eq!(-(-a), a);
        assert_eq!(Did::from(0u32), Did::from(BigUint::from(2u16).pow(160)));
    }

    #[test]
    fn test_canonical_width_is_preserved() {
        // One would collapse to a single byte in raw bigint form.
        let one = Did::from(1u32);
        assert_eq!(one.as_bytes().len(), ID_BYTES);
        assert_eq!(one.as_bytes()[..19], [0u8; 19]);
        assert_eq!(one.as_bytes()[19], 1);

        // Wrap-around lands back inside the ring at full width.
        let max = Did::from(BigUint::from(2u16).pow(160) - 1u16);
        assert_eq!((max + Did::from(2u32)).as_bytes().len(), ID_BYTES);
        assert_eq!(max + Did::from(1u32), Did::from(0u32));
    }

    #[test]
    fn test_finger_target_idempotent_and_in_range() {
        let a = Did::from_str("0xccffee254729296a45a3885639ac7e10f9d54979").unwrap();
        for i in [0usize, 1, 63, 159] {
            let t1 = a.finger_target(i);
            let t2 = a.finger_target(i);
            assert_eq!(t1, t2);
            assert_eq!(t1, a + Did::from(BigUint::from(2u16).pow(i as u32)));
        }
        // The top finger is half the ring away.
        let half = Did::from(BigUint::from(2u16).pow(159));
        assert_eq!(Did::from(0u32).finger_target(159), half);
        // And adding it twice comes home.
        assert_eq!(half + half, Did::from(0u32));
    }

    #[test]
    fn test_strictly_between_equal_bounds() {
        // (a, a) is the whole ring minus the point a itself.
        let a = Did::from(7u32);
        let b = Did::from(7u32);
        assert!(!strictly_between(a, a, b));
        assert!(strictly_between(Did::from(8u32), a, b));
        assert!(strictly_between(Did::from(0u32), a, b));
        assert!(strictly_between(-a, a, b));
    }

    #[test]
    fn test_strictly_between_plain_interval() {
        let a = Did::from(10u32);
        let b = Did::from(100u32);
        assert!(strictly_between(Did::from(11u32), a, b));
        assert!(strictly_between(Did::from(99u32), a, b));
        assert!(!strictly_between(a, a, b));
        assert!(!strictly_between(b, a, b));
        assert!(!strictly_between(Did::from(9u32), a, b));
        assert!(!strictly_between(Did::from(101u32), a, b));
    }

    #[test]
    fn test_strictly_between_wraps_through_zero() {
        // The 160-bit analogue of a=0xFE, b=0x02, key=0xFF mod 2^8.
        let a = Did::from(BigUint::from(2u16).pow(160) - 2u16);
        let b = Did::from(2u32);
        let key = Did::from(BigUint::from(2u16).pow(160) - 1u16);
        assert!(strictly_between(key, a, b));
        assert!(strictly_between(Did::from(0u32), a, b));
        assert!(strictly_between(Did::from(1u32), a, b));
        assert!(!strictly_between(Did::from(0x50u32), a, b));
        assert!(!strictly_between(a, a, b));
        assert!(!strictly_between(b, a, b));
    }

    #[test]
    fn test_between_right_incl_owns_the_bound() {
        let a = Did::from(10u32);
        let b = Did::from(100u32);
        assert!(between_right_incl(b, a, b));
        assert!(between_right_incl(Did::from(50u32), a, b));
        assert!(!between_right_incl(a, a, b));
        assert!(!between_right_incl(Did::from(101u32), a, b));

        // Wrapping case keeps the right bound.
        let c = Did::from(BigUint::from(2u16).pow(160) - 2u16);
        assert!(between_right_incl(Did::from(2u32), c, Did::from(2u32)));
        assert!(!between_right_incl(c, c, Did::from(2u32)));
    }

    #[test]
    fn test_hash_of_is_stable() {
        let a = Did::hash_of(b"alpha");
        let b = Did::hash_of(b"alpha");
        let c = Did::hash_of(b"beta");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.as_bytes().len(), ID_BYTES);
    }

    #[test]
    fn test_hex_round_trip() {
        let a = Did::from_str("0x00e807fcc88dd319270493fb2e822e388fe36ab0").unwrap();
        assert_eq!(Did::from_str(&a.to_string()).unwrap(), a);
        assert!(Did::from_str("0xdeadbeef").is_err());
    }
}
