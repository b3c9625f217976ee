//! Built-in condition types.

use std::net::IpAddr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{Condition, Request};
use crate::error::{Error, Result};
use crate::matcher::wildcard_match;

fn to_options<T: Serialize>(c: &T) -> Result<Value> {
    serde_json::to_value(c).map_err(|e| Error::Encode(e.to_string()))
}

/// Value must equal a fixed string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StringEqualCondition {
    pub equals: String,
}

impl Condition for StringEqualCondition {
    fn name(&self) -> &'static str {
        "StringEqualCondition"
    }

    fn options(&self) -> Result<Value> {
        to_options(self)
    }

    fn fulfills(&self, value: &Value, _request: &Request) -> bool {
        value.as_str() == Some(self.equals.as_str())
    }
}

/// Value must match a wildcard pattern (`prefix*` or exact).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StringMatchCondition {
    pub matches: String,
}

impl Condition for StringMatchCondition {
    fn name(&self) -> &'static str {
        "StringMatchCondition"
    }

    fn options(&self) -> Result<Value> {
        to_options(self)
    }

    fn fulfills(&self, value: &Value, _request: &Request) -> bool {
        let Some(s) = value.as_str() else { return false; };
        // An invalid pattern never matches.
        wildcard_match(&self.matches, s).unwrap_or(false)
    }
}

/// Value must be an IP address inside a network (`10.0.0.0/8`, `fd00::/8`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CidrCondition {
    pub cidr: String,
}

impl CidrCondition {
    fn contains(&self, addr: IpAddr) -> Option<bool> {
        let (net, bits) = self.cidr.split_once('/')?;
        let net: IpAddr = net.parse().ok()?;
        let bits: u32 = bits.parse().ok()?;

        match (net, addr) {
            (IpAddr::V4(n), IpAddr::V4(a)) => {
                if bits > 32 {
                    return None;
                }
                let mask = u32::MAX.checked_shl(32 - bits).unwrap_or(0);
                Some(u32::from(n) & mask == u32::from(a) & mask)
            }
            (IpAddr::V6(n), IpAddr::V6(a)) => {
                if bits > 128 {
                    return None;
                }
                let mask = u128::MAX.checked_shl(128 - bits).unwrap_or(0);
                Some(u128::from(n) & mask == u128::from(a) & mask)
            }
            _ => Some(false),
        }
    }
}

impl Condition for CidrCondition {
    fn name(&self) -> &'static str {
        "CIDRCondition"
    }

    fn options(&self) -> Result<Value> {
        to_options(self)
    }

    fn fulfills(&self, value: &Value, _request: &Request) -> bool {
        let Some(Ok(addr)) = value.as_str().map(str::parse::<IpAddr>) else {
            return false;
        };
        self.contains(addr).unwrap_or(false)
    }
}

/// Value must equal the requesting subject.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SubjectIsOwnerCondition {}

impl Condition for SubjectIsOwnerCondition {
    fn name(&self) -> &'static str {
        "SubjectIsOwnerCondition"
    }

    fn options(&self) -> Result<Value> {
        to_options(self)
    }

    fn fulfills(&self, value: &Value, request: &Request) -> bool {
        value.as_str() == Some(request.subject.as_str())
    }
}

/// Value must not equal the requesting subject.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SubjectIsNotOwnerCondition {}

impl Condition for SubjectIsNotOwnerCondition {
    fn name(&self) -> &'static str {
        "SubjectIsNotOwnerCondition"
    }

    fn options(&self) -> Result<Value> {
        to_options(self)
    }

    fn fulfills(&self, value: &Value, request: &Request) -> bool {
        value.as_str() != Some(request.subject.as_str())
    }
}

/// Value must be a list of string pairs, each pair equal (`[["a","a"],["b","b"]]`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StringPairsEqualCondition {}

impl Condition for StringPairsEqualCondition {
    fn name(&self) -> &'static str {
        "StringPairsEqualCondition"
    }

    fn options(&self) -> Result<Value> {
        to_options(self)
    }

    fn fulfills(&self, value: &Value, _request: &Request) -> bool {
        let Some(pairs) = value.as_array() else { return false; };
        pairs.iter().all(|pair| match pair.as_array().map(Vec::as_slice) {
            Some([Value::String(a), Value::String(b)]) => a == b,
            _ => false,
        })
    }
}
