//! Bidding domain types
//!
//! Plain data shared by the admission engine, the stores and the HTTP
//! layer. Nothing in here does I/O.
use serde::{Deserialize, Deserializer};
use std::fmt;
use thiserror::Error;

pub type UserId = i64;
pub type ListingId = i64;
pub type BidId = i64;
pub type Amount = f64;

/// A rental listing, as far as bidding is concerned
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Listing {
    pub id: ListingId,
    pub landlord_id: UserId,
    /// Once set, the listing is closed to new bids
    pub tenant_id: Option<UserId>,
}

impl Listing {
    pub fn is_rented(&self) -> bool {
        self.tenant_id.is_some()
    }
}

/// A bid that passed admission and is about to be stored
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct NewBid {
    pub amount: Amount,
    pub listing_id: ListingId,
    pub bidder_id: UserId,
}

/// A persisted bid
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Bid {
    pub id: BidId,
    pub amount: Amount,
    pub listing_id: ListingId,
    pub bidder_id: UserId,
}

/// A bid as submitted by a client, before any validation
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BidCandidate {
    pub amount: RawAmount,
    pub listing_id: Option<ListingId>,
}

/// The bid amount exactly as the client sent it
///
/// Decoding never fails. `null` and empty arrays or objects count as
/// missing; any other value that is not a JSON string or number is kept
/// as its JSON text so that it fails numeric validation instead of
/// request parsing.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(from = "serde_json::Value")]
pub enum RawAmount {
    #[default]
    Missing,
    Text(String),
    Number(f64),
}

impl From<serde_json::Value> for RawAmount {
    fn from(value: serde_json::Value) -> Self {
        use serde_json::Value;
        match value {
            Value::Null => RawAmount::Missing,
            Value::Array(a) if a.is_empty() => RawAmount::Missing,
            Value::Object(o) if o.is_empty() => RawAmount::Missing,
            Value::String(s) => RawAmount::Text(s),
            Value::Number(n) => match n.as_f64() {
                Some(n) => RawAmount::Number(n),
                None => RawAmount::Text(n.to_string()),
            },
            other => RawAmount::Text(other.to_string()),
        }
    }
}

impl RawAmount {
    fn is_blank(&self) -> bool {
        match self {
            RawAmount::Missing => true,
            RawAmount::Text(s) => s.trim().is_empty(),
            RawAmount::Number(_) => false,
        }
    }

    fn to_number(&self) -> Option<Amount> {
        let n = match self {
            RawAmount::Missing => return None,
            RawAmount::Text(s) => s.trim().parse::<f64>().ok()?,
            RawAmount::Number(n) => *n,
        };
        n.is_finite().then_some(n)
    }

    /// Check the amount, collecting every problem with it
    pub fn validate(&self) -> Result<Amount, InvalidAmount> {
        let mut errors = vec![];
        if self.is_blank() {
            errors.push(AmountError::Blank);
        }
        let number = self.to_number();
        if number.is_none() {
            errors.push(AmountError::NotANumber);
        }

        match number {
            Some(amount) if errors.is_empty() => Ok(amount),
            _ => Err(InvalidAmount(errors)),
        }
    }
}

#[derive(Error, Debug, Copy, Clone, PartialEq, Eq)]
pub enum AmountError {
    #[error("Bid can't be blank")]
    Blank,
    #[error("Bid is not a number")]
    NotANumber,
}

/// One or more reasons an amount was refused, in the order they were found
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub struct InvalidAmount(pub Vec<AmountError>);

impl fmt::Display for InvalidAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, e) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" and ")?;
            }
            write!(f, "{e}")?;
        }
        Ok(())
    }
}

/// Session credentials a client presents with each request
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Credentials {
    pub uid: String,
    pub client: String,
    pub access_token: String,
}

/// Accepts a listing id given either as a JSON number or as a numeric string
///
/// Anything else decodes as `None`, which admission reports as an
/// unknown listing.
pub fn deserialize_listing_id<'de, D>(deserializer: D) -> Result<Option<ListingId>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde_json::Value;
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Number(n)) => n.as_i64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}
