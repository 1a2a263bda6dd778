//! Bid Admission Engine
//!
//! Decides whether a submitted bid is admissible and, if it is, stores
//! it. Checks run in a fixed order and the first failing one decides
//! the outcome:
//!
//! 1. the bidder must be signed in,
//! 2. the amount must be present and numeric (both problems are
//!    reported together),
//! 3. the listing must exist,
//! 4. the bidder must not be the listing's landlord,
//! 5. the listing must not have a tenant yet.
//!
//! Steps 3 onwards run inside one transaction that holds a lock on the
//! listing, so a tenant assigned concurrently through the same lock
//! can't slip in between the tenancy check and the insert.
use crate::bidding::{
    Amount, Bid, BidCandidate, InvalidAmount, Listing, ListingId, NewBid, UserId,
};
use crate::persistence::{Connection, Persistence, Transaction};
use anyhow::Result;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info, warn};

mod in_memory;
mod postgres;

pub use self::{in_memory::*, postgres::*};

/// Listings, as seen by the bidding process
pub trait ListingStore<P: Persistence>: Send + Sync {
    /// Load a listing and lock it until the transaction ends
    fn load_for_update<'a>(
        &self,
        transaction: &mut P::Transaction<'a>,
        listing_id: ListingId,
    ) -> Result<Option<Listing>>;
}

pub type SharedListingStore<P> = Arc<dyn ListingStore<P> + Send + Sync>;

/// Where accepted bids go
pub trait BidStore<P: Persistence>: Send + Sync {
    fn create<'a>(&self, transaction: &mut P::Transaction<'a>, bid: NewBid) -> Result<Bid>;
}

pub type SharedBidStore<P> = Arc<dyn BidStore<P> + Send + Sync>;

#[derive(Error, Debug)]
pub enum AdmissionError {
    #[error("You need to sign in or sign up before continuing.")]
    Unauthenticated,
    #[error("{0}")]
    Invalid(#[from] InvalidAmount),
    #[error("Couldn't find Listing")]
    ListingNotFound,
    #[error("You could not bid on your own listing")]
    SelfBid,
    #[error("This property is already rented.")]
    AlreadyRented,
    /// The stores failed; not a decision about the bid itself
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

pub struct BidAdmission<P: Persistence> {
    persistence: P,
    listings: SharedListingStore<P>,
    bids: SharedBidStore<P>,
}

impl<P: Persistence> BidAdmission<P> {
    pub fn new(persistence: P, listings: SharedListingStore<P>, bids: SharedBidStore<P>) -> Self {
        Self {
            persistence,
            listings,
            bids,
        }
    }

    /// Run all admission checks against `candidate` and store it if it passes
    ///
    /// `bidder` is `None` for anonymous requests.
    pub fn admit(
        &self,
        candidate: BidCandidate,
        bidder: Option<UserId>,
    ) -> Result<Bid, AdmissionError> {
        let res = self.decide(candidate, bidder);
        match &res {
            Ok(bid) => info!(
                bid_id = bid.id,
                listing_id = bid.listing_id,
                bidder = bid.bidder_id,
                amount = bid.amount,
                "bid accepted"
            ),
            Err(AdmissionError::Internal(e)) => error!(?bidder, err = ?e, "bid admission failed"),
            Err(reason) => warn!(?bidder, %reason, "bid rejected"),
        }
        res
    }

    fn decide(
        &self,
        candidate: BidCandidate,
        bidder: Option<UserId>,
    ) -> Result<Bid, AdmissionError> {
        let bidder = ensure_signed_in(bidder)?;
        let amount = candidate.amount.validate()?;
        let listing_id = candidate
            .listing_id
            .ok_or(AdmissionError::ListingNotFound)?;
        debug!(bidder, listing_id, amount, "bid candidate is well-formed");

        let mut connection = self.persistence.get_connection()?;
        let mut transaction = connection.start_transaction()?;

        let listing = self
            .listings
            .load_for_update(&mut transaction, listing_id)?
            .ok_or(AdmissionError::ListingNotFound)?;
        ensure_not_landlord(&listing, bidder)?;
        ensure_vacant(&listing)?;

        let bid = self
            .bids
            .create(&mut transaction, new_bid(&listing, bidder, amount))?;
        transaction.commit()?;

        Ok(bid)
    }
}

fn ensure_signed_in(bidder: Option<UserId>) -> Result<UserId, AdmissionError> {
    bidder.ok_or(AdmissionError::Unauthenticated)
}

fn ensure_not_landlord(listing: &Listing, bidder: UserId) -> Result<(), AdmissionError> {
    if listing.landlord_id == bidder {
        return Err(AdmissionError::SelfBid);
    }
    Ok(())
}

fn ensure_vacant(listing: &Listing) -> Result<(), AdmissionError> {
    if listing.is_rented() {
        return Err(AdmissionError::AlreadyRented);
    }
    Ok(())
}

fn new_bid(listing: &Listing, bidder: UserId, amount: Amount) -> NewBid {
    NewBid {
        amount,
        listing_id: listing.id,
        bidder_id: bidder,
    }
}
