use super::*;
use crate::bidding::BidId;
use crate::persistence::{InMemoryPersistence, InMemoryTransaction};
use anyhow::format_err;
use parking_lot::Mutex;
use std::collections::BTreeMap;

#[derive(Default)]
pub struct InMemoryListingStore(Mutex<BTreeMap<ListingId, Listing>>);

impl InMemoryListingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Add or replace a listing
    ///
    /// For setup only: it bypasses the persistence lock, so it must not
    /// race with admissions. Use [`Self::assign_tenant`] for that.
    pub fn insert(&self, listing: Listing) {
        self.0.lock().insert(listing.id, listing);
    }

    /// Close a listing to bids, under the same transaction lock admissions take
    #[allow(unused)]
    pub fn assign_tenant<'a>(
        &self,
        _transaction: &mut InMemoryTransaction<'a>,
        listing_id: ListingId,
        tenant_id: UserId,
    ) -> Result<()> {
        let mut listings = self.0.lock();
        let listing = listings
            .get_mut(&listing_id)
            .ok_or_else(|| format_err!("unknown listing: {listing_id}"))?;
        listing.tenant_id = Some(tenant_id);
        Ok(())
    }
}

impl ListingStore<InMemoryPersistence> for InMemoryListingStore {
    fn load_for_update<'a>(
        &self,
        _transaction: &mut InMemoryTransaction<'a>,
        listing_id: ListingId,
    ) -> Result<Option<Listing>> {
        Ok(self.0.lock().get(&listing_id).copied())
    }
}

#[derive(Default)]
pub struct InMemoryBidStore(Mutex<Vec<Bid>>);

impl InMemoryBidStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    #[allow(unused)] // inspection only
    pub fn count(&self) -> usize {
        self.0.lock().len()
    }

    #[allow(unused)]
    pub fn bids_for(&self, listing_id: ListingId) -> Vec<Bid> {
        self.0
            .lock()
            .iter()
            .filter(|bid| bid.listing_id == listing_id)
            .copied()
            .collect()
    }
}

impl BidStore<InMemoryPersistence> for InMemoryBidStore {
    fn create<'a>(&self, _transaction: &mut InMemoryTransaction<'a>, bid: NewBid) -> Result<Bid> {
        let mut bids = self.0.lock();
        let bid = Bid {
            id: BidId::try_from(bids.len())? + 1,
            amount: bid.amount,
            listing_id: bid.listing_id,
            bidder_id: bid.bidder_id,
        };
        bids.push(bid);
        Ok(bid)
    }
}
