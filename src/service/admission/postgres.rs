use super::*;
use crate::persistence::{PostgresPersistence, PostgresTransaction};

pub struct PostgresListingStore;

impl ListingStore<PostgresPersistence> for PostgresListingStore {
    fn load_for_update<'a>(
        &self,
        transaction: &mut PostgresTransaction<'a>,
        listing_id: ListingId,
    ) -> Result<Option<Listing>> {
        transaction
            .query_opt(
                "SELECT id, landlord_id, tenant_id FROM listings WHERE id = $1 FOR UPDATE",
                &[&listing_id],
            )?
            .map::<Result<_>, _>(|row| {
                Ok(Listing {
                    id: row.try_get("id")?,
                    landlord_id: row.try_get("landlord_id")?,
                    tenant_id: row.try_get("tenant_id")?,
                })
            })
            .transpose()
    }
}

pub struct PostgresBidStore;

impl BidStore<PostgresPersistence> for PostgresBidStore {
    fn create<'a>(&self, transaction: &mut PostgresTransaction<'a>, bid: NewBid) -> Result<Bid> {
        let row = transaction.query_one(
            "INSERT INTO biddings (bid, listing_id, user_id) VALUES ($1, $2, $3) RETURNING id",
            &[&bid.amount, &bid.listing_id, &bid.bidder_id],
        )?;
        Ok(Bid {
            id: row.try_get("id")?,
            amount: bid.amount,
            listing_id: bid.listing_id,
            bidder_id: bid.bidder_id,
        })
    }
}
