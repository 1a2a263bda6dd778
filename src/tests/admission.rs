use crate::{
    bidding::{AmountError, BidCandidate, InvalidAmount, Listing, ListingId, RawAmount, UserId},
    persistence::{Connection, InMemoryPersistence, Persistence, Transaction},
    service::{AdmissionError, BidAdmission, InMemoryBidStore, InMemoryListingStore},
};
use anyhow::Result;
use std::{sync::Arc, thread, time::Duration};

const LANDLORD: UserId = 1;
const BIDDER: UserId = 2;
const TENANT: UserId = 3;

const VACANT: ListingId = 10;
const RENTED: ListingId = 11;
const UNKNOWN: ListingId = 99;

struct Fixture {
    admission: BidAdmission<InMemoryPersistence>,
    bids: Arc<InMemoryBidStore>,
}

impl Fixture {
    fn new() -> Self {
        let listings = InMemoryListingStore::new_shared();
        listings.insert(Listing {
            id: VACANT,
            landlord_id: LANDLORD,
            tenant_id: None,
        });
        listings.insert(Listing {
            id: RENTED,
            landlord_id: LANDLORD,
            tenant_id: Some(TENANT),
        });
        let bids = InMemoryBidStore::new_shared();

        Self {
            admission: BidAdmission::new(InMemoryPersistence::new(), listings, bids.clone()),
            bids,
        }
    }

    fn admit(
        &self,
        amount: RawAmount,
        listing_id: ListingId,
        bidder: Option<UserId>,
    ) -> Result<crate::bidding::Bid, AdmissionError> {
        self.admission.admit(
            BidCandidate {
                amount,
                listing_id: Some(listing_id),
            },
            bidder,
        )
    }
}

fn text(s: &str) -> RawAmount {
    RawAmount::Text(s.to_owned())
}

#[test]
fn accepts_and_stores_a_valid_bid() -> Result<()> {
    let fixture = Fixture::new();

    let bid = fixture.admit(RawAmount::Number(200.0), VACANT, Some(BIDDER))?;

    assert_eq!(bid.amount, 200.0);
    assert_eq!(bid.listing_id, VACANT);
    assert_eq!(bid.bidder_id, BIDDER);
    assert_eq!(fixture.bids.bids_for(VACANT), vec![bid]);
    assert_eq!(fixture.bids.count(), 1);
    Ok(())
}

#[test]
fn accepts_numeric_text() -> Result<()> {
    let fixture = Fixture::new();

    let bid = fixture.admit(text("150.5"), VACANT, Some(BIDDER))?;

    assert_eq!(bid.amount, 150.5);
    Ok(())
}

#[test]
fn anonymous_bidder_is_rejected_before_anything_else() {
    let fixture = Fixture::new();

    for (amount, listing_id) in [
        (RawAmount::Number(200.0), VACANT),
        (text(""), VACANT),
        (text("hej"), RENTED),
        (RawAmount::Number(200.0), UNKNOWN),
    ] {
        assert!(matches!(
            fixture.admit(amount, listing_id, None),
            Err(AdmissionError::Unauthenticated)
        ));
    }
    assert_eq!(fixture.bids.count(), 0);
}

#[test]
fn blank_amount_aggregates_both_errors() {
    let fixture = Fixture::new();

    let err = fixture.admit(text(""), VACANT, Some(BIDDER)).unwrap_err();

    assert!(matches!(
        &err,
        AdmissionError::Invalid(InvalidAmount(errors))
            if errors == &[AmountError::Blank, AmountError::NotANumber]
    ));
    assert_eq!(err.to_string(), "Bid can't be blank and Bid is not a number");
}

#[test]
fn non_numeric_amount_is_invalid() {
    let fixture = Fixture::new();

    let err = fixture.admit(text("hej"), VACANT, Some(BIDDER)).unwrap_err();

    assert_eq!(err.to_string(), "Bid is not a number");
    assert_eq!(fixture.bids.count(), 0);
}

#[test]
fn amount_is_checked_before_ownership() {
    let fixture = Fixture::new();

    assert!(matches!(
        fixture.admit(text("hej"), VACANT, Some(LANDLORD)),
        Err(AdmissionError::Invalid(_))
    ));
}

#[test]
fn landlord_cannot_bid_on_own_listing() {
    let fixture = Fixture::new();

    let err = fixture
        .admit(RawAmount::Number(200.0), VACANT, Some(LANDLORD))
        .unwrap_err();

    assert!(matches!(err, AdmissionError::SelfBid));
    assert_eq!(err.to_string(), "You could not bid on your own listing");
    assert_eq!(fixture.bids.count(), 0);
}

#[test]
fn self_bid_takes_precedence_over_tenancy() {
    let fixture = Fixture::new();

    assert!(matches!(
        fixture.admit(RawAmount::Number(200.0), RENTED, Some(LANDLORD)),
        Err(AdmissionError::SelfBid)
    ));
}

#[test]
fn rented_listing_is_closed_to_bids() {
    let fixture = Fixture::new();

    let err = fixture
        .admit(RawAmount::Number(200.0), RENTED, Some(BIDDER))
        .unwrap_err();

    assert!(matches!(err, AdmissionError::AlreadyRented));
    assert_eq!(err.to_string(), "This property is already rented.");
    assert!(fixture.bids.bids_for(RENTED).is_empty());
}

#[test]
fn unknown_listing_is_not_found() {
    let fixture = Fixture::new();

    assert!(matches!(
        fixture.admit(RawAmount::Number(200.0), UNKNOWN, Some(BIDDER)),
        Err(AdmissionError::ListingNotFound)
    ));
    assert!(matches!(
        fixture.admission.admit(
            BidCandidate {
                amount: RawAmount::Number(200.0),
                listing_id: None,
            },
            Some(BIDDER),
        ),
        Err(AdmissionError::ListingNotFound)
    ));
}

#[test]
fn resubmitting_a_rejected_bid_stores_nothing() {
    let fixture = Fixture::new();

    for _ in 0..3 {
        assert!(fixture
            .admit(RawAmount::Number(200.0), RENTED, Some(BIDDER))
            .is_err());
        assert!(fixture.admit(text("hej"), VACANT, Some(BIDDER)).is_err());
    }

    assert_eq!(fixture.bids.count(), 0);
}

#[test]
fn each_accepted_bid_is_stored_once() -> Result<()> {
    let fixture = Fixture::new();

    let first = fixture.admit(RawAmount::Number(100.0), VACANT, Some(BIDDER))?;
    let second = fixture.admit(RawAmount::Number(120.0), VACANT, Some(TENANT))?;

    assert_ne!(first.id, second.id);
    assert_eq!(fixture.bids.bids_for(VACANT), vec![first, second]);
    Ok(())
}

#[test]
fn admission_waits_for_a_concurrent_tenant_assignment() -> Result<()> {
    let persistence = InMemoryPersistence::new();
    let listings = InMemoryListingStore::new_shared();
    listings.insert(Listing {
        id: VACANT,
        landlord_id: LANDLORD,
        tenant_id: None,
    });
    let bids = InMemoryBidStore::new_shared();
    let admission = BidAdmission::new(persistence.clone(), listings.clone(), bids.clone());

    let mut connection = persistence.get_connection()?;
    let mut transaction = connection.start_transaction()?;
    listings.assign_tenant(&mut transaction, VACANT, TENANT)?;

    let handle = thread::spawn(move || {
        admission.admit(
            BidCandidate {
                amount: RawAmount::Number(200.0),
                listing_id: Some(VACANT),
            },
            Some(BIDDER),
        )
    });

    thread::sleep(Duration::from_millis(100));
    assert!(!handle.is_finished());
    transaction.commit()?;

    let res = handle
        .join()
        .map_err(|_| anyhow::format_err!("admission thread panicked"))?;
    assert!(matches!(res, Err(AdmissionError::AlreadyRented)));
    assert_eq!(bids.count(), 0);
    Ok(())
}
