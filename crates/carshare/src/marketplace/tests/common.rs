use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use axum::response::Response;
use chrono::NaiveDate;
use serde_json::Value;

use crate::clock::FixedClock;
use crate::marketplace::domain::{
    Actor, Car, CarBrand, CarId, NewCar, NewOffer, NewRent, Offer, OfferId, Rent, RentId,
    RentStatus,
};
use crate::marketplace::repository::{MarketplaceRepository, RepositoryError};
use crate::marketplace::{marketplace_router, InMemoryMarketplace, MarketplaceService, RentalPolicy};

pub(super) const ACCORD_VIN: &str = "1HGCM82633A004352";
pub(super) const INTEGRA_VIN: &str = "JH4DB1550LS000111";
pub(super) const ELANTRA_VIN: &str = "5NPEB4AC1DH576656";

pub(super) type TestService<R = InMemoryMarketplace> = MarketplaceService<R, FixedClock>;

pub(super) fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 6, 2).expect("valid date")
}

pub(super) fn days(offset: i64) -> NaiveDate {
    today() + chrono::Duration::days(offset)
}

pub(super) fn owner() -> Actor {
    Actor::user(1)
}

pub(super) fn renter() -> Actor {
    Actor::user(2)
}

pub(super) fn stranger() -> Actor {
    Actor::user(3)
}

pub(super) fn admin() -> Actor {
    Actor::admin(99)
}

pub(super) fn build_service() -> (TestService, Arc<InMemoryMarketplace>, Arc<FixedClock>) {
    let repository = Arc::new(InMemoryMarketplace::default());
    let clock = Arc::new(FixedClock::new(today()));
    let service = MarketplaceService::new(
        repository.clone(),
        clock.clone(),
        RentalPolicy::default(),
    );
    (service, repository, clock)
}

pub(super) fn service_over<R>(repository: Arc<R>) -> TestService<R>
where
    R: MarketplaceRepository + 'static,
{
    MarketplaceService::new(
        repository,
        Arc::new(FixedClock::new(today())),
        RentalPolicy::default(),
    )
}

pub(super) fn new_car(vin: &str) -> NewCar {
    NewCar {
        vin: vin.to_string(),
        brand: CarBrand::Honda,
        model: "Accord".to_string(),
        mileage: 120_000,
        production_year: Some(2003),
    }
}

pub(super) fn new_offer(car: CarId) -> NewOffer {
    NewOffer {
        car,
        description: "Clean, non-smoking, full tank on pickup.".to_string(),
        price: 49.5,
    }
}

pub(super) fn booking(offer: OfferId, start_offset: i64, duration: u32) -> NewRent {
    NewRent {
        offer,
        rent_start: days(start_offset),
        duration,
    }
}

/// Registers a car for [`owner`] and publishes an offer for it.
pub(super) fn listed_offer<R>(service: &TestService<R>, vin: &str) -> (Car, Offer)
where
    R: MarketplaceRepository + 'static,
{
    let car = service
        .create_car(&owner(), new_car(vin))
        .expect("car is listed");
    let offer = service
        .create_offer(&owner(), new_offer(car.id))
        .expect("offer is published");
    (car, offer)
}

/// In-memory store with switchable write failures and a rent that gets closed
/// by another caller while the open rents are being listed.
#[derive(Default, Clone)]
pub(super) struct FlakyRepository {
    pub(super) inner: InMemoryMarketplace,
    pub(super) failing_rent: Arc<Mutex<Option<RentId>>>,
    pub(super) failing_offers: Arc<AtomicBool>,
    pub(super) closed_mid_scan: Arc<Mutex<Option<RentId>>>,
}

impl FlakyRepository {
    pub(super) fn fail_writes_for(&self, id: RentId) {
        *self.failing_rent.lock().expect("flaky mutex poisoned") = Some(id);
    }

    pub(super) fn fail_offer_writes(&self) {
        self.failing_offers.store(true, Ordering::SeqCst);
    }

    pub(super) fn close_during_scan(&self, id: RentId) {
        *self.closed_mid_scan.lock().expect("flaky mutex poisoned") = Some(id);
    }
}

impl MarketplaceRepository for FlakyRepository {
    fn insert_car(&self, car: Car) -> Result<Car, RepositoryError> {
        self.inner.insert_car(car)
    }

    fn update_car_and_snapshot(&self, car: Car) -> Result<(), RepositoryError> {
        self.inner.update_car_and_snapshot(car)
    }

    fn fetch_car(&self, id: CarId) -> Result<Option<Car>, RepositoryError> {
        self.inner.fetch_car(id)
    }

    fn delete_car(&self, id: CarId) -> Result<Car, RepositoryError> {
        self.inner.delete_car(id)
    }

    fn cars(&self) -> Result<Vec<Car>, RepositoryError> {
        self.inner.cars()
    }

    fn insert_offer(&self, offer: Offer) -> Result<Offer, RepositoryError> {
        self.inner.insert_offer(offer)
    }

    fn update_offer(&self, offer: Offer) -> Result<(), RepositoryError> {
        if self.failing_offers.load(Ordering::SeqCst) {
            return Err(RepositoryError::Unavailable("write timed out".to_string()));
        }
        self.inner.update_offer(offer)
    }

    fn fetch_offer(&self, id: OfferId) -> Result<Option<Offer>, RepositoryError> {
        self.inner.fetch_offer(id)
    }

    fn offer_for_car(&self, car: CarId) -> Result<Option<Offer>, RepositoryError> {
        self.inner.offer_for_car(car)
    }

    fn delete_offer(&self, id: OfferId) -> Result<Offer, RepositoryError> {
        self.inner.delete_offer(id)
    }

    fn offers(&self) -> Result<Vec<Offer>, RepositoryError> {
        self.inner.offers()
    }

    fn insert_rent(&self, rent: Rent) -> Result<Rent, RepositoryError> {
        self.inner.insert_rent(rent)
    }

    fn update_rent(&self, rent: Rent) -> Result<(), RepositoryError> {
        let failing = *self.failing_rent.lock().expect("flaky mutex poisoned");
        if failing == Some(rent.id) {
            return Err(RepositoryError::Unavailable("write timed out".to_string()));
        }
        self.inner.update_rent(rent)
    }

    fn fetch_rent(&self, id: RentId) -> Result<Option<Rent>, RepositoryError> {
        self.inner.fetch_rent(id)
    }

    fn rents(&self) -> Result<Vec<Rent>, RepositoryError> {
        self.inner.rents()
    }

    fn rents_for_offer(&self, offer: OfferId) -> Result<Vec<Rent>, RepositoryError> {
        self.inner.rents_for_offer(offer)
    }

    fn open_rents(&self) -> Result<Vec<Rent>, RepositoryError> {
        let open = self.inner.open_rents()?;
        let closing = self.closed_mid_scan.lock().expect("flaky mutex poisoned").take();
        if let Some(mut rent) = closing.and_then(|id| open.iter().find(|r| r.id == id).cloned()) {
            rent.close_rent = true;
            rent.status = RentStatus::Finished;
            self.inner.update_rent(rent)?;
        }
        Ok(open)
    }
}

pub(super) struct UnavailableRepository;

fn offline<T>() -> Result<T, RepositoryError> {
    Err(RepositoryError::Unavailable("database offline".to_string()))
}

impl MarketplaceRepository for UnavailableRepository {
    fn insert_car(&self, _car: Car) -> Result<Car, RepositoryError> {
        offline()
    }

    fn update_car_and_snapshot(&self, _car: Car) -> Result<(), RepositoryError> {
        offline()
    }

    fn fetch_car(&self, _id: CarId) -> Result<Option<Car>, RepositoryError> {
        offline()
    }

    fn delete_car(&self, _id: CarId) -> Result<Car, RepositoryError> {
        offline()
    }

    fn cars(&self) -> Result<Vec<Car>, RepositoryError> {
        offline()
    }

    fn insert_offer(&self, _offer: Offer) -> Result<Offer, RepositoryError> {
        offline()
    }

    fn update_offer(&self, _offer: Offer) -> Result<(), RepositoryError> {
        offline()
    }

    fn fetch_offer(&self, _id: OfferId) -> Result<Option<Offer>, RepositoryError> {
        offline()
    }

    fn offer_for_car(&self, _car: CarId) -> Result<Option<Offer>, RepositoryError> {
        offline()
    }

    fn delete_offer(&self, _id: OfferId) -> Result<Offer, RepositoryError> {
        offline()
    }

    fn offers(&self) -> Result<Vec<Offer>, RepositoryError> {
        offline()
    }

    fn insert_rent(&self, _rent: Rent) -> Result<Rent, RepositoryError> {
        offline()
    }

    fn update_rent(&self, _rent: Rent) -> Result<(), RepositoryError> {
        offline()
    }

    fn fetch_rent(&self, _id: RentId) -> Result<Option<Rent>, RepositoryError> {
        offline()
    }

    fn rents(&self) -> Result<Vec<Rent>, RepositoryError> {
        offline()
    }

    fn rents_for_offer(&self, _offer: OfferId) -> Result<Vec<Rent>, RepositoryError> {
        offline()
    }

    fn open_rents(&self) -> Result<Vec<Rent>, RepositoryError> {
        offline()
    }
}

pub(super) fn router_with_service<R>(service: TestService<R>) -> axum::Router
where
    R: MarketplaceRepository + 'static,
{
    marketplace_router(Arc::new(service))
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
