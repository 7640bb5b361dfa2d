use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{info, warn};

use super::domain::{
    Actor, Car, CarFilter, CarId, CarUpdate, NewCar, NewOffer, NewRent, Offer, OfferId,
    OfferUpdate, Rent, RentId, UserId,
};
use super::guard::{ListingGuard, RentalPolicy};
use super::refresher::{RefreshSummary, StatusRefresher};
use super::repository::{MarketplaceRepository, RepositoryError};
use super::validation::{normalize_vin, FieldErrors};
use crate::clock::Clock;

static CAR_SEQUENCE: AtomicU64 = AtomicU64::new(1);
static OFFER_SEQUENCE: AtomicU64 = AtomicU64::new(1);
static RENT_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_car_id() -> CarId {
    CarId(CAR_SEQUENCE.fetch_add(1, Ordering::Relaxed))
}

fn next_offer_id() -> OfferId {
    OfferId(OFFER_SEQUENCE.fetch_add(1, Ordering::Relaxed))
}

fn next_rent_id() -> RentId {
    RentId(RENT_SEQUENCE.fetch_add(1, Ordering::Relaxed))
}

/// Service composing validation, the rent lifecycle and the repository.
pub struct MarketplaceService<R, C> {
    guard: ListingGuard,
    repository: Arc<R>,
    clock: Arc<C>,
}

impl<R, C> MarketplaceService<R, C>
where
    R: MarketplaceRepository + 'static,
    C: Clock + 'static,
{
    pub fn new(repository: Arc<R>, clock: Arc<C>, policy: RentalPolicy) -> Self {
        Self {
            guard: ListingGuard::with_policy(policy),
            repository,
            clock,
        }
    }

    pub fn policy(&self) -> &RentalPolicy {
        self.guard.policy()
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    pub fn refresher(&self) -> StatusRefresher<R> {
        StatusRefresher::new(Arc::clone(&self.repository))
    }

    /// Register a car for the acting user.
    pub fn create_car(&self, actor: &Actor, submission: NewCar) -> Result<Car, MarketplaceError> {
        let car = self.guard.car_from_submission(
            next_car_id(),
            actor.user_id,
            submission,
            self.today(),
        )?;

        let vin = car.vin.clone();
        let stored = match self.repository.insert_car(car) {
            Ok(car) => car,
            Err(RepositoryError::Conflict) => {
                warn!(%vin, "duplicate VIN refused");
                return Err(BusinessRuleViolation::DuplicateVin(vin).into());
            }
            Err(other) => return Err(other.into()),
        };

        info!(car_id = %stored.id, owner = %stored.owner, vin = %stored.vin, "car listed");
        Ok(stored)
    }

    pub fn get_car(&self, actor: &Actor, id: CarId) -> Result<Car, MarketplaceError> {
        self.car_managed_by(actor, id)
    }

    /// Owners see their own cars, admins see every car.
    pub fn list_cars(&self, actor: &Actor, filter: &CarFilter) -> Result<Vec<Car>, MarketplaceError> {
        Ok(self
            .repository
            .cars()?
            .into_iter()
            .filter(|car| actor.is_admin || car.owner == actor.user_id)
            .filter(|car| filter.matches(car))
            .collect())
    }

    pub fn update_car(
        &self,
        actor: &Actor,
        id: CarId,
        update: CarUpdate,
    ) -> Result<Car, MarketplaceError> {
        let mut car = self.car_managed_by(actor, id)?;

        if let Some(vin) = update.vin {
            car.vin = normalize_vin(&vin);
        }
        if let Some(brand) = update.brand {
            car.brand = brand;
        }
        if let Some(model) = update.model {
            car.model = model.trim().to_string();
        }
        if let Some(mileage) = update.mileage {
            car.mileage = mileage;
        }
        if let Some(year) = update.production_year {
            car.production_year = year;
        }

        self.guard.check_car(&car, self.today())?;

        match self.repository.update_car_and_snapshot(car.clone()) {
            Ok(()) => {}
            Err(RepositoryError::Conflict) => {
                return Err(BusinessRuleViolation::DuplicateVin(car.vin).into())
            }
            Err(other) => return Err(other.into()),
        }

        info!(car_id = %car.id, "car updated");
        Ok(car)
    }

    /// Remove a car together with its offer and that offer's rents.
    pub fn delete_car(&self, actor: &Actor, id: CarId) -> Result<Car, MarketplaceError> {
        self.car_managed_by(actor, id)?;
        let removed = self.repository.delete_car(id)?;
        info!(car_id = %removed.id, "car deleted");
        Ok(removed)
    }

    /// Publish an offer for one of the acting user's cars.
    pub fn create_offer(
        &self,
        actor: &Actor,
        submission: NewOffer,
    ) -> Result<Offer, MarketplaceError> {
        let car = self.car_managed_by(actor, submission.car)?;
        let description = submission.description.trim().to_string();
        self.guard.check_offer(&description, submission.price)?;

        if self.repository.offer_for_car(car.id)?.is_some() {
            return Err(BusinessRuleViolation::CarAlreadyOffered(car.id).into());
        }

        let offer = Offer {
            id: next_offer_id(),
            car: car.snapshot(),
            description,
            price: submission.price,
            owner: car.owner,
        };

        let stored = match self.repository.insert_offer(offer) {
            Ok(offer) => offer,
            Err(RepositoryError::Conflict) => {
                return Err(BusinessRuleViolation::CarAlreadyOffered(car.id).into())
            }
            Err(other) => return Err(other.into()),
        };

        info!(offer_id = %stored.id, car_id = %car.id, price = stored.price, "offer published");
        Ok(stored)
    }

    /// Offers form the public catalogue.
    pub fn get_offer(&self, id: OfferId) -> Result<Offer, MarketplaceError> {
        self.repository
            .fetch_offer(id)?
            .ok_or(MarketplaceError::NotFound(Entity::Offer(id)))
    }

    pub fn list_offers(&self, actor: &Actor, mine_only: bool) -> Result<Vec<Offer>, MarketplaceError> {
        Ok(self
            .repository
            .offers()?
            .into_iter()
            .filter(|offer| !mine_only || offer.owner == actor.user_id)
            .collect())
    }

    pub fn update_offer(
        &self,
        actor: &Actor,
        id: OfferId,
        update: OfferUpdate,
    ) -> Result<Offer, MarketplaceError> {
        let mut offer = self.offer_managed_by(actor, id)?;
        if let Some(description) = update.description {
            offer.description = description.trim().to_string();
        }
        if let Some(price) = update.price {
            offer.price = price;
        }

        self.guard.check_offer(&offer.description, offer.price)?;
        self.repository.update_offer(offer.clone())?;
        info!(offer_id = %offer.id, price = offer.price, "offer updated");
        Ok(offer)
    }

    /// Withdraw an offer; its rents go with it.
    pub fn delete_offer(&self, actor: &Actor, id: OfferId) -> Result<Offer, MarketplaceError> {
        self.offer_managed_by(actor, id)?;
        let removed = self.repository.delete_offer(id)?;
        info!(offer_id = %removed.id, "offer withdrawn");
        Ok(removed)
    }

    /// Book an offer. Ownership is checked before dates so a self-rental is refused
    /// whatever dates it carries.
    pub fn create_rent(&self, actor: &Actor, booking: NewRent) -> Result<Rent, MarketplaceError> {
        let offer = self.get_offer(booking.offer)?;
        if offer.owner == actor.user_id {
            warn!(offer_id = %offer.id, user_id = %actor.user_id, "self-rental refused");
            return Err(BusinessRuleViolation::SelfRental.into());
        }

        let today = self.today();
        self.guard.check_booking(&booking, today)?;

        let busy = self
            .repository
            .rents_for_offer(offer.id)?
            .iter()
            .any(Rent::blocks_offer);
        if busy {
            return Err(BusinessRuleViolation::OfferUnavailable(offer.id).into());
        }

        let rent = Rent::book(next_rent_id(), actor.user_id, &booking, today);
        let stored = match self.repository.insert_rent(rent) {
            Ok(rent) => rent,
            Err(RepositoryError::Conflict) => {
                return Err(BusinessRuleViolation::OfferUnavailable(offer.id).into())
            }
            Err(RepositoryError::NotFound) => {
                return Err(MarketplaceError::NotFound(Entity::Offer(offer.id)))
            }
            Err(other) => return Err(other.into()),
        };

        info!(
            rent_id = %stored.id,
            offer_id = %stored.offer,
            renter = %stored.renter,
            status = stored.status.label(),
            rent_end = %stored.rent_end,
            "rent booked"
        );
        Ok(stored)
    }

    pub fn get_rent(&self, actor: &Actor, id: RentId) -> Result<Rent, MarketplaceError> {
        self.rent_visible_to(actor, id)
    }

    /// Renters see their own rents, admins see every rent.
    pub fn list_rents(&self, actor: &Actor) -> Result<Vec<Rent>, MarketplaceError> {
        Ok(self
            .repository
            .rents()?
            .into_iter()
            .filter(|rent| actor.is_admin || rent.renter == actor.user_id)
            .collect())
    }

    /// End a rental early. Closing an already finished rent returns it unchanged.
    pub fn close_rent(&self, actor: &Actor, id: RentId) -> Result<Rent, MarketplaceError> {
        let mut rent = self.rent_visible_to(actor, id)?;
        if rent.status.is_terminal() {
            return Ok(rent);
        }

        rent.close_rent = true;
        rent.apply_lifecycle(self.today());
        self.repository.update_rent(rent.clone())?;
        info!(rent_id = %rent.id, rent_end = %rent.rent_end, "rent closed");
        Ok(rent)
    }

    /// Run the status sweep for today's date.
    pub fn refresh_statuses(&self) -> Result<RefreshSummary, MarketplaceError> {
        Ok(self.refresher().sweep(self.today())?)
    }

    fn car_managed_by(&self, actor: &Actor, id: CarId) -> Result<Car, MarketplaceError> {
        let car = self
            .repository
            .fetch_car(id)?
            .ok_or(MarketplaceError::NotFound(Entity::Car(id)))?;
        if !actor.can_manage(car.owner) {
            return Err(MarketplaceError::Forbidden(actor.user_id));
        }
        Ok(car)
    }

    fn offer_managed_by(&self, actor: &Actor, id: OfferId) -> Result<Offer, MarketplaceError> {
        let offer = self.get_offer(id)?;
        if !actor.can_manage(offer.owner) {
            return Err(MarketplaceError::Forbidden(actor.user_id));
        }
        Ok(offer)
    }

    /// The renter, the owner of the rented offer and admins may see or close a rent.
    fn rent_visible_to(&self, actor: &Actor, id: RentId) -> Result<Rent, MarketplaceError> {
        let rent = self
            .repository
            .fetch_rent(id)?
            .ok_or(MarketplaceError::NotFound(Entity::Rent(id)))?;
        if actor.can_manage(rent.renter) {
            return Ok(rent);
        }

        let offer_owner = self
            .repository
            .fetch_offer(rent.offer)?
            .map(|offer| offer.owner);
        if offer_owner == Some(actor.user_id) {
            return Ok(rent);
        }
        Err(MarketplaceError::Forbidden(actor.user_id))
    }
}

/// Record kinds addressed by surrogate id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    Car(CarId),
    Offer(OfferId),
    Rent(RentId),
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Entity::Car(id) => write!(f, "car {id}"),
            Entity::Offer(id) => write!(f, "offer {id}"),
            Entity::Rent(id) => write!(f, "rent {id}"),
        }
    }
}

/// Marketplace rules that reject an otherwise valid request.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BusinessRuleViolation {
    #[error("you cannot rent your own car")]
    SelfRental,
    #[error("offer {0} is already booked")]
    OfferUnavailable(OfferId),
    #[error("car {0} already has an offer")]
    CarAlreadyOffered(CarId),
    #[error("a car with VIN {0} is already registered")]
    DuplicateVin(String),
}

/// Error raised by the marketplace service.
#[derive(Debug, thiserror::Error)]
pub enum MarketplaceError {
    #[error(transparent)]
    Validation(#[from] FieldErrors),
    #[error(transparent)]
    BusinessRule(#[from] BusinessRuleViolation),
    #[error("{0} not found")]
    NotFound(Entity),
    #[error("user {0} is not allowed to modify this record")]
    Forbidden(UserId),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
