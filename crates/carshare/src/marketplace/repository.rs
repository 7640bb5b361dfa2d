use super::domain::{Car, CarId, Offer, OfferId, Rent, RentId};

/// Storage abstraction so the service can run against memory or a database.
///
/// Uniqueness rules are part of the contract and must be enforced atomically with
/// the write (one lock, one transaction or a unique constraint), reporting
/// [`RepositoryError::Conflict`]:
/// * `insert_car` / `update_car_and_snapshot`: VIN already used by another car;
/// * `insert_offer`: the car already has an offer;
/// * `insert_rent`: the offer already has a rent that is not finished;
/// * `update_rent`: the stored rent is finished and the new record is not.
///
/// `update_car_and_snapshot` rewrites the car and the snapshot held by its offer in
/// one step; either both are stored or neither is.
///
/// Deletes cascade: a car takes its offer with it, an offer takes its rents.
pub trait MarketplaceRepository: Send + Sync {
    fn insert_car(&self, car: Car) -> Result<Car, RepositoryError>;
    fn update_car_and_snapshot(&self, car: Car) -> Result<(), RepositoryError>;
    fn fetch_car(&self, id: CarId) -> Result<Option<Car>, RepositoryError>;
    fn delete_car(&self, id: CarId) -> Result<Car, RepositoryError>;
    fn cars(&self) -> Result<Vec<Car>, RepositoryError>;

    fn insert_offer(&self, offer: Offer) -> Result<Offer, RepositoryError>;
    fn update_offer(&self, offer: Offer) -> Result<(), RepositoryError>;
    fn fetch_offer(&self, id: OfferId) -> Result<Option<Offer>, RepositoryError>;
    fn offer_for_car(&self, car: CarId) -> Result<Option<Offer>, RepositoryError>;
    fn delete_offer(&self, id: OfferId) -> Result<Offer, RepositoryError>;
    fn offers(&self) -> Result<Vec<Offer>, RepositoryError>;

    fn insert_rent(&self, rent: Rent) -> Result<Rent, RepositoryError>;
    fn update_rent(&self, rent: Rent) -> Result<(), RepositoryError>;
    fn fetch_rent(&self, id: RentId) -> Result<Option<Rent>, RepositoryError>;
    fn rents(&self) -> Result<Vec<Rent>, RepositoryError>;
    fn rents_for_offer(&self, offer: OfferId) -> Result<Vec<Rent>, RepositoryError>;
    /// Every rent whose status is not yet `finished`.
    fn open_rents(&self) -> Result<Vec<Rent>, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RepositoryError {
    #[error("record conflicts with an existing record")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}
