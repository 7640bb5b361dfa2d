//! Car listings, rental offers and bookings.
//!
//! Submissions pass through [`guard::ListingGuard`] before anything is stored, the
//! repository enforces the uniqueness rules atomically, and rent status is derived by
//! [`lifecycle`] on every write and by the daily [`refresher::StatusRefresher`] sweep.

pub mod domain;
pub mod guard;
pub mod lifecycle;
pub mod memory;
pub mod refresher;
pub mod repository;
pub mod router;
pub mod service;
pub mod validation;

#[cfg(test)]
mod tests;

pub use domain::{
    Actor, Car, CarBrand, CarFilter, CarId, CarSnapshot, CarUpdate, NewCar, NewOffer, NewRent,
    Offer, OfferId, OfferUpdate, Rent, RentId, RentStatus, UserId,
};
pub use guard::{ListingGuard, RentalPolicy};
pub use lifecycle::compute_status;
pub use memory::InMemoryMarketplace;
pub use refresher::{RefreshSummary, StatusRefresher};
pub use repository::{MarketplaceRepository, RepositoryError};
pub use router::marketplace_router;
pub use service::{BusinessRuleViolation, Entity, MarketplaceError, MarketplaceService};
pub use validation::{FieldError, FieldErrors};
