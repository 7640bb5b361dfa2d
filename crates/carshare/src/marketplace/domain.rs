use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

macro_rules! surrogate_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

surrogate_id!(
    /// Account identifier issued by the (external) authentication layer.
    UserId
);
surrogate_id!(CarId);
surrogate_id!(OfferId);
surrogate_id!(RentId);

/// The user on whose behalf an operation runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub user_id: UserId,
    #[serde(default)]
    pub is_admin: bool,
}

impl Actor {
    pub fn user(id: u64) -> Self {
        Self {
            user_id: UserId(id),
            is_admin: false,
        }
    }

    pub fn admin(id: u64) -> Self {
        Self {
            user_id: UserId(id),
            is_admin: true,
        }
    }

    /// Owners manage their own records; admins manage everything.
    pub fn can_manage(&self, owner: UserId) -> bool {
        self.is_admin || self.user_id == owner
    }
}

/// Manufacturers accepted on a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CarBrand {
    Volkswagen,
    #[serde(rename = "BMW")]
    Bmw,
    Audi,
    Ford,
    Opel,
    #[serde(rename = "Mercedes-Benz")]
    MercedesBenz,
    Renault,
    Skoda,
    Toyota,
    Peugeot,
    Hyundai,
    #[serde(rename = "Citroën", alias = "Citroen")]
    Citroen,
    Volvo,
    Nissan,
    Fiat,
    Seat,
    Mazda,
    Honda,
    Suzuki,
    Jeep,
    Dacia,
    Mitsubishi,
    #[serde(rename = "MINI", alias = "Mini")]
    Mini,
    Other,
}

impl CarBrand {
    pub const ALL: [CarBrand; 24] = [
        CarBrand::Volkswagen,
        CarBrand::Bmw,
        CarBrand::Audi,
        CarBrand::Ford,
        CarBrand::Opel,
        CarBrand::MercedesBenz,
        CarBrand::Renault,
        CarBrand::Skoda,
        CarBrand::Toyota,
        CarBrand::Peugeot,
        CarBrand::Hyundai,
        CarBrand::Citroen,
        CarBrand::Volvo,
        CarBrand::Nissan,
        CarBrand::Fiat,
        CarBrand::Seat,
        CarBrand::Mazda,
        CarBrand::Honda,
        CarBrand::Suzuki,
        CarBrand::Jeep,
        CarBrand::Dacia,
        CarBrand::Mitsubishi,
        CarBrand::Mini,
        CarBrand::Other,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            CarBrand::Volkswagen => "Volkswagen",
            CarBrand::Bmw => "BMW",
            CarBrand::Audi => "Audi",
            CarBrand::Ford => "Ford",
            CarBrand::Opel => "Opel",
            CarBrand::MercedesBenz => "Mercedes-Benz",
            CarBrand::Renault => "Renault",
            CarBrand::Skoda => "Skoda",
            CarBrand::Toyota => "Toyota",
            CarBrand::Peugeot => "Peugeot",
            CarBrand::Hyundai => "Hyundai",
            CarBrand::Citroen => "Citroën",
            CarBrand::Volvo => "Volvo",
            CarBrand::Nissan => "Nissan",
            CarBrand::Fiat => "Fiat",
            CarBrand::Seat => "Seat",
            CarBrand::Mazda => "Mazda",
            CarBrand::Honda => "Honda",
            CarBrand::Suzuki => "Suzuki",
            CarBrand::Jeep => "Jeep",
            CarBrand::Dacia => "Dacia",
            CarBrand::Mitsubishi => "Mitsubishi",
            CarBrand::Mini => "MINI",
            CarBrand::Other => "Other",
        }
    }

    /// Case-insensitive lookup by display label.
    pub fn from_label(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        Self::ALL
            .into_iter()
            .find(|brand| brand.label().eq_ignore_ascii_case(raw))
            .or_else(|| raw.eq_ignore_ascii_case("citroen").then_some(CarBrand::Citroen))
    }
}

impl fmt::Display for CarBrand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A vehicle registered by its owner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Car {
    pub id: CarId,
    pub vin: String,
    pub brand: CarBrand,
    pub model: String,
    pub mileage: u32,
    pub production_year: Option<i32>,
    pub owner: UserId,
}

impl Car {
    pub fn snapshot(&self) -> CarSnapshot {
        CarSnapshot {
            car_id: self.id,
            brand: self.brand,
            model: self.model.clone(),
            vin: self.vin.clone(),
        }
    }
}

impl fmt::Display for Car {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Model: {} {}, vin number: ({})",
            self.model, self.brand, self.vin
        )
    }
}

/// Listing payload for a new car.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCar {
    pub vin: String,
    pub brand: CarBrand,
    pub model: String,
    pub mileage: u32,
    #[serde(default)]
    pub production_year: Option<i32>,
}

/// Partial update; absent fields keep their stored value.
///
/// `production_year` distinguishes an absent key (`None`) from an explicit
/// `null` (`Some(None)`), which clears the stored year.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CarUpdate {
    #[serde(default)]
    pub vin: Option<String>,
    #[serde(default)]
    pub brand: Option<CarBrand>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub mileage: Option<u32>,
    #[serde(
        default,
        deserialize_with = "present_or_null",
        skip_serializing_if = "Option::is_none"
    )]
    pub production_year: Option<Option<i32>>,
}

fn present_or_null<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Listing filter mirroring the catalogue search form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CarFilter {
    #[serde(default)]
    pub brand: Option<CarBrand>,
    #[serde(default)]
    pub model: Option<String>,
}

impl CarFilter {
    pub fn matches(&self, car: &Car) -> bool {
        if let Some(brand) = self.brand {
            if car.brand != brand {
                return false;
            }
        }

        match self.model.as_deref().map(str::trim) {
            Some(needle) if !needle.is_empty() => car
                .model
                .to_lowercase()
                .contains(&needle.to_lowercase()),
            _ => true,
        }
    }
}

/// Car details copied onto an offer so listings render without a join.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CarSnapshot {
    pub car_id: CarId,
    pub brand: CarBrand,
    pub model: String,
    pub vin: String,
}

/// A priced rental listing for exactly one car.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Offer {
    pub id: OfferId,
    pub car: CarSnapshot,
    pub description: String,
    pub price: f64,
    pub owner: UserId,
}

impl fmt::Display for Offer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Price: ({:?}), car:({} {})",
            self.price, self.car.model, self.car.brand
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewOffer {
    pub car: CarId,
    #[serde(default)]
    pub description: String,
    pub price: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OfferUpdate {
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub price: Option<f64>,
}

/// Rental lifecycle states. `Finished` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RentStatus {
    Pending,
    Active,
    Finished,
    Overdue,
}

impl RentStatus {
    pub const fn label(self) -> &'static str {
        match self {
            RentStatus::Pending => "pending",
            RentStatus::Active => "active",
            RentStatus::Finished => "finished",
            RentStatus::Overdue => "overdue",
        }
    }

    pub const fn is_terminal(self) -> bool {
        matches!(self, RentStatus::Finished)
    }
}

impl fmt::Display for RentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A booking of an offer by a renter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rent {
    pub id: RentId,
    pub offer: OfferId,
    pub renter: UserId,
    pub rent_start: NaiveDate,
    pub duration: u32,
    pub rent_end: NaiveDate,
    pub status: RentStatus,
    pub close_rent: bool,
}

impl fmt::Display for Rent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Rent status: {}, rent duration: ({}), offer: {}, user: {}",
            self.status, self.duration, self.offer, self.renter
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewRent {
    pub offer: OfferId,
    pub rent_start: NaiveDate,
    pub duration: u32,
}
