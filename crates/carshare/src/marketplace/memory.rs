use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use super::domain::{Car, CarId, Offer, OfferId, Rent, RentId};
use super::repository::{MarketplaceRepository, RepositoryError};

#[derive(Debug, Default)]
struct Tables {
    cars: BTreeMap<CarId, Car>,
    offers: BTreeMap<OfferId, Offer>,
    rents: BTreeMap<RentId, Rent>,
}

impl Tables {
    fn vin_taken(&self, vin: &str, except: Option<CarId>) -> bool {
        self.cars
            .values()
            .any(|car| car.vin == vin && Some(car.id) != except)
    }

    fn remove_offer_cascade(&mut self, id: OfferId) -> Option<Offer> {
        let offer = self.offers.remove(&id)?;
        self.rents.retain(|_, rent| rent.offer != id);
        Some(offer)
    }
}

/// Process-local store. A single mutex makes every check-and-write atomic.
#[derive(Debug, Default, Clone)]
pub struct InMemoryMarketplace {
    tables: Arc<Mutex<Tables>>,
}

impl InMemoryMarketplace {
    fn lock(&self) -> Result<MutexGuard<'_, Tables>, RepositoryError> {
        self.tables
            .lock()
            .map_err(|_| RepositoryError::Unavailable("store lock poisoned".to_string()))
    }
}

impl MarketplaceRepository for InMemoryMarketplace {
    fn insert_car(&self, car: Car) -> Result<Car, RepositoryError> {
        let mut tables = self.lock()?;
        if tables.cars.contains_key(&car.id) || tables.vin_taken(&car.vin, None) {
            return Err(RepositoryError::Conflict);
        }
        tables.cars.insert(car.id, car.clone());
        Ok(car)
    }

    fn update_car_and_snapshot(&self, car: Car) -> Result<(), RepositoryError> {
        let mut tables = self.lock()?;
        if !tables.cars.contains_key(&car.id) {
            return Err(RepositoryError::NotFound);
        }
        if tables.vin_taken(&car.vin, Some(car.id)) {
            return Err(RepositoryError::Conflict);
        }
        let snapshot = car.snapshot();
        for offer in tables.offers.values_mut() {
            if offer.car.car_id == car.id {
                offer.car = snapshot.clone();
            }
        }
        tables.cars.insert(car.id, car);
        Ok(())
    }

    fn fetch_car(&self, id: CarId) -> Result<Option<Car>, RepositoryError> {
        Ok(self.lock()?.cars.get(&id).cloned())
    }

    fn delete_car(&self, id: CarId) -> Result<Car, RepositoryError> {
        let mut tables = self.lock()?;
        let car = tables.cars.remove(&id).ok_or(RepositoryError::NotFound)?;
        let offers: Vec<OfferId> = tables
            .offers
            .values()
            .filter(|offer| offer.car.car_id == id)
            .map(|offer| offer.id)
            .collect();
        for offer in offers {
            tables.remove_offer_cascade(offer);
        }
        Ok(car)
    }

    fn cars(&self) -> Result<Vec<Car>, RepositoryError> {
        Ok(self.lock()?.cars.values().cloned().collect())
    }

    fn insert_offer(&self, offer: Offer) -> Result<Offer, RepositoryError> {
        let mut tables = self.lock()?;
        if !tables.cars.contains_key(&offer.car.car_id) {
            return Err(RepositoryError::NotFound);
        }
        let car_taken = tables
            .offers
            .values()
            .any(|existing| existing.car.car_id == offer.car.car_id);
        if car_taken || tables.offers.contains_key(&offer.id) {
            return Err(RepositoryError::Conflict);
        }
        tables.offers.insert(offer.id, offer.clone());
        Ok(offer)
    }

    fn update_offer(&self, offer: Offer) -> Result<(), RepositoryError> {
        let mut tables = self.lock()?;
        match tables.offers.get_mut(&offer.id) {
            Some(slot) => {
                *slot = offer;
                Ok(())
            }
            None => Err(RepositoryError::NotFound),
        }
    }

    fn fetch_offer(&self, id: OfferId) -> Result<Option<Offer>, RepositoryError> {
        Ok(self.lock()?.offers.get(&id).cloned())
    }

    fn offer_for_car(&self, car: CarId) -> Result<Option<Offer>, RepositoryError> {
        Ok(self
            .lock()?
            .offers
            .values()
            .find(|offer| offer.car.car_id == car)
            .cloned())
    }

    fn delete_offer(&self, id: OfferId) -> Result<Offer, RepositoryError> {
        self.lock()?
            .remove_offer_cascade(id)
            .ok_or(RepositoryError::NotFound)
    }

    fn offers(&self) -> Result<Vec<Offer>, RepositoryError> {
        Ok(self.lock()?.offers.values().cloned().collect())
    }

    fn insert_rent(&self, rent: Rent) -> Result<Rent, RepositoryError> {
        let mut tables = self.lock()?;
        if !tables.offers.contains_key(&rent.offer) {
            return Err(RepositoryError::NotFound);
        }
        let offer_busy = tables
            .rents
            .values()
            .any(|existing| existing.offer == rent.offer && existing.blocks_offer());
        if offer_busy || tables.rents.contains_key(&rent.id) {
            return Err(RepositoryError::Conflict);
        }
        tables.rents.insert(rent.id, rent.clone());
        Ok(rent)
    }

    fn update_rent(&self, rent: Rent) -> Result<(), RepositoryError> {
        let mut tables = self.lock()?;
        match tables.rents.get_mut(&rent.id) {
            // finished rents only accept finished records
            Some(slot) if slot.status.is_terminal() && !rent.status.is_terminal() => {
                Err(RepositoryError::Conflict)
            }
            Some(slot) => {
                *slot = rent;
                Ok(())
            }
            None => Err(RepositoryError::NotFound),
        }
    }

    fn fetch_rent(&self, id: RentId) -> Result<Option<Rent>, RepositoryError> {
        Ok(self.lock()?.rents.get(&id).cloned())
    }

    fn rents(&self) -> Result<Vec<Rent>, RepositoryError> {
        Ok(self.lock()?.rents.values().cloned().collect())
    }

    fn rents_for_offer(&self, offer: OfferId) -> Result<Vec<Rent>, RepositoryError> {
        Ok(self
            .lock()?
            .rents
            .values()
            .filter(|rent| rent.offer == offer)
            .cloned()
            .collect())
    }

    fn open_rents(&self) -> Result<Vec<Rent>, RepositoryError> {
        Ok(self
            .lock()?
            .rents
            .values()
            .filter(|rent| !rent.status.is_terminal())
            .cloned()
            .collect())
    }
}
