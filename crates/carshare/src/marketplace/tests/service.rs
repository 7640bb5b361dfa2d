use super::common::*;
use crate::marketplace::domain::{CarBrand, CarFilter, CarUpdate, OfferUpdate, RentStatus};
use crate::marketplace::repository::{MarketplaceRepository, RepositoryError};
use crate::marketplace::validation::FieldError;
use crate::marketplace::{BusinessRuleViolation, Entity, MarketplaceError};
use std::sync::Arc;

#[test]
fn create_car_normalizes_vin_and_rejects_duplicates() {
    let (service, _, _) = build_service();

    let car = service
        .create_car(&owner(), new_car(" 1hgcm82633a004352 "))
        .expect("car is listed");
    assert_eq!(car.vin, ACCORD_VIN);
    assert_eq!(car.owner, owner().user_id);

    match service.create_car(&stranger(), new_car(ACCORD_VIN)) {
        Err(MarketplaceError::BusinessRule(BusinessRuleViolation::DuplicateVin(vin))) => {
            assert_eq!(vin, ACCORD_VIN);
        }
        other => panic!("expected duplicate VIN, got {other:?}"),
    }
}

#[test]
fn create_car_reports_field_errors() {
    let (service, repository, _) = build_service();
    let mut submission = new_car("1HGCM82633A00435");
    submission.mileage = 2_000_000;
    submission.production_year = Some(2031);

    match service.create_car(&owner(), submission) {
        Err(MarketplaceError::Validation(errors)) => {
            assert_eq!(errors.get("vin"), &[FieldError::VinLength]);
            assert_eq!(errors.get("mileage"), &[FieldError::MileageTooHigh]);
            assert_eq!(errors.get("production_year"), &[FieldError::YearInFuture]);
        }
        other => panic!("expected validation failure, got {other:?}"),
    }
    assert!(repository.cars().expect("cars").is_empty());
}

#[test]
fn cars_are_visible_to_owner_and_admin_only() {
    let (service, _, _) = build_service();
    let car = service
        .create_car(&owner(), new_car(ACCORD_VIN))
        .expect("car is listed");

    assert!(service.get_car(&owner(), car.id).is_ok());
    assert!(service.get_car(&admin(), car.id).is_ok());
    assert!(matches!(
        service.get_car(&stranger(), car.id),
        Err(MarketplaceError::Forbidden(_))
    ));

    assert_eq!(
        service
            .list_cars(&stranger(), &CarFilter::default())
            .expect("list")
            .len(),
        0
    );
    assert_eq!(
        service
            .list_cars(&admin(), &CarFilter::default())
            .expect("list")
            .len(),
        1
    );
}

#[test]
fn list_cars_applies_brand_and_model_filter() {
    let (service, _, _) = build_service();
    service
        .create_car(&owner(), new_car(ACCORD_VIN))
        .expect("accord");
    let mut elantra = new_car(ELANTRA_VIN);
    elantra.brand = CarBrand::Hyundai;
    elantra.model = "Elantra".to_string();
    service.create_car(&owner(), elantra).expect("elantra");

    let by_brand = CarFilter {
        brand: Some(CarBrand::Hyundai),
        model: None,
    };
    let hits = service.list_cars(&owner(), &by_brand).expect("list");
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].model, "Elantra");

    let by_model = CarFilter {
        brand: None,
        model: Some("acc".to_string()),
    };
    let hits = service.list_cars(&owner(), &by_model).expect("list");
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].vin, ACCORD_VIN);
}

#[test]
fn update_car_refreshes_offer_snapshot() {
    let (service, _, _) = build_service();
    let (car, offer) = listed_offer(&service, ACCORD_VIN);

    let updated = service
        .update_car(
            &owner(),
            car.id,
            CarUpdate {
                model: Some("Accord Tourer".to_string()),
                mileage: Some(130_000),
                ..CarUpdate::default()
            },
        )
        .expect("update succeeds");
    assert_eq!(updated.model, "Accord Tourer");
    assert_eq!(updated.vin, ACCORD_VIN);

    let stored_offer = service.get_offer(offer.id).expect("offer");
    assert_eq!(stored_offer.car.model, "Accord Tourer");
}

#[test]
fn update_car_keeps_offer_snapshot_in_step_when_offer_writes_fail() {
    let repository = Arc::new(FlakyRepository::default());
    let service = service_over(repository.clone());
    let (car, offer) = listed_offer(&service, ACCORD_VIN);
    repository.fail_offer_writes();

    let updated = service
        .update_car(
            &owner(),
            car.id,
            CarUpdate {
                model: Some("Accord Tourer".to_string()),
                ..CarUpdate::default()
            },
        )
        .expect("car update does not go through offer writes");

    let stored_car = repository.fetch_car(car.id).expect("fetch").expect("car");
    let stored_offer = repository.fetch_offer(offer.id).expect("fetch").expect("offer");
    assert_eq!(stored_car, updated);
    assert_eq!(stored_offer.car, stored_car.snapshot());
}

#[test]
fn rejected_car_update_leaves_car_and_offer_untouched() {
    let (service, repository, _) = build_service();
    let (car, offer) = listed_offer(&service, ACCORD_VIN);
    service
        .create_car(&owner(), new_car(INTEGRA_VIN))
        .expect("integra");

    let clash = CarUpdate {
        vin: Some(INTEGRA_VIN.to_string()),
        model: Some("Integra".to_string()),
        ..CarUpdate::default()
    };
    assert!(service.update_car(&owner(), car.id, clash).is_err());

    let stored_car = repository.fetch_car(car.id).expect("fetch").expect("car");
    let stored_offer = repository.fetch_offer(offer.id).expect("fetch").expect("offer");
    assert_eq!(stored_car, car);
    assert_eq!(stored_offer.car, car.snapshot());
}

#[test]
fn update_car_can_clear_the_production_year() {
    let (service, _, _) = build_service();
    let car = service
        .create_car(&owner(), new_car(ACCORD_VIN))
        .expect("car is listed");

    let kept = service
        .update_car(&owner(), car.id, CarUpdate::default())
        .expect("empty update");
    assert_eq!(kept.production_year, Some(2003));

    let cleared = service
        .update_car(
            &owner(),
            car.id,
            CarUpdate {
                production_year: Some(None),
                ..CarUpdate::default()
            },
        )
        .expect("year cleared");
    assert_eq!(cleared.production_year, None);
    assert_eq!(
        service.get_car(&owner(), car.id).expect("car").production_year,
        None
    );
}

#[test]
fn update_car_guards_vin_uniqueness_and_ownership() {
    let (service, _, _) = build_service();
    service
        .create_car(&owner(), new_car(ACCORD_VIN))
        .expect("accord");
    let integra = service
        .create_car(&owner(), new_car(INTEGRA_VIN))
        .expect("integra");

    let steal_vin = CarUpdate {
        vin: Some(ACCORD_VIN.to_lowercase()),
        ..CarUpdate::default()
    };
    assert!(matches!(
        service.update_car(&owner(), integra.id, steal_vin),
        Err(MarketplaceError::BusinessRule(
            BusinessRuleViolation::DuplicateVin(_)
        ))
    ));

    assert!(matches!(
        service.update_car(&stranger(), integra.id, CarUpdate::default()),
        Err(MarketplaceError::Forbidden(_))
    ));
}

#[test]
fn one_offer_per_car() {
    let (service, _, _) = build_service();
    let (car, _) = listed_offer(&service, ACCORD_VIN);

    match service.create_offer(&owner(), new_offer(car.id)) {
        Err(MarketplaceError::BusinessRule(BusinessRuleViolation::CarAlreadyOffered(id))) => {
            assert_eq!(id, car.id);
        }
        other => panic!("expected a second offer to be refused, got {other:?}"),
    }
}

#[test]
fn offers_can_only_be_published_for_own_cars() {
    let (service, _, _) = build_service();
    let car = service
        .create_car(&owner(), new_car(ACCORD_VIN))
        .expect("car");

    assert!(matches!(
        service.create_offer(&stranger(), new_offer(car.id)),
        Err(MarketplaceError::Forbidden(_))
    ));
    assert!(matches!(
        service.create_offer(&owner(), new_offer(crate::marketplace::CarId(u64::MAX))),
        Err(MarketplaceError::NotFound(Entity::Car(_)))
    ));
}

#[test]
fn offer_price_is_validated_on_create_and_update() {
    let (service, _, _) = build_service();
    let car = service
        .create_car(&owner(), new_car(ACCORD_VIN))
        .expect("car");

    let mut cheap = new_offer(car.id);
    cheap.price = 9.99;
    match service.create_offer(&owner(), cheap) {
        Err(MarketplaceError::Validation(errors)) => {
            assert_eq!(errors.get("price"), &[FieldError::PriceTooLow]);
        }
        other => panic!("expected price validation, got {other:?}"),
    }

    let offer = service
        .create_offer(&owner(), new_offer(car.id))
        .expect("offer");
    let too_expensive = OfferUpdate {
        price: Some(100_000.01),
        ..OfferUpdate::default()
    };
    assert!(matches!(
        service.update_offer(&owner(), offer.id, too_expensive),
        Err(MarketplaceError::Validation(_))
    ));

    let repriced = service
        .update_offer(
            &owner(),
            offer.id,
            OfferUpdate {
                price: Some(100_000.0),
                description: None,
            },
        )
        .expect("upper bound is inclusive");
    assert_eq!(repriced.price, 100_000.0);
}

#[test]
fn list_offers_can_be_limited_to_own_listings() {
    let (service, _, _) = build_service();
    listed_offer(&service, ACCORD_VIN);

    assert_eq!(service.list_offers(&renter(), false).expect("all").len(), 1);
    assert!(service.list_offers(&renter(), true).expect("mine").is_empty());
    assert_eq!(service.list_offers(&owner(), true).expect("mine").len(), 1);
}

#[test]
fn booking_today_is_active_and_future_booking_pending() {
    let (service, _, _) = build_service();
    let (_, accord) = listed_offer(&service, ACCORD_VIN);
    let (_, integra) = listed_offer(&service, INTEGRA_VIN);

    let now = service
        .create_rent(&renter(), booking(accord.id, 0, 10))
        .expect("booking today");
    assert_eq!(now.status, RentStatus::Active);
    assert_eq!(now.rent_end, days(10));

    let later = service
        .create_rent(&renter(), booking(integra.id, 10, 10))
        .expect("booking later");
    assert_eq!(later.status, RentStatus::Pending);
    assert_eq!(later.rent_end, days(20));
}

#[test]
fn self_rental_is_refused_before_date_checks() {
    let (service, repository, _) = build_service();
    let (_, offer) = listed_offer(&service, ACCORD_VIN);

    let bad_dates = booking(offer.id, -5, 0);
    match service.create_rent(&owner(), bad_dates) {
        Err(MarketplaceError::BusinessRule(BusinessRuleViolation::SelfRental)) => {}
        other => panic!("expected self-rental refusal, got {other:?}"),
    }
    assert!(repository.rents().expect("rents").is_empty());
}

#[test]
fn booking_dates_are_validated() {
    let (service, _, _) = build_service();
    let (_, offer) = listed_offer(&service, ACCORD_VIN);

    match service.create_rent(&renter(), booking(offer.id, 15, 3)) {
        Err(MarketplaceError::Validation(errors)) => {
            assert_eq!(
                errors.get("rent_start"),
                &[FieldError::BeyondBookingWindow { window_days: 14 }]
            );
        }
        other => panic!("expected booking window failure, got {other:?}"),
    }

    match service.create_rent(&renter(), booking(offer.id, -1, 3)) {
        Err(MarketplaceError::Validation(errors)) => {
            assert_eq!(errors.get("rent_start"), &[FieldError::DateInPast]);
        }
        other => panic!("expected past date failure, got {other:?}"),
    }

    assert!(service
        .create_rent(&renter(), booking(offer.id, 14, 3))
        .is_ok());
}

#[test]
fn return_day_cannot_pass_the_maximum_from_today() {
    let (service, repository, _) = build_service();
    let (_, accord) = listed_offer(&service, ACCORD_VIN);
    let (_, integra) = listed_offer(&service, INTEGRA_VIN);

    match service.create_rent(&renter(), booking(accord.id, 10, 25)) {
        Err(MarketplaceError::Validation(errors)) => {
            assert_eq!(
                errors.get("rent_end"),
                &[FieldError::RentalTooLong { max_days: 30 }]
            );
            assert!(!errors.contains("duration"));
        }
        other => panic!("expected return day past today + 30 to fail, got {other:?}"),
    }
    assert!(repository.rents_for_offer(accord.id).expect("rents").is_empty());

    let rent = service
        .create_rent(&renter(), booking(integra.id, 5, 25))
        .expect("return day is exactly today + 30");
    assert_eq!(rent.rent_end, days(30));
}

#[test]
fn offer_cannot_be_double_booked_until_closed() {
    let (service, _, _) = build_service();
    let (_, offer) = listed_offer(&service, ACCORD_VIN);
    let first = service
        .create_rent(&renter(), booking(offer.id, 0, 5))
        .expect("first booking");

    match service.create_rent(&stranger(), booking(offer.id, 7, 2)) {
        Err(MarketplaceError::BusinessRule(BusinessRuleViolation::OfferUnavailable(id))) => {
            assert_eq!(id, offer.id);
        }
        other => panic!("expected offer to be unavailable, got {other:?}"),
    }

    service.close_rent(&renter(), first.id).expect("close");
    let second = service
        .create_rent(&stranger(), booking(offer.id, 7, 2))
        .expect("offer free after closing");
    assert_eq!(second.status, RentStatus::Pending);
}

#[test]
fn concurrent_bookings_yield_exactly_one_rent() {
    let (service, repository, _) = build_service();
    let (_, offer) = listed_offer(&service, ACCORD_VIN);
    let service = Arc::new(service);

    let handles: Vec<_> = (10..18)
        .map(|renter_id| {
            let service = service.clone();
            std::thread::spawn(move || {
                service.create_rent(
                    &crate::marketplace::Actor::user(renter_id),
                    booking(offer.id, 1, 3),
                )
            })
        })
        .collect();

    let outcomes: Vec<_> = handles
        .into_iter()
        .map(|handle| handle.join().expect("thread completes"))
        .collect();
    assert_eq!(outcomes.iter().filter(|outcome| outcome.is_ok()).count(), 1);
    assert!(outcomes.iter().all(|outcome| matches!(
        outcome,
        Ok(_) | Err(MarketplaceError::BusinessRule(
            BusinessRuleViolation::OfferUnavailable(_)
        ))
    )));
    assert_eq!(repository.rents_for_offer(offer.id).expect("rents").len(), 1);
}

#[test]
fn closing_finishes_rent_on_current_day() {
    let (service, _, clock) = build_service();
    let (_, offer) = listed_offer(&service, ACCORD_VIN);
    let rent = service
        .create_rent(&renter(), booking(offer.id, 0, 10))
        .expect("booking");

    clock.advance(3);
    let closed = service.close_rent(&owner(), rent.id).expect("owner closes");
    assert_eq!(closed.status, RentStatus::Finished);
    assert_eq!(closed.rent_end, days(3));
    assert!(closed.close_rent);

    clock.advance(5);
    let again = service.close_rent(&renter(), rent.id).expect("idempotent");
    assert_eq!(again, closed);
}

#[test]
fn strangers_cannot_see_or_close_rents() {
    let (service, _, _) = build_service();
    let (_, offer) = listed_offer(&service, ACCORD_VIN);
    let rent = service
        .create_rent(&renter(), booking(offer.id, 0, 2))
        .expect("booking");

    assert!(matches!(
        service.close_rent(&stranger(), rent.id),
        Err(MarketplaceError::Forbidden(_))
    ));
    assert!(service.get_rent(&owner(), rent.id).is_ok());
    assert!(service.get_rent(&admin(), rent.id).is_ok());
    assert!(service.list_rents(&stranger()).expect("list").is_empty());
    assert_eq!(service.list_rents(&renter()).expect("list").len(), 1);
}

#[test]
fn deleting_a_car_removes_offer_and_rents() {
    let (service, repository, _) = build_service();
    let (car, offer) = listed_offer(&service, ACCORD_VIN);
    service
        .create_rent(&renter(), booking(offer.id, 0, 2))
        .expect("booking");

    service.delete_car(&owner(), car.id).expect("delete");
    assert!(matches!(
        service.get_offer(offer.id),
        Err(MarketplaceError::NotFound(Entity::Offer(_)))
    ));
    assert!(repository.rents().expect("rents").is_empty());
}

#[test]
fn repository_outages_propagate() {
    let service = service_over(Arc::new(UnavailableRepository));

    match service.create_car(&owner(), new_car(ACCORD_VIN)) {
        Err(MarketplaceError::Repository(RepositoryError::Unavailable(reason))) => {
            assert!(reason.contains("offline"));
        }
        other => panic!("expected repository failure, got {other:?}"),
    }
    assert!(matches!(
        service.refresh_statuses(),
        Err(MarketplaceError::Repository(_))
    ));
}
