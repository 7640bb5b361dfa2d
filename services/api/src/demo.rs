use carshare::clock::{Clock, FixedClock};
use carshare::error::AppError;
use carshare::marketplace::{
    Actor, CarBrand, InMemoryMarketplace, MarketplaceError, MarketplaceService, NewCar, NewOffer,
    NewRent, RentStatus, RentalPolicy,
};
use chrono::{Local, NaiveDate};
use clap::Args;
use std::sync::Arc;

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// Simulated start day (YYYY-MM-DD). Defaults to today.
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) today: Option<NaiveDate>,
    /// Days between today and the start of the booking.
    #[arg(long, default_value_t = 1)]
    pub(crate) lead_days: u32,
    /// Length of the booking in days.
    #[arg(long, default_value_t = 3)]
    pub(crate) duration: u32,
    /// Number of days to simulate after booking.
    #[arg(long, default_value_t = 7)]
    pub(crate) days: u32,
    /// Close the rental on this simulated day instead of letting it run overdue.
    #[arg(long)]
    pub(crate) close_on_day: Option<u32>,
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        today,
        lead_days,
        duration,
        days,
        close_on_day,
    } = args;

    let today = today.unwrap_or_else(|| Local::now().date_naive());
    let clock = Arc::new(FixedClock::new(today));
    let service = MarketplaceService::new(
        Arc::new(InMemoryMarketplace::default()),
        clock.clone(),
        RentalPolicy::default(),
    );
    let owner = Actor::user(1);
    let renter = Actor::user(2);

    println!("Car-sharing demo starting {today}");
    let car = service.create_car(
        &owner,
        NewCar {
            vin: "1HGCM82633A004352".to_string(),
            brand: CarBrand::Honda,
            model: "Accord".to_string(),
            mileage: 148_000,
            production_year: Some(2003),
        },
    )?;
    println!("- Listed {car}");

    let offer = service.create_offer(
        &owner,
        NewOffer {
            car: car.id,
            description: "Family sedan, child seat on request.".to_string(),
            price: 42.0,
        },
    )?;
    println!("- Published offer {} -> {offer}", offer.id);

    let booking = NewRent {
        offer: offer.id,
        rent_start: today + chrono::Duration::days(i64::from(lead_days)),
        duration,
    };

    if let Err(err) = service.create_rent(&owner, booking.clone()) {
        println!("- Owner booking own car rejected: {err}");
    }

    let rent = match service.create_rent(&renter, booking.clone()) {
        Ok(rent) => rent,
        Err(MarketplaceError::Validation(errors)) => {
            println!("- Booking rejected:");
            for (field, messages) in errors.messages() {
                println!("    {field}: {}", messages.join(" "));
            }
            return Ok(());
        }
        Err(err) => return Err(err.into()),
    };
    println!(
        "- Booked rent {} from {} to {} ({})",
        rent.id, rent.rent_start, rent.rent_end, rent.status
    );

    if let Err(err) = service.create_rent(&Actor::user(3), booking) {
        println!("- Second renter rejected: {err}");
    }

    println!("\nDay-by-day status");
    let mut previous = rent.status;
    for day in 1..=days {
        clock.advance(1);
        if close_on_day == Some(day) {
            let closed = service.close_rent(&renter, rent.id)?;
            println!(
                "  day {day} ({}): renter returned the car, rent_end {}",
                clock.today(),
                closed.rent_end
            );
        }

        let summary = service.refresh_statuses()?;
        let current = service.get_rent(&renter, rent.id)?;
        let marker = if current.status != previous { " *" } else { "" };
        println!(
            "  day {day} ({}): {}{marker} [scanned {}, updated {}]",
            clock.today(),
            current.status,
            summary.scanned,
            summary.updated
        );
        previous = current.status;

        if current.status == RentStatus::Finished {
            break;
        }
    }

    let stored = service.get_rent(&admin_view(), rent.id)?;
    match serde_json::to_string_pretty(&stored) {
        Ok(json) => println!("\nFinal rent payload:\n{json}"),
        Err(err) => println!("\nFinal rent payload unavailable: {err}"),
    }

    Ok(())
}

fn admin_view() -> Actor {
    Actor::admin(0)
}
