//! Car-sharing marketplace: owners list cars and publish rental offers, renters book
//! them, and every booking moves through the `pending` → `active` → `overdue` /
//! `finished` lifecycle.

pub mod clock;
pub mod config;
pub mod error;
pub mod marketplace;
pub mod telemetry;
