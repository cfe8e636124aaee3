//! HTTP request handlers.
//!
//! - [`users`] - Users and their WeChat openid lookups
//! - [`vehicles`] - Registered vehicles
//! - [`bookings`] - Service bookings with status transitions
//! - [`vehicle_appointments`] - Visitor vehicle appointments
//! - [`banners`] - Home page banners (cached)
//! - [`notices`] - Notices with paging and latest listing (cached)
//! - [`status`] - Root, status, database test and health endpoints

pub mod banners;
pub mod bookings;
pub mod notices;
pub mod status;
pub mod users;
pub mod vehicle_appointments;
pub mod vehicles;

pub use status::{api_status_handler, db_test_handler, health_handler, root_handler};
