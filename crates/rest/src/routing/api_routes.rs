//! API route configuration.

use axum::{
    Router,
    routing::{get, patch, put},
};

use crate::handlers::{
    self, banners, bookings, notices, users, vehicle_appointments as appointments, vehicles,
};
use crate::state::AppState;

/// Creates all API routes.
///
/// # Routes
///
/// ## Service
/// - `GET /` - Welcome message
/// - `GET /health` - Health check
/// - `GET /api/status` - Service status
/// - `GET /api/db-test` - Probe the database now
///
/// ## Collections
/// - `/api/users`, `/api/vehicles`, `/api/bookings`,
///   `/api/vehicle-appointments`, `/api/banners`, `/api/notices`, each with
///   `GET`/`POST` at the root and `GET`/`PUT`/`DELETE` on `/{id}`, plus the
///   lookups and status changes listed inline below.
pub fn create_routes(state: AppState) -> Router {
    Router::new()
        // Service routes
        .route("/", get(handlers::root_handler))
        .route("/health", get(handlers::health_handler))
        .route("/api/status", get(handlers::api_status_handler))
        .route("/api/db-test", get(handlers::db_test_handler))
        // Users
        .route(
            "/api/users",
            get(users::list_users_handler).post(users::create_user_handler),
        )
        .route(
            "/api/users/openid/{openid}",
            get(users::get_user_by_openid_handler),
        )
        .route(
            "/api/users/{id}",
            get(users::get_user_handler)
                .put(users::update_user_handler)
                .delete(users::delete_user_handler),
        )
        // Vehicles
        .route(
            "/api/vehicles",
            get(vehicles::list_vehicles_handler).post(vehicles::create_vehicle_handler),
        )
        .route(
            "/api/vehicles/user/{user_id}",
            get(vehicles::list_user_vehicles_handler),
        )
        .route(
            "/api/vehicles/plate/{plate_number}",
            get(vehicles::get_vehicle_by_plate_handler),
        )
        .route(
            "/api/vehicles/{id}",
            get(vehicles::get_vehicle_handler)
                .put(vehicles::update_vehicle_handler)
                .delete(vehicles::delete_vehicle_handler),
        )
        // Bookings
        .route(
            "/api/bookings",
            get(bookings::list_bookings_handler).post(bookings::create_booking_handler),
        )
        .route(
            "/api/bookings/user/{user_id}",
            get(bookings::list_user_bookings_handler),
        )
        .route(
            "/api/bookings/date/{date}",
            get(bookings::list_bookings_by_date_handler),
        )
        .route(
            "/api/bookings/{id}",
            get(bookings::get_booking_handler)
                .put(bookings::update_booking_handler)
                .delete(bookings::delete_booking_handler),
        )
        .route(
            "/api/bookings/{id}/status",
            put(bookings::update_booking_status_handler),
        )
        // Vehicle appointments
        .route(
            "/api/vehicle-appointments",
            get(appointments::list_appointments_handler)
                .post(appointments::create_appointment_handler),
        )
        .route(
            "/api/vehicle-appointments/phone/{phone}",
            get(appointments::list_appointments_by_phone_handler),
        )
        .route(
            "/api/vehicle-appointments/license/{license_plate}",
            get(appointments::list_appointments_by_license_handler),
        )
        .route(
            "/api/vehicle-appointments/date/{date}",
            get(appointments::list_appointments_by_date_handler),
        )
        .route(
            "/api/vehicle-appointments/user/{user_id}",
            get(appointments::list_user_appointments_handler),
        )
        .route(
            "/api/vehicle-appointments/{id}",
            get(appointments::get_appointment_handler)
                .put(appointments::update_appointment_handler)
                .delete(appointments::delete_appointment_handler),
        )
        .route(
            "/api/vehicle-appointments/{id}/status",
            put(appointments::update_appointment_status_handler),
        )
        // Banners
        .route(
            "/api/banners",
            get(banners::list_banners_handler).post(banners::create_banner_handler),
        )
        .route("/api/banners/all", get(banners::list_all_banners_handler))
        .route(
            "/api/banners/{id}",
            get(banners::get_banner_handler)
                .put(banners::update_banner_handler)
                .delete(banners::delete_banner_handler),
        )
        .route(
            "/api/banners/{id}/status",
            patch(banners::update_banner_status_handler),
        )
        // Notices
        .route(
            "/api/notices",
            get(notices::list_notices_handler).post(notices::create_notice_handler),
        )
        .route("/api/notices/latest", get(notices::latest_notices_handler))
        .route("/api/notices/all", get(notices::list_all_notices_handler))
        .route(
            "/api/notices/status",
            get(notices::notice_service_status_handler),
        )
        .route(
            "/api/notices/{id}",
            get(notices::get_notice_handler)
                .put(notices::update_notice_handler)
                .delete(notices::delete_notice_handler),
        )
        .route(
            "/api/notices/{id}/status",
            patch(notices::update_notice_status_handler),
        )
        // State
        .with_state(state)
}
