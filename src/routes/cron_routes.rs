use axum::{Router, routing::get};
use crate::{AppState, controllers::cron_controller};

pub fn add_routes(router: Router<AppState>) -> Router<AppState> {
    router.route(
        "/api/cron/check-alerts",
        get(cron_controller::check_alerts).post(cron_controller::check_alerts),
    )
}
