pub mod home_controller;
pub mod auth_controller;
pub mod alerts_controller;
pub mod price_controller;
pub mod cron_controller;
