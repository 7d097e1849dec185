pub mod roles_seed;
pub mod settings_seed;
pub mod trip_purposes_seed;
