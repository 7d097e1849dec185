pub mod approval_workflow_service;
pub mod company_service;
pub mod crud;
pub mod department_service;
pub mod device_service;
pub mod driver_service;
pub mod facility_service;
pub mod location_service;
pub mod meeting_service;
pub mod position_service;
pub mod role_service;
pub mod room_service;
pub mod settings_service;
pub mod transport_company_service;
pub mod transport_service;
pub mod trip_purpose_service;
pub mod user_service;
pub mod vehicle_service;
pub mod voucher_service;

pub use settings_service::SettingsStore;
