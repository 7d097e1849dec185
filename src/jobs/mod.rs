pub mod oauth_state_cleanup;
pub mod scim_scheduler;
