pub mod admin_handlers;
pub mod auth_handlers;
pub mod extract;
pub mod health_handlers;
pub mod identity;
pub mod media_handlers;
pub mod pet_handlers;
pub mod site_handlers;
