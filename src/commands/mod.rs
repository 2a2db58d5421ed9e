pub mod organization;
pub mod users;
