pub mod health;
pub mod password_reset;
pub mod profile;
pub mod register;
pub mod search;
pub mod sign_in;

pub use health::health_check;
pub use password_reset::{request_password_reset, reset_password, validate_reset_token};
pub use profile::{delete_account, get_profile, update_profile};
pub use register::register;
pub use search::search_donors;
pub use sign_in::sign_in;
