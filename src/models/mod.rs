pub mod contact;
pub mod donor;
pub mod user;
pub mod verification;

pub use contact::{is_valid_phone, normalize_email, normalize_phone};
pub use donor::{DonorSummary, NewDonor, ProfileUpdate, SearchFilters};
pub use user::User;
pub use verification::{PASSWORD_RESET_IDENTIFIER, VerificationRecord};
