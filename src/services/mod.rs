pub mod auth;
pub mod clock;
pub mod email;
pub mod password;
pub mod password_reset;

pub use auth::{AuthError, AuthService};
pub use clock::{Clock, SystemClock};
pub use email::{EmailMessage, EmailSender, LogEmailSender, ResendEmailSender};
pub use password::{Argon2PasswordHasher, PasswordHasher};
pub use password_reset::{PasswordResetCoordinator, ResetError, ResetSettings};
