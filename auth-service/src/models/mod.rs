pub mod jwk;
pub mod session;
pub mod token;
pub mod user;
pub mod verification;

pub use jwk::JwkKey;
pub use session::UserSession;
pub use token::RefreshToken;
pub use user::User;
pub use verification::{EmailVerification, PasswordResetCode};
