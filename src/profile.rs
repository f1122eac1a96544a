//! User profiles: roles, setup, artisan applications and verification.

pub mod models;
pub mod store;
pub mod verification;

pub use models::{ArtisanApplication, ProfileSetup, Role, SampleImage, UserProfile, VerificationStatus};
pub use store::ProfileStore;
pub use verification::{GpsLocation, verify_artisan_identity};
