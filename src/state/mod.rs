pub mod verified_users;

pub use verified_users::{create_shared_verified_users, SharedVerifiedUsers, VerifiedUsers};
