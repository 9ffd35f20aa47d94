pub mod registration_log;
pub mod whitelist_file;

pub use registration_log::{RegistrationLog, RegistrationRecord};
pub use whitelist_file::{WhitelistEntry, WhitelistFile};
