pub mod access_policy;
pub mod gateway;
pub mod identity;
pub mod registration;

pub use access_policy::{check_command_access, member_has_elevated_role, RoutingPolicy};
pub use gateway::{RconGateway, WhitelistGateway};
pub use identity::{IdentityResolver, MinecraftProfile, MojangResolver};
pub use registration::{Invoker, RegistrationManager, RegistrationRefusal};
