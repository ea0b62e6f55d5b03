pub mod external_profile;
pub mod identity;

pub use external_profile::ExternalProfile;
pub use identity::Identity;
