pub mod config;
pub mod directory;
pub mod errors;
pub mod linguistics;
pub mod wfh;

pub use directory::{UserDirectory, UserDirectorySource, UserProfile};
pub use errors::IntegrationError;
pub use linguistics::{Linguistics, LookupKind, TranslationDirection};
pub use wfh::WfhEpoch;
