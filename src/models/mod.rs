pub mod candidate;
pub mod platform;
pub mod style;
pub mod version;

pub use candidate::{ClientProfile, ContentId, DownloadDescriptor, UpdateCandidate};
pub use platform::{OsDescriptor, OsFamily, OsList, Platform};
pub use style::UpdateStyle;
pub use version::Version;
