//! Credential material: redacted secrets, scope lists, and signed client assertions.

pub mod assertion;
pub mod scope;
pub mod secret;

pub use assertion::*;
pub use scope::*;
pub use secret::*;
