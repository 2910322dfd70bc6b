pub mod identifier;
pub mod stable_path;

pub use identifier::Identifier;
pub use stable_path::{PathKind, StablePath, TOMBSTONE};
