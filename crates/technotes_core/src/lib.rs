pub mod domain;
pub mod ports;

pub use domain::{Note, NoteWithOwner, User, UserCredentials};
pub use ports::{DatabaseService, NoteChanges, PortError, PortResult, UserChanges};
