pub mod error;
pub mod reference;
pub mod user;
pub mod version;

pub use error::{Result, StorageError};
pub use reference::{
    init_reference_db, init_test_reference_db, open_reference_db_readonly,
    SqliteReferenceRepository,
};
pub use user::{init_user_db, SqliteUserStateRepository};
