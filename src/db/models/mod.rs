//! Database models, one file per table group.
//! Everything is re-exported at `crate::db::models` (and `crate::db`).

pub mod goal;
pub mod meal;
pub mod notification;
pub mod user;
pub mod workout;

pub use self::goal::*;
pub use self::meal::*;
pub use self::notification::*;
pub use self::user::*;
pub use self::workout::*;
