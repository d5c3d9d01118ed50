//! Plugins compiled into the host. Each one is listed in
//! [`BUILTIN_PLUGINS`](crate::host::BUILTIN_PLUGINS).

mod date;
mod find;
mod smiley;

pub use date::{DatePlugin, format_stamp, locale_for};
pub use find::FindPlugin;
pub use smiley::{SMILEY, SmileyPlugin};
