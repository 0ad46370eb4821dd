pub mod calendar;
pub mod ledger;
pub mod reminder;
pub mod resolver;
pub mod stock;
pub mod tasks;
pub mod types;

use chrono::NaiveDateTime;

/// Current local wall-clock time. The engine takes time as a parameter
/// everywhere; only the shell calls this.
pub fn local_now() -> NaiveDateTime {
    chrono::Local::now().naive_local()
}
