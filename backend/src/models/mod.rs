pub mod macros;
pub mod schedule;
pub mod time;
pub mod workload;

pub use schedule::*;
pub use time::*;
pub use workload::*;
