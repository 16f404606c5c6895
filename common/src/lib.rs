pub mod report;
pub mod tee;
pub mod util;
