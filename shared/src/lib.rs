pub mod bigint;
pub mod deadline;
pub mod errors;
pub mod hash_step;
pub mod log;
pub mod proof;
pub mod types;
pub mod utils;

pub fn timestamp() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
