pub mod race_result;
pub mod race_trace;
