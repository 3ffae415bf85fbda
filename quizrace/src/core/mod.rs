pub mod autopilot;
pub mod boost_curve;
pub mod bot_policy;
pub mod handle_race;
pub mod question_pool;
pub mod race;
pub mod race_clock;
pub mod racer;
pub mod ranking;
pub mod segment_scheduler;
pub mod speed_economy;
