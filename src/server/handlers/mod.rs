pub mod awards;
pub mod bids;
pub mod realtime;
pub mod sessions;
