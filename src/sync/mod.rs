//! Client-side synchronization: point-in-time reads merged with pushed
//! events, so a view stays correct across late joins, duplicates and
//! reconnects.

mod book;
mod countdown;
mod feed;
mod pump;
mod session;

pub use book::BidBook;
pub use countdown::Countdown;
pub use feed::{OpenSessionFeed, OpenSessions};
pub use session::{SessionState, SessionSync};
