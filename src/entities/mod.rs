mod bid;
mod event;
mod load;
mod reference;
mod session;

pub use bid::{rank, ranked, Bid};
pub use event::{Event, EventKind};
pub use load::{Assignment, AssignmentStatus, Award, Load, TransportRequest};
pub use reference::{Embedded, Reference};
pub use session::{Bounds, CloseReason, Session, Status as SessionStatus};
