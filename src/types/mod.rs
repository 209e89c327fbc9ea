//! Type definitions

pub mod booking;
pub mod messages;
pub mod notification;
pub mod payment;
pub mod review;
pub mod technician;

pub use booking::*;
pub use messages::*;
pub use notification::*;
pub use payment::*;
pub use review::*;
pub use technician::*;
