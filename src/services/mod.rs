pub mod booking;
pub mod geo;
pub mod payment;
pub mod places;
pub mod review;
pub mod search;
