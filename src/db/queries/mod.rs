//! Database queries

pub mod booking;
pub mod notification;
pub mod payment;
pub mod review;
pub mod technician;
