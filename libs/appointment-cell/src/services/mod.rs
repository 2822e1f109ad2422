pub mod appointments;
pub mod board;
pub mod booking;
pub mod calendar;
pub mod drag;
pub mod grid;
pub mod legacy;
pub mod lifecycle;
pub mod render;
