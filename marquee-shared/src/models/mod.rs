pub mod event;
pub mod events;
