pub mod api;
pub mod decoder;
pub mod dispatcher;
pub mod presenter;
pub mod tracker;
