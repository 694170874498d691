pub mod document;
pub mod event;
pub mod job;
pub mod upload;
