pub mod carnet;
pub mod event;
pub mod reminder;
pub mod settings;
