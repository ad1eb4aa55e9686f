pub mod appsettings;
pub mod engine;
pub mod storage;
