pub mod coordinator;
pub mod dedup;
pub mod fax;
pub mod media;
pub mod settings;
pub mod sms;
pub mod trust;
