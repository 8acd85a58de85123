pub mod fax;
pub mod job;
