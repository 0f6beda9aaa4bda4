// Purpose - external interfaces, format conversions

pub mod converter;
pub mod mapping;
pub mod midi;
