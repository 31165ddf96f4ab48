pub mod cat;
pub mod reset;
pub mod scan;
pub mod status;
