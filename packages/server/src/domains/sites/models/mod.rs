pub mod site_status;

pub use site_status::*;
