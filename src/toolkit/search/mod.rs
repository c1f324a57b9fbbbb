

pub mod hybrid;
