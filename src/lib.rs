pub mod core;
pub mod remote;
pub mod utils;

pub use core::composer;
pub use core::engine;
pub use core::probe;

pub use utils::error;
pub use utils::logger;
pub use utils::parser;
