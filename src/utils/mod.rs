pub mod diagnostics;
pub mod logging;
