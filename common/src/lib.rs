pub mod chart;
pub mod config;
pub mod extract;
pub mod matplotlib;
pub mod pipeline;
pub mod record;
pub mod series;
pub mod source;
pub mod util;
