pub mod consts;
pub mod error;
pub mod frame;
pub mod io;
pub mod normalize;
pub mod pipeline;
pub mod quantify;
pub mod report;
pub mod segment;
