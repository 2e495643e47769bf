pub mod dataset;
pub mod pipeline;
pub mod popularity;
pub mod recommendation;
pub mod training;
