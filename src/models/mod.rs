pub mod task;
pub mod series;
pub mod dependency;
pub mod history;

pub use task::*;
pub use series::*;
pub use dependency::*;
pub use history::*;
