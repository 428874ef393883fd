pub mod cycle;

pub use cycle::DependencyGraph;
