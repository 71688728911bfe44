mod dispatch_world;
mod steps;

pub use dispatch_world::DispatchWorld;
