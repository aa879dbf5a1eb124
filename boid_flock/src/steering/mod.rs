pub mod flocking;
pub mod no_steering;
pub mod steering_behaviour;
