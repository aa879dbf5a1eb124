pub mod physical_body;
pub mod point_mass;
