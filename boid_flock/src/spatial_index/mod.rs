pub mod cuboid;
pub mod linear_scan;
pub mod location_hash_3d;
pub mod octree;
pub mod spatial_index;
