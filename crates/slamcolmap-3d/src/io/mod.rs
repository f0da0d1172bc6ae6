/// COLMAP sparse model reader, writer and repair module.
pub mod colmap;
