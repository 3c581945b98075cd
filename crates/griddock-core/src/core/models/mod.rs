pub mod atom;
pub mod conformation;
pub mod frame;
pub mod ligand;
pub mod pose;
