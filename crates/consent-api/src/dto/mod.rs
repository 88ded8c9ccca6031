pub mod admin;
pub mod anchor;
pub mod consent;
pub mod lineage;
pub mod proof;
pub mod system;
pub mod verify;
