pub mod admin;
pub mod anchors;
pub mod consents;
pub mod health;
pub mod lineage;
pub mod proofs;
pub mod support;
pub mod system;
pub mod verify;
