//! Maven's artifact model, to the extent that plugin bundles need it

pub mod artifact_key;
pub mod coordinates;
pub mod project;
