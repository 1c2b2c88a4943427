//! Domain layer: entities, value objects, and pure workflow logic.

pub mod conversation;
pub mod foundation;
pub mod project;
pub mod subscription;
pub mod user;
