// Domain layer: models, per-kind schemas and ports (interfaces).

pub mod model;
pub mod ports;
pub mod schema;
