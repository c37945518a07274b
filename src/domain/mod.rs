// Domain layer: models, repository locations and ports (interfaces).

pub mod location;
pub mod model;
pub mod ports;
