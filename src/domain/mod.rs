// Domain layer: the storage contract and the values that cross it.

pub mod model;
pub mod ports;
