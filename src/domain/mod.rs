// Domain layer: fixed-shape records, derived report types and the ports the core talks through.

pub mod model;
pub mod ports;
pub mod report;
