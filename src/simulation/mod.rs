mod flight;

pub use flight::{FlightProfile, FlightSegment, SimulatedFlight};
