// Domain layer - Weather observations, classification and frames
pub mod airport;
pub mod frame;
pub mod weather;
