// Application layer - Display orchestration and capability traits
pub mod canvas;
pub mod display_controller;
pub mod display_loop;
pub mod frame_composer;
pub mod weather_source;
