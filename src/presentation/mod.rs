// Presentation layer - Output surfaces for composed frames
pub mod matrix_canvas;
pub mod terminal_canvas;
