pub mod container;
pub mod render;
pub mod template;
pub mod video;
