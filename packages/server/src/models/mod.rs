pub mod container;
pub mod render;
pub mod shared;
pub mod template;
pub mod video;
