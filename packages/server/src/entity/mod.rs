pub mod container;
pub mod container_template;
pub mod description_history;
pub mod template;
pub mod variable;
pub mod video;
