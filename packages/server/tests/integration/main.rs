
mod cascade;
mod container;
mod push_pipeline;
mod template;
mod video;
