pub mod caffe_parser;
pub mod canonical;
pub mod config;
pub mod defaults;
pub mod descriptor;
pub mod shape_table;
pub mod support;
pub mod weight_loader;

pub use caffe_parser::CaffeParser;
pub use config::ImportConfig;
