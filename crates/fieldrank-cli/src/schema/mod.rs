pub mod dataset;
pub mod report;
pub mod template_file;
