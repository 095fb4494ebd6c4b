pub mod achievements;
pub mod delete;
pub mod export;
pub mod import;
pub mod init;
pub mod normalize;
pub mod rebuild;
pub mod stats;
pub mod submit;
