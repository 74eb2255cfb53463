pub mod assets;
pub mod backup;
pub mod control;
pub mod feed;
pub mod files;
pub mod health;
pub mod logs;
pub mod remote;
pub mod store;
