pub mod artifact;
pub mod catalog;
pub mod economy;
pub mod facility;
pub mod format;
pub mod goal;
pub mod handle;
