pub mod tincan;
