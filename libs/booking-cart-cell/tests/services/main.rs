#[path = "../common/mod.rs"]
mod common;

mod merger_test;
mod repository_test;
mod reschedule_test;
mod sync_test;
