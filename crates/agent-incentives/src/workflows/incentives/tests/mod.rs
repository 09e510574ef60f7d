pub(crate) mod common;
mod reports;
