mod common;
mod prioritisation;
