pub mod applications;
pub mod course_selection;
pub mod offer;
pub mod permissions;
pub mod rejections;
pub mod wizard;

#[cfg(test)]
pub(crate) mod testing;
