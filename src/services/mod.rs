pub mod merger;

pub use merger::{MergeRequest, MergeSummary, merge_files};
